pub mod environment;
pub mod message_channel;
pub mod output_interceptor;
pub mod process_launcher;
pub mod text_file_sink;
pub mod whisper_transcriber;
