mod app;
mod tabs {
    pub mod logs_tab;
    pub mod result_tab;
}
mod theme;

use std::process;

use app::App;
use whisper_transcriber_core::pipeline::worker_process;

fn main() -> iced::Result {
    env_logger::init();

    if let Some(code) = worker_process::dispatch() {
        process::exit(code);
    }

    iced::application(App::new, App::update, App::view)
        .title("Whisper Transcriber")
        .theme(App::theme)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(850.0, 550.0),
            ..Default::default()
        })
        .run()
}
