pub mod audio {
    pub mod domain {
        pub mod audio_reader;
        pub mod audio_segment;
    }
    pub mod infrastructure {
        pub mod ffmpeg_audio_reader;
    }
}

pub mod model {
    pub mod domain {
        pub mod catalog;
        pub mod model_reference;
    }
    pub mod infrastructure {
        pub mod model_resolver;
    }
}

pub mod job {
    pub mod domain {
        pub mod failure_hint;
        pub mod job;
        pub mod language;
        pub mod result_sink;
        pub mod transcriber;
        pub mod worker_launcher;
        pub mod worker_message;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod job_controller;
    pub mod transcription_worker;
    pub mod worker_process;
}

pub mod shared {
    pub mod constants;
    pub mod settings;
    pub mod time_format;
}

#[cfg(test)]
pub(crate) mod test_support;
