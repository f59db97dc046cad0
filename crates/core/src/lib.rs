//! Pronunciation practice core: similarity scoring, the speech
//! recognition session state machine, and clients for the detection and
//! speech backend.

pub mod scoring {
    pub mod domain {
        pub mod similarity;
        pub mod transcript;
        pub mod verdict;
    }
}

pub mod recognition {
    pub mod domain {
        pub mod audio_recorder;
        pub mod pronunciation_backend;
        pub mod recognition_controller;
        pub mod session;
        pub mod session_event;
        pub mod speech_recognizer;
    }
    pub mod infrastructure {
        pub mod file_audio_recorder;
        pub mod typed_transcript_recognizer;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod object_detector;
    }
}

pub mod pipeline {
    pub mod pronunciation_test_runner;
}

pub mod shared {
    pub mod backend_error;
    pub mod constants;
    pub mod http_backend;
    pub mod language;
    pub mod settings;
}
