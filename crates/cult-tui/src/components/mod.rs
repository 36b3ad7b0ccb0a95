pub mod now_playing;
