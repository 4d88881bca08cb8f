pub mod app;
pub mod entry;
pub mod ffmpeg;
pub mod jobs;

pub use app::{LoudnessEditor, StartupConfig};

#[cfg(feature = "kittest")]
pub mod kittest;
