pub mod file;
pub mod source;

pub use file::{FileReadMode, WavFileSource};
pub use source::{
    AudioFrame, AudioSource, BufferSource, SharedAudioSource, SilenceSource, SourceClaim,
};
