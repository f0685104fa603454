use hound::WavReader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use super::source::{AudioFrame, AudioSource};
use crate::error::{Result, SessionError};

/// How a file source feeds frames to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileReadMode {
    /// Load the whole file into memory at open, then slice frames from it.
    Buffered,
    /// Keep the decoder open and pull one frame's worth of samples per read.
    Streamed,
}

enum FileState {
    Closed,
    Buffered { samples: Vec<i16>, position: usize },
    Streamed { reader: WavReader<BufReader<File>> },
}

/// Finite audio source reading 16-bit PCM WAV files.
pub struct WavFileSource {
    path: PathBuf,
    mode: FileReadMode,
    frame_ms: u64,
    sample_rate: u32,
    channels: u16,
    samples_read: u64,
    state: FileState,
    name: String,
}

impl WavFileSource {
    pub fn new(path: impl AsRef<Path>, mode: FileReadMode, frame_ms: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("file:{}", path.display());
        Self {
            path,
            mode,
            frame_ms,
            sample_rate: 0,
            channels: 0,
            samples_read: 0,
            state: FileState::Closed,
            name,
        }
    }

    fn frame_len(&self) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * self.frame_ms / 1000) as usize
    }

    fn frame_from(&mut self, samples: Vec<i16>) -> AudioFrame {
        let timestamp_ms =
            self.samples_read * 1000 / (self.sample_rate as u64 * self.channels as u64).max(1);
        self.samples_read += samples.len() as u64;
        AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }
    }
}

#[async_trait::async_trait]
impl AudioSource for WavFileSource {
    async fn open(&mut self) -> Result<()> {
        info!("Opening audio file: {}", self.path.display());

        let reader = WavReader::open(&self.path)
            .map_err(|e| SessionError::Audio(format!("failed to open WAV file: {}", e)))?;
        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(SessionError::Audio(format!(
                "unsupported WAV format: {} bits {:?}, expected 16-bit PCM",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        super::source::check_frame_geometry(spec.sample_rate, spec.channels, self.frame_ms)?;
        self.sample_rate = spec.sample_rate;
        self.channels = spec.channels;
        self.samples_read = 0;

        self.state = match self.mode {
            FileReadMode::Streamed => FileState::Streamed { reader },
            FileReadMode::Buffered => {
                let samples: Vec<i16> = reader
                    .into_samples::<i16>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        SessionError::Audio(format!("failed to read audio samples: {}", e))
                    })?;
                info!(
                    "Audio file buffered: {:.1}s, {}Hz, {} channels",
                    samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64),
                    spec.sample_rate,
                    spec.channels
                );
                FileState::Buffered {
                    samples,
                    position: 0,
                }
            }
        };
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<AudioFrame>> {
        let frame_len = self.frame_len();
        let chunk = match &mut self.state {
            FileState::Closed => {
                return Err(SessionError::Audio("file source not opened".into()));
            }
            FileState::Buffered { samples, position } => {
                if *position >= samples.len() {
                    return Ok(None);
                }
                let end = (*position + frame_len).min(samples.len());
                let chunk = samples[*position..end].to_vec();
                *position = end;
                chunk
            }
            FileState::Streamed { reader } => {
                let mut chunk = Vec::with_capacity(frame_len);
                for sample in reader.samples::<i16>().take(frame_len) {
                    let sample = sample.map_err(|e| {
                        SessionError::Audio(format!("failed to read audio samples: {}", e))
                    })?;
                    chunk.push(sample);
                }
                if chunk.is_empty() {
                    return Ok(None);
                }
                chunk
            }
        };
        Ok(Some(self.frame_from(chunk)))
    }

    async fn close(&mut self) -> Result<()> {
        self.state = FileState::Closed;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
