use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Result, SessionError};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the source was opened
    pub timestamp_ms: u64,
}

/// A sequence of audio frames from a microphone device, a file, or memory.
///
/// Sources may be finite (`read_frame` eventually returns `Ok(None)`) or
/// unbounded until closed; the session controller treats both the same.
#[async_trait::async_trait]
pub trait AudioSource: Send + Sync {
    /// Prepare the source for reading.
    async fn open(&mut self) -> Result<()>;

    /// Read the next frame. `Ok(None)` signals end of stream.
    async fn read_frame(&mut self) -> Result<Option<AudioFrame>>;

    /// Release the source.
    async fn close(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Reject frame geometry that would produce empty frames; a zero-length
/// frame never advances a finite source.
pub(crate) fn check_frame_geometry(sample_rate: u32, channels: u16, frame_ms: u64) -> Result<()> {
    if sample_rate as u64 * channels as u64 * frame_ms / 1000 == 0 {
        return Err(SessionError::Audio(format!(
            "frame geometry yields empty frames: {}Hz, {} channels, {}ms per frame",
            sample_rate, channels, frame_ms
        )));
    }
    Ok(())
}

/// Ownership wrapper enforcing that one source feeds at most one active
/// session. Claiming an already-claimed source fails fast rather than
/// queuing.
pub struct SharedAudioSource {
    inner: Mutex<Box<dyn AudioSource>>,
    claimed: AtomicBool,
    name: String,
}

impl SharedAudioSource {
    pub fn new(source: Box<dyn AudioSource>) -> Arc<Self> {
        let name = source.name().to_string();
        Arc::new(Self {
            inner: Mutex::new(source),
            claimed: AtomicBool::new(false),
            name,
        })
    }

    /// Take exclusive ownership of the source for one session. Fails with
    /// `ResourceBusy` if another session holds the claim.
    pub fn claim(self: &Arc<Self>) -> Result<SourceClaim> {
        if self.claimed.swap(true, Ordering::SeqCst) {
            return Err(SessionError::ResourceBusy(format!(
                "audio source '{}' is already owned by an active session",
                self.name
            )));
        }
        Ok(SourceClaim {
            shared: Arc::clone(self),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Exclusive claim on a `SharedAudioSource`. Released on drop.
pub struct SourceClaim {
    shared: Arc<SharedAudioSource>,
}

impl SourceClaim {
    pub async fn open(&self) -> Result<()> {
        self.shared.inner.lock().await.open().await
    }

    pub async fn read_frame(&self) -> Result<Option<AudioFrame>> {
        self.shared.inner.lock().await.read_frame().await
    }

    pub async fn close(&self) -> Result<()> {
        self.shared.inner.lock().await.close().await
    }
}

impl Drop for SourceClaim {
    fn drop(&mut self) {
        self.shared.claimed.store(false, Ordering::SeqCst);
    }
}

/// Finite in-memory source. Splits a PCM buffer into fixed-duration frames.
pub struct BufferSource {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    frame_ms: u64,
    position: usize,
    opened: bool,
}

impl BufferSource {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16, frame_ms: u64) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            frame_ms,
            position: 0,
            opened: false,
        }
    }

    fn frame_len(&self) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * self.frame_ms / 1000) as usize
    }
}

#[async_trait::async_trait]
impl AudioSource for BufferSource {
    async fn open(&mut self) -> Result<()> {
        check_frame_geometry(self.sample_rate, self.channels, self.frame_ms)?;
        self.position = 0;
        self.opened = true;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<AudioFrame>> {
        if !self.opened {
            return Err(SessionError::Audio("buffer source not opened".into()));
        }
        if self.position >= self.samples.len() {
            return Ok(None);
        }
        let end = (self.position + self.frame_len()).min(self.samples.len());
        let samples = self.samples[self.position..end].to_vec();
        let timestamp_ms = self.position as u64 * 1000
            / (self.sample_rate as u64 * self.channels as u64).max(1);
        self.position = end;
        Ok(Some(AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.opened = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "buffer"
    }
}

/// Unbounded source emitting zeroed frames at the frame cadence, like an
/// open microphone in a quiet room. Runs until the session closes it.
pub struct SilenceSource {
    sample_rate: u32,
    channels: u16,
    frame_ms: u64,
    frames_emitted: u64,
    opened: bool,
}

impl SilenceSource {
    pub fn new(sample_rate: u32, channels: u16, frame_ms: u64) -> Self {
        Self {
            sample_rate,
            channels,
            frame_ms,
            frames_emitted: 0,
            opened: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioSource for SilenceSource {
    async fn open(&mut self) -> Result<()> {
        check_frame_geometry(self.sample_rate, self.channels, self.frame_ms)?;
        self.frames_emitted = 0;
        self.opened = true;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<AudioFrame>> {
        if !self.opened {
            return Ok(None);
        }
        tokio::time::sleep(std::time::Duration::from_millis(self.frame_ms)).await;
        let len = (self.sample_rate as u64 * self.channels as u64 * self.frame_ms / 1000) as usize;
        let timestamp_ms = self.frames_emitted * self.frame_ms;
        self.frames_emitted += 1;
        Ok(Some(AudioFrame {
            samples: vec![0i16; len],
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.opened = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "silence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_source_is_finite() {
        // 200ms of 16kHz mono in 100ms frames -> exactly two frames
        let mut source = BufferSource::new(vec![1i16; 3200], 16000, 1, 100);
        source.open().await.unwrap();

        let first = source.read_frame().await.unwrap().unwrap();
        assert_eq!(first.samples.len(), 1600);
        assert_eq!(first.timestamp_ms, 0);

        let second = source.read_frame().await.unwrap().unwrap();
        assert_eq!(second.timestamp_ms, 100);

        assert!(source.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let shared = SharedAudioSource::new(Box::new(BufferSource::new(vec![], 16000, 1, 100)));

        let claim = shared.claim().unwrap();
        assert!(matches!(
            shared.claim(),
            Err(SessionError::ResourceBusy(_))
        ));

        drop(claim);
        assert!(shared.claim().is_ok());
    }
}
