// Tests for the WAV file audio source in both read modes, and for exclusive
// ownership of a shared source.

use hound::{SampleFormat, WavSpec, WavWriter};
use speechflow::{
    AudioSource, BufferSource, FileReadMode, SessionError, SharedAudioSource, WavFileSource,
};
use tempfile::TempDir;

fn write_test_wav(dir: &TempDir, name: &str, samples: &[i16], sample_rate: u32) -> String {
    let path = dir.path().join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path.to_string_lossy().into_owned()
}

async fn drain(source: &mut dyn AudioSource) -> Vec<speechflow::AudioFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = source.read_frame().await.unwrap() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn test_buffered_file_source_slices_frames_with_timestamps() {
    let dir = TempDir::new().unwrap();
    // 2.5 frames of audio at 100ms / 16kHz mono (1600 samples per frame).
    let samples: Vec<i16> = (0..4000).map(|i| (i % 128) as i16).collect();
    let path = write_test_wav(&dir, "test.wav", &samples, 16000);

    let mut source = WavFileSource::new(&path, FileReadMode::Buffered, 100);
    source.open().await.unwrap();
    let frames = drain(&mut source).await;
    source.close().await.unwrap();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[1].samples.len(), 1600);
    assert_eq!(frames[2].samples.len(), 800);
    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 100);
    assert_eq!(frames[2].timestamp_ms, 200);
    assert!(frames.iter().all(|f| f.sample_rate == 16000 && f.channels == 1));
}

#[tokio::test]
async fn test_streamed_mode_yields_same_frames_as_buffered() {
    let dir = TempDir::new().unwrap();
    let samples: Vec<i16> = (0..3500).map(|i| (i as i16).wrapping_mul(3)).collect();
    let path = write_test_wav(&dir, "test.wav", &samples, 8000);

    let mut buffered = WavFileSource::new(&path, FileReadMode::Buffered, 50);
    buffered.open().await.unwrap();
    let buffered_frames = drain(&mut buffered).await;

    let mut streamed = WavFileSource::new(&path, FileReadMode::Streamed, 50);
    streamed.open().await.unwrap();
    let streamed_frames = drain(&mut streamed).await;

    assert_eq!(buffered_frames.len(), streamed_frames.len());
    for (b, s) in buffered_frames.iter().zip(&streamed_frames) {
        assert_eq!(b.samples, s.samples);
        assert_eq!(b.timestamp_ms, s.timestamp_ms);
    }
}

#[tokio::test]
async fn test_unsupported_sample_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("float.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    writer.write_sample(0.5f32).unwrap();
    writer.finalize().unwrap();

    let mut source = WavFileSource::new(&path, FileReadMode::Buffered, 100);
    let result = source.open().await;
    assert!(matches!(result, Err(SessionError::Audio(_))));
}

#[tokio::test]
async fn test_zero_frame_duration_is_rejected_at_open() {
    // A zero-length frame would never advance the buffer.
    let mut source = BufferSource::new(vec![0i16; 1600], 16000, 1, 0);
    assert!(matches!(source.open().await, Err(SessionError::Audio(_))));

    let dir = TempDir::new().unwrap();
    let path = write_test_wav(&dir, "test.wav", &[0i16; 1600], 16000);
    let mut source = WavFileSource::new(&path, FileReadMode::Buffered, 0);
    assert!(matches!(source.open().await, Err(SessionError::Audio(_))));
}

#[tokio::test]
async fn test_read_before_open_is_an_error() {
    let mut source = WavFileSource::new("nonexistent.wav", FileReadMode::Buffered, 100);
    let result = source.read_frame().await;
    assert!(matches!(result, Err(SessionError::Audio(_))));
}

#[tokio::test]
async fn test_shared_source_claim_is_exclusive() {
    let source = SharedAudioSource::new(Box::new(BufferSource::new(
        vec![0i16; 1600],
        16000,
        1,
        100,
    )));

    let first = source.claim().unwrap();
    let second = source.claim();
    assert!(matches!(second, Err(SessionError::ResourceBusy(_))));

    drop(first);
    // Dropping the claim releases the source.
    let third = source.claim();
    assert!(third.is_ok());
}

#[tokio::test]
async fn test_claimed_source_reads_through_the_claim() {
    let samples: Vec<i16> = (0..3200).map(|i| i as i16).collect();
    let source = SharedAudioSource::new(Box::new(BufferSource::new(samples, 16000, 1, 100)));

    let claim = source.claim().unwrap();
    claim.open().await.unwrap();
    let first = claim.read_frame().await.unwrap().unwrap();
    let second = claim.read_frame().await.unwrap().unwrap();
    let end = claim.read_frame().await.unwrap();
    claim.close().await.unwrap();

    assert_eq!(first.samples.len(), 1600);
    assert_eq!(second.samples.len(), 1600);
    assert_eq!(second.timestamp_ms, 100);
    assert!(end.is_none());
}
