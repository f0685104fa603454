use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    /// Service region passed through to the backend
    pub region: String,
    /// Recognition language tag (e.g. "en-US")
    pub language: String,
    /// Audio frame duration in milliseconds
    pub frame_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "speechflow".to_string(),
            },
            recognition: RecognitionConfig {
                region: "westus".to_string(),
                language: "en-US".to_string(),
                frame_ms: 100,
            },
        }
    }
}
