//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When absent, the AI tier and video synthesis are disabled; the
    /// structured and heuristic tiers still run.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub max_bulk_batch: usize,
    pub acceptance_threshold: f32,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub tesseract_bin: String,
    pub work_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_bulk_batch: env::var("MAX_BULK_BATCH")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("MAX_BULK_BATCH must be a valid number")?,
            acceptance_threshold: env::var("EXTRACTION_ACCEPTANCE_THRESHOLD")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()
                .context("EXTRACTION_ACCEPTANCE_THRESHOLD must be a number in [0, 1]")?,
            ytdlp_bin: env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string()),
            ffmpeg_bin: env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            tesseract_bin: env::var("TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string()),
            work_dir: env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("ladle-media")),
        })
    }
}
