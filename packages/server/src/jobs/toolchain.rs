//! Media toolchain backed by local CLI tools and the OpenAI audio API.
//!
//! Downloads with yt-dlp, splits audio and frames with ffmpeg, OCRs
//! frames with tesseract, transcribes through the hosted
//! speech-to-text endpoint, and synthesizes recipe candidates through
//! the extraction library's AI seam.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use extraction::RecipeAi;

use crate::jobs::video::{ExtractedRecipe, VideoMeta};
use crate::jobs::video_worker::{
    AudioTrack, FrameBatch, OcrOutcome, ProgressFn, Transcript, VideoMedia, VideoToolchain,
};

/// Toolchain configuration; binaries are resolved through `PATH` by
/// default.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub tesseract_bin: String,
    pub work_dir: PathBuf,
    /// Seconds between extracted frames.
    pub frame_interval_sec: u32,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            tesseract_bin: "tesseract".to_string(),
            work_dir: std::env::temp_dir().join("ladle-media"),
            frame_interval_sec: 10,
        }
    }
}

pub struct CommandToolchain {
    config: ToolchainConfig,
    http: reqwest::Client,
    /// Key for the hosted transcription endpoint.
    openai_api_key: Option<String>,
    /// Recipe synthesis model.
    ai: Option<Arc<dyn RecipeAi>>,
}

impl CommandToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            openai_api_key: None,
            ai: None,
        }
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn with_ai(mut self, ai: Arc<dyn RecipeAi>) -> Self {
        self.ai = Some(ai);
        self
    }

    fn job_dir(&self) -> PathBuf {
        self.config.work_dir.join(Uuid::new_v4().to_string())
    }

    async fn probe_metadata(&self, url: &str) -> Result<VideoMeta> {
        #[derive(Deserialize)]
        struct Probe {
            title: Option<String>,
            channel: Option<String>,
            uploader: Option<String>,
            thumbnail: Option<String>,
            duration: Option<f64>,
        }

        let output = Command::new(&self.config.ytdlp_bin)
            .args(["--dump-json", "--no-download", url])
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.config.ytdlp_bin))?;

        if !output.status.success() {
            bail!(
                "metadata probe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let probe: Probe =
            serde_json::from_slice(&output.stdout).context("unparseable yt-dlp metadata")?;

        Ok(VideoMeta {
            title: probe.title.unwrap_or_else(|| "Untitled video".to_string()),
            channel: probe
                .channel
                .or(probe.uploader)
                .unwrap_or_else(|| "Unknown channel".to_string()),
            thumbnail: probe.thumbnail,
            duration_sec: probe.duration.unwrap_or(0.0) as u32,
        })
    }
}

#[async_trait]
impl VideoToolchain for CommandToolchain {
    async fn download(&self, url: &str, progress: ProgressFn) -> Result<VideoMedia> {
        let meta = self.probe_metadata(url).await?;

        let dir = self.job_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating work dir {}", dir.display()))?;
        let video_path = dir.join("video.mp4");

        let mut child = Command::new(&self.config.ytdlp_bin)
            .args([
                "--newline",
                "-f",
                "mp4/bestvideo*+bestaudio/best",
                "-o",
                video_path.to_str().context("work dir is not valid UTF-8")?,
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.config.ytdlp_bin))?;

        // yt-dlp prints "[download]  42.0% of ..." per line with --newline.
        let percent = Regex::new(r"\[download\]\s+([\d.]+)%").expect("static pattern is valid");
        if let Some(stdout) = child.stdout.take() {
            let mut lines = tokio::io::BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(cap) = percent.captures(&line) {
                    if let Ok(value) = cap[1].parse::<f32>() {
                        progress(value / 100.0);
                    }
                }
            }
        }

        let status = child.wait().await.context("waiting for downloader")?;
        if !status.success() {
            bail!("video download exited with {status}");
        }
        progress(1.0);

        Ok(VideoMedia {
            meta,
            video_path: video_path.display().to_string(),
        })
    }

    async fn extract_audio(&self, media: &VideoMedia) -> Result<AudioTrack> {
        let audio_path = Path::new(&media.video_path).with_extension("wav");
        let audio = audio_path.display().to_string();

        let output = Command::new(&self.config.ffmpeg_bin)
            .args([
                "-y",
                "-i",
                media.video_path.as_str(),
                "-vn",
                "-ac",
                "1",
                "-ar",
                "16000",
                audio.as_str(),
            ])
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.config.ffmpeg_bin))?;

        if !output.status.success() {
            bail!(
                "audio extraction failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(AudioTrack { path: audio })
    }

    async fn transcribe(&self, audio: &AudioTrack) -> Result<Transcript> {
        let Some(api_key) = &self.openai_api_key else {
            bail!("transcription not configured (missing API key)");
        };

        #[derive(Deserialize)]
        struct TranscriptionResponse {
            text: String,
            language: Option<String>,
        }

        let bytes = tokio::fs::read(&audio.path)
            .await
            .with_context(|| format!("reading {}", audio.path))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .context("building audio upload")?;
        let form = reqwest::multipart::Form::new()
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .part("file", part);

        let response: TranscriptionResponse = self
            .http
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("transcription request failed")?
            .error_for_status()
            .context("transcription request rejected")?
            .json()
            .await
            .context("unparseable transcription response")?;

        Ok(Transcript {
            text: response.text,
            language: response.language,
        })
    }

    async fn extract_frames(&self, media: &VideoMedia) -> Result<FrameBatch> {
        let dir = Path::new(&media.video_path)
            .parent()
            .context("video path has no parent directory")?
            .join("frames");
        tokio::fs::create_dir_all(&dir).await?;

        let pattern = dir.join("frame_%04d.png");
        let filter = format!("fps=1/{}", self.config.frame_interval_sec.max(1));

        let output = Command::new(&self.config.ffmpeg_bin)
            .args([
                "-y",
                "-i",
                media.video_path.as_str(),
                "-vf",
                filter.as_str(),
                pattern.to_str().context("frame dir is not valid UTF-8")?,
            ])
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.config.ffmpeg_bin))?;

        if !output.status.success() {
            bail!(
                "frame extraction failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("png") {
                frames.push(entry.path().display().to_string());
            }
        }
        frames.sort();

        Ok(FrameBatch { frames })
    }

    async fn ocr_frames(&self, frames: &FrameBatch) -> Result<OcrOutcome> {
        let mut texts = Vec::new();
        let mut frames_with_text = 0u32;

        for frame in &frames.frames {
            let output = Command::new(&self.config.tesseract_bin)
                .args([frame.as_str(), "stdout"])
                .output()
                .await
                .with_context(|| format!("failed to run {}", self.config.tesseract_bin))?;

            if !output.status.success() {
                warn!(frame = %frame, "OCR failed for frame; skipping");
                continue;
            }

            let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !text.is_empty() {
                frames_with_text += 1;
                texts.push(text);
            }
        }

        debug!(
            total = frames.frames.len(),
            with_text = frames_with_text,
            "OCR pass finished"
        );

        Ok(OcrOutcome {
            texts,
            frames_with_text,
        })
    }

    async fn synthesize(
        &self,
        transcript: &Transcript,
        ocr: &OcrOutcome,
        meta: &VideoMeta,
    ) -> Result<Vec<ExtractedRecipe>> {
        let Some(ai) = &self.ai else {
            bail!("recipe synthesis not configured (no model)");
        };

        let mut content = format!(
            "Video: {} (channel: {})\n\nTranscript:\n{}\n",
            meta.title, meta.channel, transcript.text
        );
        if !ocr.texts.is_empty() {
            content.push_str("\nOn-screen text:\n");
            for text in &ocr.texts {
                content.push_str(text);
                content.push('\n');
            }
        }

        let completion = ai
            .extract_recipe(&content, None)
            .await
            .map_err(|e| anyhow::anyhow!("synthesis model failed: {e}"))?;

        Ok(completion
            .recipe
            .map(|recipe| ExtractedRecipe {
                recipe,
                confidence: completion.confidence,
                segment: None,
            })
            .into_iter()
            .collect())
    }
}
