//! The worker driving video extraction jobs through the pipeline.
//!
//! One spawned task per job. The worker is the only status writer for
//! its job; cancellation is cooperative, checked at every stage
//! boundary, and surfaces as `Failed` with a cancellation-specific
//! message.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::jobs::store::{JobStoreError, VideoJobStore};
use crate::jobs::video::{ExtractedRecipe, VideoJob, VideoJobStatus, VideoMeta};

/// Error message distinguishing a cancelled job from an organic failure.
pub const CANCELLED_MESSAGE: &str = "cancelled by user";

/// Intra-stage progress reporter handed to toolchain stages that can
/// measure their own progress (download percentage).
pub type ProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

/// Downloaded media plus its metadata.
#[derive(Debug, Clone)]
pub struct VideoMedia {
    pub meta: VideoMeta,
    /// Local path of the downloaded video file.
    pub video_path: String,
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FrameBatch {
    /// Local paths of extracted frames.
    pub frames: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OcrOutcome {
    /// Recognized text per frame that had any.
    pub texts: Vec<String>,
    pub frames_with_text: u32,
}

/// External media capabilities the pipeline is built on: downloader,
/// audio tools, speech-to-text, OCR, and recipe synthesis. Each is an
/// opaque capability; the pipeline only sequences them.
#[async_trait]
pub trait VideoToolchain: Send + Sync {
    async fn download(&self, url: &str, progress: ProgressFn) -> anyhow::Result<VideoMedia>;
    async fn extract_audio(&self, media: &VideoMedia) -> anyhow::Result<AudioTrack>;
    async fn transcribe(&self, audio: &AudioTrack) -> anyhow::Result<Transcript>;
    async fn extract_frames(&self, media: &VideoMedia) -> anyhow::Result<FrameBatch>;
    async fn ocr_frames(&self, frames: &FrameBatch) -> anyhow::Result<OcrOutcome>;
    async fn synthesize(
        &self,
        transcript: &Transcript,
        ocr: &OcrOutcome,
        meta: &VideoMeta,
    ) -> anyhow::Result<Vec<ExtractedRecipe>>;
}

#[derive(Debug, Error)]
enum PipelineError {
    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] JobStoreError),

    #[error("{stage:?} failed: {source}")]
    Stage {
        stage: VideoJobStatus,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("only failed jobs can be retried (status {status:?})")]
    NotFailed { status: VideoJobStatus },

    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Owns video job submission, retry, cancel, and the per-job worker.
#[derive(Clone)]
pub struct VideoPipeline {
    store: Arc<dyn VideoJobStore>,
    toolchain: Arc<dyn VideoToolchain>,
}

impl VideoPipeline {
    pub fn new(store: Arc<dyn VideoJobStore>, toolchain: Arc<dyn VideoToolchain>) -> Self {
        Self { store, toolchain }
    }

    /// Create a job and spawn its worker. Returns immediately.
    pub async fn submit(&self, source_url: &str) -> Result<Uuid, JobStoreError> {
        let job = VideoJob::new(source_url);
        let id = job.id;
        self.store.insert(job).await?;

        info!(job_id = %id, url = %source_url, "video extraction job submitted");

        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run(id).await;
        });

        Ok(id)
    }

    /// Retry a failed job: a *new* job id is seeded from the same
    /// source URL; the failed record stays in history untouched.
    pub async fn retry(&self, failed_id: Uuid) -> Result<Uuid, RetryError> {
        let job = self
            .store
            .get(failed_id)
            .await?
            .ok_or(RetryError::NotFound(failed_id))?;

        if job.status != VideoJobStatus::Failed {
            return Err(RetryError::NotFailed { status: job.status });
        }

        Ok(self.submit(&job.source_url).await?)
    }

    /// Cooperative cancel. `Ok(true)` when newly requested.
    pub async fn cancel(&self, id: Uuid) -> Result<bool, JobStoreError> {
        let requested = self.store.request_cancel(id).await?;
        if requested {
            info!(job_id = %id, "cancellation requested");
        }
        Ok(requested)
    }

    async fn run(&self, id: Uuid) {
        match self.run_stages(id).await {
            Ok(()) => {}
            Err(PipelineError::Cancelled) => {
                info!(job_id = %id, "video job cancelled at checkpoint");
                // Already-terminal is fine: a second cancel raced us.
                let _ = self.store.fail(id, CANCELLED_MESSAGE.to_string()).await;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "video pipeline failed");
                let _ = self.store.fail(id, e.to_string()).await;
            }
        }
    }

    async fn run_stages(&self, id: Uuid) -> Result<(), PipelineError> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or(JobStoreError::NotFound(id))?;
        let url = job.source_url;

        // Downloading
        self.checkpoint(id).await?;
        self.store.advance(id, VideoJobStatus::Downloading).await?;
        self.store
            .set_step(id, "Downloading video".into(), None)
            .await?;
        let media = {
            let progress = self.download_progress_fn(id);
            self.stage(VideoJobStatus::Downloading, self.toolchain.download(&url, progress))
                .await?
        };
        self.store.set_meta(id, media.meta.clone()).await?;

        // Extracting audio
        self.checkpoint(id).await?;
        self.store
            .advance(id, VideoJobStatus::ExtractingAudio)
            .await?;
        self.store
            .set_step(id, "Extracting audio".into(), None)
            .await?;
        let audio = self
            .stage(
                VideoJobStatus::ExtractingAudio,
                self.toolchain.extract_audio(&media),
            )
            .await?;

        // Transcribing
        self.checkpoint(id).await?;
        self.store.advance(id, VideoJobStatus::Transcribing).await?;
        self.store
            .set_step(id, "Transcribing audio".into(), None)
            .await?;
        let transcript = self
            .stage(VideoJobStatus::Transcribing, self.toolchain.transcribe(&audio))
            .await?;

        // Extracting frames
        self.checkpoint(id).await?;
        self.store
            .advance(id, VideoJobStatus::ExtractingFrames)
            .await?;
        self.store
            .set_step(id, "Extracting frames".into(), None)
            .await?;
        let frames = self
            .stage(
                VideoJobStatus::ExtractingFrames,
                self.toolchain.extract_frames(&media),
            )
            .await?;

        // OCR
        self.checkpoint(id).await?;
        self.store.advance(id, VideoJobStatus::OcrProcessing).await?;
        self.store
            .set_step(id, "Reading on-screen text".into(), None)
            .await?;
        let ocr = self
            .stage(VideoJobStatus::OcrProcessing, self.toolchain.ocr_frames(&frames))
            .await?;
        self.store
            .set_frames(id, frames.frames.len() as u32, ocr.frames_with_text)
            .await?;

        // AI synthesis
        self.checkpoint(id).await?;
        self.store.advance(id, VideoJobStatus::AiSynthesis).await?;
        self.store
            .set_step(id, "Synthesizing recipes".into(), None)
            .await?;
        let recipes = self
            .stage(
                VideoJobStatus::AiSynthesis,
                self.toolchain.synthesize(&transcript, &ocr, &media.meta),
            )
            .await?;

        self.checkpoint(id).await?;
        let job = self.store.finish(id, recipes).await?;
        info!(
            job_id = %id,
            recipes = job.extracted_recipes.len(),
            frames = job.frames_extracted,
            "video extraction completed"
        );
        Ok(())
    }

    /// Bail out if a cancel was requested since the last checkpoint.
    async fn checkpoint(&self, id: Uuid) -> Result<(), PipelineError> {
        if self.store.cancel_requested(id).await? {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    async fn stage<T>(
        &self,
        stage: VideoJobStatus,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, PipelineError> {
        fut.await.map_err(|source| PipelineError::Stage { stage, source })
    }

    /// Reporter mapping a download fraction into the stage's progress
    /// window ("Downloading 42%"). Reports are applied asynchronously;
    /// the store clamps them monotonic.
    fn download_progress_fn(&self, id: Uuid) -> ProgressFn {
        let store = self.store.clone();
        let span = VideoJobStatus::stage_span();
        let base = VideoJobStatus::Downloading.base_progress();

        Arc::new(move |fraction: f32| {
            let fraction = fraction.clamp(0.0, 1.0);
            let value = base + (fraction * span as f32) as u8;
            let label = format!("Downloading {:.0}%", fraction * 100.0);
            let store = store.clone();
            tokio::spawn(async move {
                if let Err(e) = store.set_step(id, label, Some(value)).await {
                    debug!(job_id = %id, error = %e, "progress report dropped");
                }
            });
        })
    }
}
