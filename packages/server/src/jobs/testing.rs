//! Mock implementations for job subsystem tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use uuid::Uuid;

use extraction::RecipeDraft;

use crate::jobs::bulk::PostImporter;
use crate::jobs::video::{ExtractedRecipe, VideoJobStatus, VideoMeta};
use crate::jobs::video_worker::{
    AudioTrack, FrameBatch, OcrOutcome, ProgressFn, Transcript, VideoMedia, VideoToolchain,
};

/// A toolchain producing scripted outputs.
///
/// Stages can be gated on a [`Notify`] so tests can hold the pipeline
/// at a precise status, and scripted to fail at a given stage.
pub struct MockToolchain {
    meta: VideoMeta,
    recipes: Vec<ExtractedRecipe>,
    fail_at: Option<VideoJobStatus>,
    gates: RwLock<HashMap<VideoJobStatus, Arc<Notify>>>,
    /// Download progress fractions to report.
    download_reports: Vec<f32>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    pub fn new() -> Self {
        Self {
            meta: VideoMeta {
                title: "Test video".to_string(),
                channel: "Test channel".to_string(),
                thumbnail: None,
                duration_sec: 600,
            },
            recipes: Vec::new(),
            fail_at: None,
            gates: RwLock::new(HashMap::new()),
            download_reports: vec![0.5, 1.0],
        }
    }

    pub fn with_meta(mut self, meta: VideoMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_recipes(mut self, recipes: Vec<ExtractedRecipe>) -> Self {
        self.recipes = recipes;
        self
    }

    /// Produce one complete recipe candidate.
    pub fn with_one_recipe(self) -> Self {
        let recipe = RecipeDraft::new("Video Dish")
            .with_ingredients(["2 eggs", "1 cup flour"])
            .with_steps(["Mix.", "Cook."]);
        self.with_recipes(vec![ExtractedRecipe {
            recipe,
            confidence: 0.8,
            segment: None,
        }])
    }

    /// Fail when the pipeline reaches `stage`.
    pub fn failing_at(mut self, stage: VideoJobStatus) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Hold the given stage until the returned handle is notified.
    pub fn gate(&self, stage: VideoJobStatus) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.write().unwrap().insert(stage, notify.clone());
        notify
    }

    async fn enter(&self, stage: VideoJobStatus) -> anyhow::Result<()> {
        let gate = self.gates.read().unwrap().get(&stage).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_at == Some(stage) {
            anyhow::bail!("scripted failure at {stage:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl VideoToolchain for MockToolchain {
    async fn download(&self, _url: &str, progress: ProgressFn) -> anyhow::Result<VideoMedia> {
        self.enter(VideoJobStatus::Downloading).await?;
        for fraction in &self.download_reports {
            progress(*fraction);
        }
        Ok(VideoMedia {
            meta: self.meta.clone(),
            video_path: "/tmp/test-video.mp4".to_string(),
        })
    }

    async fn extract_audio(&self, _media: &VideoMedia) -> anyhow::Result<AudioTrack> {
        self.enter(VideoJobStatus::ExtractingAudio).await?;
        Ok(AudioTrack {
            path: "/tmp/test-audio.wav".to_string(),
        })
    }

    async fn transcribe(&self, _audio: &AudioTrack) -> anyhow::Result<Transcript> {
        self.enter(VideoJobStatus::Transcribing).await?;
        Ok(Transcript {
            text: "Crack two eggs into a cup of flour and cook.".to_string(),
            language: Some("en".to_string()),
        })
    }

    async fn extract_frames(&self, _media: &VideoMedia) -> anyhow::Result<FrameBatch> {
        self.enter(VideoJobStatus::ExtractingFrames).await?;
        Ok(FrameBatch {
            frames: vec![
                "/tmp/frame_0001.png".to_string(),
                "/tmp/frame_0002.png".to_string(),
                "/tmp/frame_0003.png".to_string(),
            ],
        })
    }

    async fn ocr_frames(&self, _frames: &FrameBatch) -> anyhow::Result<OcrOutcome> {
        self.enter(VideoJobStatus::OcrProcessing).await?;
        Ok(OcrOutcome {
            texts: vec!["2 eggs, 1 cup flour".to_string()],
            frames_with_text: 1,
        })
    }

    async fn synthesize(
        &self,
        _transcript: &Transcript,
        _ocr: &OcrOutcome,
        _meta: &VideoMeta,
    ) -> anyhow::Result<Vec<ExtractedRecipe>> {
        self.enter(VideoJobStatus::AiSynthesis).await?;
        Ok(self.recipes.clone())
    }
}

/// A post importer failing for scripted post ids.
#[derive(Default)]
pub struct MockImporter {
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make imports of `post_id` fail.
    pub fn failing_for(self, post_id: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(post_id.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostImporter for MockImporter {
    async fn import_post(&self, post_id: &str) -> anyhow::Result<Uuid> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().unwrap().contains(post_id) {
            anyhow::bail!("scripted import failure for {post_id}");
        }
        Ok(Uuid::new_v4())
    }
}
