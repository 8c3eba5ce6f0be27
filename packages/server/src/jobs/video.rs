//! Video extraction job model and state machine.
//!
//! A job moves strictly forward through the pipeline stages; `Failed`
//! is reachable from any non-terminal state and both terminal states
//! are absorbing. Transition validity is enforced here, not trusted
//! from callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use extraction::RecipeDraft;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoJobStatus {
    Pending,
    Downloading,
    ExtractingAudio,
    Transcribing,
    ExtractingFrames,
    OcrProcessing,
    AiSynthesis,
    Completed,
    Failed,
}

impl VideoJobStatus {
    /// Number of work stages between `Pending` and `Completed`.
    pub const WORK_STAGES: u8 = 6;

    /// The next forward stage, or `None` from a terminal state.
    pub fn next(&self) -> Option<VideoJobStatus> {
        use VideoJobStatus::*;
        match self {
            Pending => Some(Downloading),
            Downloading => Some(ExtractingAudio),
            ExtractingAudio => Some(Transcribing),
            Transcribing => Some(ExtractingFrames),
            ExtractingFrames => Some(OcrProcessing),
            OcrProcessing => Some(AiSynthesis),
            AiSynthesis => Some(Completed),
            Completed | Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoJobStatus::Completed | VideoJobStatus::Failed)
    }

    /// 1-based work-stage number, if this status is a work stage.
    pub fn stage_number(&self) -> Option<u8> {
        use VideoJobStatus::*;
        match self {
            Downloading => Some(1),
            ExtractingAudio => Some(2),
            Transcribing => Some(3),
            ExtractingFrames => Some(4),
            OcrProcessing => Some(5),
            AiSynthesis => Some(6),
            _ => None,
        }
    }

    /// Baseline progress when this stage begins.
    pub fn base_progress(&self) -> u8 {
        match self {
            VideoJobStatus::Completed => 100,
            other => match other.stage_number() {
                Some(stage) => ((stage - 1) as u32 * 100 / Self::WORK_STAGES as u32) as u8,
                None => 0,
            },
        }
    }

    /// Progress points spanned by one work stage.
    pub fn stage_span() -> u8 {
        (100 / Self::WORK_STAGES as u32) as u8
    }
}

/// A transition the state machine refuses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("job is terminal ({status:?}); no further transitions")]
    Terminal { status: VideoJobStatus },

    #[error("invalid transition {from:?} -> {to:?}")]
    Invalid {
        from: VideoJobStatus,
        to: VideoJobStatus,
    },
}

/// Metadata about the source video, filled in after download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMeta {
    pub title: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub duration_sec: u32,
}

/// One recipe candidate recovered from a video. A video may yield
/// several; importing one never mutates the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecipe {
    pub recipe: RecipeDraft,
    pub confidence: f32,
    /// Rough location in the video ("12:30-15:40"), when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

/// A video extraction job record.
///
/// Mutated only through the methods below; `progress` never decreases
/// and terminal states absorb all further updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    pub id: Uuid,
    pub source_url: String,
    pub status: VideoJobStatus,

    /// Human-readable label, finer-grained than `status`
    /// ("Downloading 42%").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// 0..=100, monotonically non-decreasing. Reaches 100 only at
    /// `Completed`.
    pub progress: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_meta: Option<VideoMeta>,

    pub frames_extracted: u32,
    pub frames_with_text: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub extracted_recipes: Vec<ExtractedRecipe>,
    #[serde(skip)]
    pub imported_recipe_ids: Vec<Uuid>,
    #[serde(skip)]
    pub cancel_requested: bool,
}

impl VideoJob {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            status: VideoJobStatus::Pending,
            current_step: None,
            progress: 0,
            video_meta: None,
            frames_extracted: 0,
            frames_with_text: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            extracted_recipes: Vec::new(),
            imported_recipe_ids: Vec::new(),
            cancel_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Advance to `to`. Only the next forward stage or `Failed` is
    /// accepted; terminal states reject everything.
    pub fn transition(&mut self, to: VideoJobStatus) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal {
                status: self.status,
            });
        }

        let forward = self.status.next() == Some(to);
        if !forward && to != VideoJobStatus::Failed {
            return Err(TransitionError::Invalid {
                from: self.status,
                to,
            });
        }

        if self.status == VideoJobStatus::Pending && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }

        self.status = to;

        match to {
            VideoJobStatus::Completed => {
                self.observe_progress(100);
                self.completed_at = Some(Utc::now());
                self.current_step = None;
            }
            VideoJobStatus::Failed => {
                self.completed_at = Some(Utc::now());
            }
            stage => {
                self.observe_progress(stage.base_progress());
            }
        }

        Ok(())
    }

    /// Fail with a message. No-op error if already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(VideoJobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record an observed progress value; lower values are ignored so
    /// the sequence a poller sees never decreases. 100 is reserved for
    /// `Completed`.
    pub fn observe_progress(&mut self, value: u8) {
        let cap = if self.status == VideoJobStatus::Completed {
            100
        } else {
            99
        };
        let value = value.min(cap);
        if value > self.progress {
            self.progress = value;
        }
    }

    pub fn set_step(&mut self, label: impl Into<String>) {
        self.current_step = Some(label.into());
    }
}
