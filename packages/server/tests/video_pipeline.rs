//! End-to-end video pipeline scenarios with a mock toolchain.

use std::sync::Arc;
use std::time::Duration;

use server_core::jobs::testing::MockToolchain;
use server_core::jobs::{
    MemoryJobStore, VideoJob, VideoJobStatus, VideoJobStore, VideoPipeline, CANCELLED_MESSAGE,
};

async fn wait_for<F>(store: &Arc<MemoryJobStore>, id: uuid::Uuid, predicate: F) -> VideoJob
where
    F: Fn(&VideoJob) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = VideoJobStore::get(store.as_ref(), id)
                .await
                .unwrap()
                .expect("job exists");
            if predicate(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within timeout")
}

/// Scenario C (happy path): the job walks every intermediate state in
/// order and progress only reaches 100 at `Completed`.
#[tokio::test]
async fn job_advances_through_all_stages_in_order() {
    let store = Arc::new(MemoryJobStore::new());
    let toolchain = Arc::new(MockToolchain::new().with_one_recipe());

    // Hold each stage so the test can observe every status.
    let stages = [
        VideoJobStatus::Downloading,
        VideoJobStatus::ExtractingAudio,
        VideoJobStatus::Transcribing,
        VideoJobStatus::ExtractingFrames,
        VideoJobStatus::OcrProcessing,
        VideoJobStatus::AiSynthesis,
    ];
    let gates: Vec<_> = stages.iter().map(|s| toolchain.gate(*s)).collect();

    let pipeline = VideoPipeline::new(store.clone(), toolchain.clone());
    let id = pipeline.submit("https://www.youtube.com/watch?v=abc").await.unwrap();

    let mut last_progress = 0u8;
    for (stage, gate) in stages.iter().zip(&gates) {
        let job = wait_for(&store, id, |j| j.status == *stage).await;
        assert!(job.progress >= last_progress, "progress regressed at {stage:?}");
        assert!(job.progress < 100);
        last_progress = job.progress;
        gate.notify_one();
    }

    let job = wait_for(&store, id, |j| j.is_terminal()).await;
    assert_eq!(job.status, VideoJobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.extracted_recipes.len(), 1);
    assert_eq!(job.frames_extracted, 3);
    assert_eq!(job.frames_with_text, 1);
    assert!(job.completed_at.is_some());
    assert_eq!(job.video_meta.as_ref().unwrap().title, "Test video");
}

/// Scenario C (cancel): cancelling mid-`Transcribing` yields a terminal
/// `Failed` with the cancellation message; a second cancel is a no-op.
#[tokio::test]
async fn cancel_during_transcription_fails_with_cancel_message() {
    let store = Arc::new(MemoryJobStore::new());
    let toolchain = Arc::new(MockToolchain::new().with_one_recipe());
    let gate = toolchain.gate(VideoJobStatus::Transcribing);

    let pipeline = VideoPipeline::new(store.clone(), toolchain.clone());
    let id = pipeline.submit("https://youtu.be/abc").await.unwrap();

    wait_for(&store, id, |j| j.status == VideoJobStatus::Transcribing).await;

    assert!(pipeline.cancel(id).await.unwrap());
    gate.notify_one();

    let job = wait_for(&store, id, |j| j.is_terminal()).await;
    assert_eq!(job.status, VideoJobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert!(job.progress < 100);

    // Repeated cancel is a no-op.
    assert!(!pipeline.cancel(id).await.unwrap());
}

/// A stage failure lands the job in `Failed` with the stage's error;
/// retry creates a fresh job with a new id and the same source URL.
#[tokio::test]
async fn stage_failure_then_retry_creates_a_new_job() {
    let store = Arc::new(MemoryJobStore::new());
    let toolchain = Arc::new(MockToolchain::new().failing_at(VideoJobStatus::ExtractingFrames));

    let pipeline = VideoPipeline::new(store.clone(), toolchain);
    let id = pipeline.submit("https://youtu.be/abc").await.unwrap();

    let failed = wait_for(&store, id, |j| j.is_terminal()).await;
    assert_eq!(failed.status, VideoJobStatus::Failed);
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("ExtractingFrames"));

    let retry_id = pipeline.retry(id).await.unwrap();
    assert_ne!(retry_id, id);

    // The failed job is preserved in history, untouched.
    let original = VideoJobStore::get(store.as_ref(), id).await.unwrap().unwrap();
    assert_eq!(original.status, VideoJobStatus::Failed);

    let retried = VideoJobStore::get(store.as_ref(), retry_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(retried.source_url, original.source_url);
}

/// Retry is only valid for failed jobs.
#[tokio::test]
async fn retry_of_a_completed_job_is_rejected() {
    let store = Arc::new(MemoryJobStore::new());
    let toolchain = Arc::new(MockToolchain::new().with_one_recipe());

    let pipeline = VideoPipeline::new(store.clone(), toolchain);
    let id = pipeline.submit("https://youtu.be/abc").await.unwrap();

    wait_for(&store, id, |j| j.is_terminal()).await;
    assert!(pipeline.retry(id).await.is_err());
}

/// Download progress reports surface as intra-stage progress and a
/// finer-grained step label.
#[tokio::test]
async fn download_progress_is_reported_within_the_stage() {
    let store = Arc::new(MemoryJobStore::new());
    let toolchain = Arc::new(MockToolchain::new().with_one_recipe());
    let gate = toolchain.gate(VideoJobStatus::ExtractingAudio);

    let pipeline = VideoPipeline::new(store.clone(), toolchain);
    let id = pipeline.submit("https://youtu.be/abc").await.unwrap();

    // Download reports 50% then 100%; wait until an async progress
    // report has landed.
    let job = wait_for(&store, id, |j| {
        j.progress >= VideoJobStatus::stage_span() / 2
    })
    .await;
    assert!(job.progress < 100);
    assert!(job
        .current_step
        .as_deref()
        .map(|s| s.starts_with("Downloading") || s.starts_with("Extracting"))
        .unwrap_or(false));

    gate.notify_one();
    wait_for(&store, id, |j| j.is_terminal()).await;
}
