//! Component E — Processing Orchestrator. Runs off the request thread: it
//! copies the original out of the blob store into a scratch file, invokes
//! `ffmpeg` under a bounded timeout, promotes the output into the
//! processed blob store, and reports the outcome through the status
//! updater. Concurrency across videos is bounded by a semaphore so a burst
//! of "process" requests can't spawn unbounded ffmpeg children.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use clipcraft_shared::EditOptions;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::services::blobstore::BlobStore;
use crate::services::status_updater::StatusUpdater;

pub struct Orchestrator {
    blob_store: BlobStore,
    processed_store: BlobStore,
    status_updater: Arc<StatusUpdater>,
    semaphore: Arc<Semaphore>,
    ffmpeg_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        blob_store: BlobStore,
        processed_store: BlobStore,
        status_updater: Arc<StatusUpdater>,
        max_concurrent: usize,
        ffmpeg_timeout: Duration,
    ) -> Self {
        Self {
            blob_store,
            processed_store,
            status_updater,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            ffmpeg_timeout,
        }
    }

    pub fn from_config(config: &AppConfig, status_updater: Arc<StatusUpdater>) -> Self {
        Self::new(
            BlobStore::new(&config.storage_originals_path),
            BlobStore::new(&config.storage_processed_path),
            status_updater,
            2,
            Duration::from_secs(config.ffmpeg_timeout_secs),
        )
    }

    /// Queues processing for `video_id` in the background. The caller (the
    /// `process` handler) has already moved the video to PROCESSING before
    /// calling this, so the response can return immediately.
    pub fn spawn(self: &Arc<Self>, video_id: String, storage_path: String, edit: EditOptions) {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run(&video_id, &storage_path, &edit).await;
        });
    }

    async fn run(&self, video_id: &str, storage_path: &str, edit: &EditOptions) {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                log::error!("orchestrator semaphore closed, dropping job for video {video_id}");
                return;
            }
        };

        if let Err(e) = self.process(video_id, storage_path, edit).await {
            log::error!("processing failed for video {video_id}: {e}");
            if let Err(e) = self.status_updater.to_failed(video_id, e.to_string()).await {
                log::error!("failed to record failure for video {video_id}: {e}");
            }
        }
    }

    async fn process(&self, video_id: &str, storage_path: &str, edit: &EditOptions) -> anyhow::Result<()> {
        let work_dir = std::env::temp_dir().join(format!("clipcraft-{video_id}"));
        tokio::fs::create_dir_all(&work_dir).await?;
        let input_path = work_dir.join("input");
        let output_path = work_dir.join("output.mp4");

        let cleanup = |work_dir: std::path::PathBuf| async move {
            let _ = tokio::fs::remove_dir_all(&work_dir).await;
        };

        if let Err(e) = self.blob_store.copy_to(storage_path, &input_path).await {
            cleanup(work_dir).await;
            return Err(anyhow::anyhow!("failed to stage input: {e}"));
        }

        let args = build_ffmpeg_args(&input_path, &output_path, edit);
        let spawn_result = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawn_result {
            Ok(child) => child,
            Err(e) => {
                cleanup(work_dir).await;
                return Err(anyhow::anyhow!("failed to spawn ffmpeg: {e}"));
            }
        };

        let wait = tokio::time::timeout(self.ffmpeg_timeout, child.wait()).await;
        let status = match wait {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                cleanup(work_dir).await;
                return Err(anyhow::anyhow!("ffmpeg process error: {e}"));
            }
            Err(_) => {
                let _ = child.kill().await;
                cleanup(work_dir).await;
                return Err(anyhow::anyhow!("ffmpeg timed out after {:?}", self.ffmpeg_timeout));
            }
        };

        if !status.success() {
            cleanup(work_dir.clone()).await;
            return Err(anyhow::anyhow!("ffmpeg exited with status {status}"));
        }

        let duration = probe_duration(&output_path).await;

        let processed_path = format!("{video_id}.mp4");
        let size = self
            .processed_store
            .adopt(&output_path, &processed_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to adopt ffmpeg output: {e}"))?;
        let _ = size;

        cleanup(work_dir).await;

        self.status_updater
            .to_ready(video_id, processed_path, duration)
            .await?;

        Ok(())
    }
}

/// Builds the ffmpeg argument list for a single edit. Video is always
/// re-encoded to `libx265`/`hvc1`/`medium`/CRF 23; audio is copied through
/// unless muted. A negative `cutStartTime` clamps to 0; an end time at or
/// before the (clamped) start time is ignored rather than producing an
/// empty or negative-length output.
fn build_ffmpeg_args(input: &std::path::Path, output: &std::path::Path, edit: &EditOptions) -> Vec<String> {
    let mut args = vec!["-hide_banner".to_string(), "-loglevel".to_string(), "error".to_string(), "-y".to_string()];

    let start = edit.cut_start_time.map(|s| s.max(0.0));

    if let Some(start) = start {
        args.push("-ss".to_string());
        args.push(format!("{start}"));
    }

    args.push("-i".to_string());
    args.push(input.to_string_lossy().to_string());

    if let Some(end) = edit.cut_end_time {
        let start = start.unwrap_or(0.0);
        if end > start {
            args.push("-t".to_string());
            args.push(format!("{}", end - start));
        } else {
            log::warn!("cutEndTime ({end}) <= cutStartTime ({start}), ignoring end time");
        }
    }

    if edit.mute {
        args.push("-an".to_string());
    }

    if let Some(height) = edit.target_resolution_height {
        args.push("-vf".to_string());
        args.push(format!("scale=-2:{height}"));
    }

    args.push("-c:v".to_string());
    args.push("libx265".to_string());
    args.push("-tag:v".to_string());
    args.push("hvc1".to_string());
    args.push("-preset".to_string());
    args.push("medium".to_string());
    args.push("-crf".to_string());
    args.push("23".to_string());

    if !edit.mute {
        args.push("-c:a".to_string());
        args.push("copy".to_string());
    }

    args.push(output.to_string_lossy().to_string());
    args
}

async fn probe_duration(path: &std::path::Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=nk=1:nw=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_reencodes_video_to_spec_codec() {
        let edit = EditOptions {
            cut_start_time: Some(1.0),
            cut_end_time: Some(5.0),
            mute: false,
            target_resolution_height: None,
        };
        let args = build_ffmpeg_args(std::path::Path::new("in"), std::path::Path::new("out"), &edit);
        assert!(args.iter().any(|a| a == "libx265"));
        assert!(args.iter().any(|a| a == "hvc1"));
        assert!(args.iter().any(|a| a == "medium"));
        assert!(args.iter().any(|a| a == "23"));
        assert!(args.iter().any(|a| a == "-ss"));
        assert!(args.iter().any(|a| a == "-t"));
        assert!(args.iter().any(|a| a == "-c:a"));
    }

    #[test]
    fn reencodes_when_mute_requested() {
        let edit = EditOptions {
            cut_start_time: None,
            cut_end_time: None,
            mute: true,
            target_resolution_height: None,
        };
        let args = build_ffmpeg_args(std::path::Path::new("in"), std::path::Path::new("out"), &edit);
        assert!(args.iter().any(|a| a == "-an"));
        assert!(args.iter().any(|a| a == "libx265"));
        assert!(!args.iter().any(|a| a == "-c:a"));
    }

    #[test]
    fn reencodes_when_resolution_requested() {
        let edit = EditOptions {
            cut_start_time: None,
            cut_end_time: None,
            mute: false,
            target_resolution_height: Some(480),
        };
        let args = build_ffmpeg_args(std::path::Path::new("in"), std::path::Path::new("out"), &edit);
        assert!(args.iter().any(|a| a == "scale=-2:480"));
        assert!(args.iter().any(|a| a == "-c:a"));
    }

    #[test]
    fn clamps_negative_start_to_zero() {
        let edit = EditOptions {
            cut_start_time: Some(-3.0),
            cut_end_time: None,
            mute: false,
            target_resolution_height: None,
        };
        let args = build_ffmpeg_args(std::path::Path::new("in"), std::path::Path::new("out"), &edit);
        let ss_idx = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss_idx + 1], "0");
    }

    #[test]
    fn ignores_end_time_at_or_before_start() {
        let edit = EditOptions {
            cut_start_time: Some(5.0),
            cut_end_time: Some(5.0),
            mute: false,
            target_resolution_height: None,
        };
        let args = build_ffmpeg_args(std::path::Path::new("in"), std::path::Path::new("out"), &edit);
        assert!(!args.iter().any(|a| a == "-t"));
    }
}
