//! Batch rendering: every frame of a video, overlays included, to PNG files.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::api::VideoBackend;
use crate::config::PlayerSettings;
use crate::playback::PlaybackCommand;
use crate::player::{DrawOutcome, PlayerView, ViewStatus};
use crate::render::RasterSurface;
use crate::ui::Ui;

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Frame numbers whose image could not be loaded.
    pub failed: Vec<u64>,
    pub detections_drawn: usize,
}

/// Render all frames of `video_id` into `out_dir` as `frame_<number>.png`.
///
/// Per-frame image failures are reported and skipped. A failed dataset load
/// is an error; an empty one writes nothing.
pub fn export_video(
    backend: &dyn VideoBackend,
    video_id: u64,
    settings: &PlayerSettings,
    mut surface: RasterSurface,
    out_dir: &Path,
    ui: &Ui,
) -> Result<ExportReport> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create export dir {}", out_dir.display()))?;

    let mut view = PlayerView::new(settings);
    let status = {
        let _stage = ui.stage(&format!("Load video {}", video_id));
        view.load_blocking(backend, video_id)
    };
    let frame_count = match status {
        ViewStatus::Ready { .. } => view.playback().frame_count,
        ViewStatus::NoData { .. } => {
            log::warn!("video {} has no frames; nothing to export", video_id);
            return Ok(ExportReport::default());
        }
        ViewStatus::Failed(err) => return Err(anyhow!(err)),
        other => return Err(anyhow!("unexpected view state {:?}", other)),
    };

    let mut report = ExportReport::default();
    let mut progress = ui.progress("Render frames", frame_count as u64);
    for index in 0..frame_count {
        view.command(PlaybackCommand::Seek(index as i64), Instant::now());
        let frame_number = view
            .current_frame()
            .map(|frame| frame.frame_number)
            .ok_or_else(|| anyhow!("frame index {} out of range", index))?;
        match view.draw_blocking(backend, &mut surface) {
            Some(DrawOutcome::Drawn(draw)) => {
                let path = out_dir.join(format!("frame_{:05}.png", frame_number));
                surface.save_png(&path)?;
                report.detections_drawn += draw.drawn();
                report.written.push(path);
            }
            Some(DrawOutcome::Failed(err)) => {
                log::warn!("skipping frame {}: {}", frame_number, err);
                report.failed.push(frame_number);
            }
            Some(DrawOutcome::Discarded) | None => {}
        }
        progress.step(&format!("frame {}", frame_number));
    }
    log::info!(
        "exported {} frames ({} detections, {} failed) to {}",
        report.written.len(),
        report.detections_drawn,
        report.failed.len(),
        out_dir.display()
    );
    Ok(report)
}
