//! Evidence snapshots of confirmed violations.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_hollow_rect_mut;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::tracker::{PixelRegion, Rect};
use crate::violation::TrackKey;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Everything needed to persist the evidence of one confirmed violation.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRequest<'a> {
    pub track: TrackKey,
    /// Frame on which the violation was confirmed
    pub current_index: u64,
    pub current_frame: &'a RgbImage,
    pub current_bbox: Rect,
    /// Frame the crop is taken from: the streak start when still retained
    pub source_index: u64,
    pub source_frame: &'a RgbImage,
    pub source_bbox: Rect,
}

/// Metadata of a saved snapshot set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSnapshot {
    pub track_id: TrackKey,
    /// Frame the crop came from
    pub frame_index: u64,
    pub confirmed_frame_index: u64,
    pub full_snapshot_path: PathBuf,
    pub crop_snapshot_path: PathBuf,
    /// Vehicle box the crop was built from
    pub bbox: Rect,
    pub crop_region: PixelRegion,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Persistence for evidence snapshots.
pub trait SnapshotStore {
    fn save(&mut self, request: &SnapshotRequest<'_>) -> Result<EvidenceSnapshot>;
}

/// Box grown by `padding` on each side, clamped to the frame.
pub fn crop_region(bbox: &Rect, padding: f64, width: u32, height: u32) -> Option<PixelRegion> {
    bbox.padded(padding).clamp_to_frame(width, height)
}

/// Writes JPEG snapshots and a JSON sidecar into one directory.
#[derive(Debug, Clone)]
pub struct DiskSnapshotStore {
    dir: PathBuf,
    padding: f64,
}

impl DiskSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, padding: f64) -> Self {
        Self {
            dir: dir.into(),
            padding,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for DiskSnapshotStore {
    fn save(&mut self, request: &SnapshotRequest<'_>) -> Result<EvidenceSnapshot> {
        let (width, height) = request.source_frame.dimensions();
        let region = crop_region(&request.source_bbox, self.padding, width, height)
            .ok_or_else(|| Error::CropOutOfBounds {
                track: request.track.to_string(),
                width,
                height,
            })?;

        // Concurrent jobs may share the directory; create_dir_all tolerates that.
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let PixelRegion {
            x,
            y,
            width: crop_w,
            height: crop_h,
        } = region;
        let crop = imageops::crop_imm(request.source_frame, x, y, crop_w, crop_h).to_image();

        let mut full = request.current_frame.clone();
        let (cw, ch) = full.dimensions();
        if let Some(r) = request.current_bbox.clamp_to_frame(cw, ch) {
            draw_hollow_rect_mut(
                &mut full,
                imageproc::rect::Rect::at(r.x as i32, r.y as i32).of_size(r.width, r.height),
                BOX_COLOR,
            );
        }

        let stem = format!("track_{}_frame_{}", request.track, request.current_index);
        let full_path = self.dir.join(format!("{stem}_full.jpg"));
        let crop_path = self.dir.join(format!(
            "track_{}_frame_{}_crop.jpg",
            request.track, request.source_index
        ));
        let meta_path = self.dir.join(format!("{stem}_meta.json"));

        // A failed set leaves no files behind, so a retry starts clean
        crop.save(&crop_path)?;
        if let Err(e) = full.save(&full_path) {
            remove_partial(&[crop_path.as_path()]);
            return Err(e.into());
        }

        let snapshot = EvidenceSnapshot {
            track_id: request.track,
            frame_index: request.source_index,
            confirmed_frame_index: request.current_index,
            full_snapshot_path: full_path,
            crop_snapshot_path: crop_path,
            bbox: request.source_bbox,
            crop_region: region,
            canvas_width: width,
            canvas_height: height,
        };

        let written = serde_json::to_string_pretty(&snapshot)
            .map_err(Error::from)
            .and_then(|json| fs::write(&meta_path, json).map_err(|e| Error::io(&meta_path, e)));
        if let Err(e) = written {
            remove_partial(&[
                snapshot.crop_snapshot_path.as_path(),
                snapshot.full_snapshot_path.as_path(),
            ]);
            return Err(e);
        }

        info!(
            track = %request.track,
            frame = request.source_index,
            path = %snapshot.full_snapshot_path.display(),
            "saved evidence snapshot"
        );
        Ok(snapshot)
    }
}

fn remove_partial(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove partial snapshot");
        }
    }
}
