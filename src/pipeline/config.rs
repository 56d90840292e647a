use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::threshold::confirmation_threshold;
use crate::tracker::TrackerConfig;

/// What a vehicle is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Zone polygons with class allow-lists
    #[default]
    Zones,
    /// Smoothed lane boundaries supplied per frame
    Lanes,
}

/// Where violation histories take their identity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Ids from the centroid tracker; only active tracks are evaluated
    #[default]
    Tracker,
    /// Ids persisted by the detector; detections without one share a bucket
    Upstream,
}

/// Configuration for one processing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackerConfig,
    /// Process every K-th frame
    pub frame_interval: u64,
    /// Source frame rate, used to derive frame timestamps
    pub fps: f64,
    /// Streak length needed for confirmation at dense sampling
    pub base_confirmation_threshold: u32,
    /// Sampled frames kept for evidence capture
    pub retention_capacity: usize,
    /// Crop padding as a fraction of the box size on each side
    pub crop_padding: f64,
    pub snapshot_dir: PathBuf,
    /// Zones to check; empty means all
    pub selected_zones: Vec<String>,
    /// Processed frames an upstream identity stays in the zone filter after leaving
    pub zone_grace_frames: u64,
    /// Processed frames between violation history cleanups, 0 disables
    pub cleanup_interval: u64,
    pub mode: EvaluationMode,
    pub identity: IdentitySource,
    /// Lane score above which a vehicle violates in lane mode
    pub lane_violation_threshold: f64,
    pub lane_smoothing_alpha: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            frame_interval: 1,
            fps: 30.0,
            base_confirmation_threshold: 3,
            retention_capacity: 12,
            crop_padding: 0.15,
            snapshot_dir: PathBuf::from("snapshots"),
            selected_zones: Vec::new(),
            zone_grace_frames: 0,
            cleanup_interval: 30,
            mode: EvaluationMode::default(),
            identity: IdentitySource::default(),
            lane_violation_threshold: 0.3,
            lane_smoothing_alpha: 0.3,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Sampling interval, never below 1.
    pub fn frame_interval(&self) -> u64 {
        self.frame_interval.max(1)
    }

    pub fn confirmation_threshold(&self) -> u32 {
        confirmation_threshold(self.frame_interval(), self.base_confirmation_threshold)
    }
}
