//! ViolationPipeline: detection, tracking, violation checks and evidence per frame.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::evidence::{
    DiskSnapshotStore, EvidenceSnapshot, Frame, FrameRetentionBuffer, SnapshotRequest,
    SnapshotStore,
};
use crate::pipeline::config::{EvaluationMode, IdentitySource, PipelineConfig};
use crate::pipeline::detector::DetectionSource;
use crate::pipeline::stats::{RunStatistics, StatsCollector};
use crate::tracker::{CentroidTracker, Detection};
use crate::violation::{LaneBoundary, LaneSmoother, TrackKey, ViolationEngine, ViolationStatus};
use crate::zone::ZoneStore;

const PROGRESS_EVERY: u64 = 30;

/// One detection after identity assignment and evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedDetection {
    pub detection: Detection,
    pub track_id: Option<u64>,
    /// None while the track is not yet active
    pub violation: Option<ViolationStatus>,
    pub confirmed: bool,
}

/// Outcome of one `process_frame` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_index: u64,
    /// False for frames dropped by frame sampling
    pub sampled: bool,
    /// True when detection failed on this frame
    pub skipped: bool,
    pub detections: Vec<TrackedDetection>,
    /// Snapshots saved on this frame
    pub evidence: Vec<EvidenceSnapshot>,
}

impl FrameResult {
    fn new(frame_index: u64, sampled: bool, skipped: bool) -> Self {
        Self {
            frame_index,
            sampled,
            skipped,
            detections: Vec::new(),
            evidence: Vec::new(),
        }
    }

    /// Detections violating on this frame.
    pub fn violations(&self) -> impl Iterator<Item = &TrackedDetection> {
        self.detections
            .iter()
            .filter(|d| d.violation.as_ref().is_some_and(|v| v.is_violating))
    }

    /// Detections whose violation is confirmed on this frame.
    pub fn confirmed(&self) -> impl Iterator<Item = &TrackedDetection> {
        self.detections.iter().filter(|d| d.confirmed)
    }
}

/// Runs the full violation workflow over a stream of frames.
///
/// Each sampled frame goes through detection, the zone filter, identity
/// assignment and evaluation. Once a vehicle's streak reaches the
/// confirmation threshold its evidence is saved exactly once.
pub struct ViolationPipeline<D: DetectionSource, S: SnapshotStore = DiskSnapshotStore> {
    detector: D,
    snapshots: S,
    zones: ZoneStore,
    tracker: CentroidTracker,
    engine: ViolationEngine,
    buffer: FrameRetentionBuffer<Frame>,
    lanes: LaneSmoother,
    config: PipelineConfig,
    threshold: u32,
    evidence: HashMap<TrackKey, EvidenceSnapshot>,
    /// Last frame each upstream id was seen inside a selected zone
    zone_presence: HashMap<u64, u64>,
    canvas: Option<(u32, u32)>,
    stats: StatsCollector,
}

impl<D: DetectionSource> ViolationPipeline<D> {
    /// Create a pipeline that writes evidence to `config.snapshot_dir`.
    pub fn new(detector: D, zones: ZoneStore, config: PipelineConfig) -> Result<Self> {
        let store = DiskSnapshotStore::new(config.snapshot_dir.clone(), config.crop_padding);
        Self::with_snapshot_store(detector, zones, store, config)
    }
}

impl<D: DetectionSource, S: SnapshotStore> ViolationPipeline<D, S> {
    /// Create a pipeline with a custom snapshot store.
    ///
    /// Fails when zone mode has no zones to check or a selected zone id is
    /// unknown, before any frame is processed.
    pub fn with_snapshot_store(
        detector: D,
        zones: ZoneStore,
        snapshots: S,
        config: PipelineConfig,
    ) -> Result<Self> {
        if config.mode == EvaluationMode::Zones {
            zones.ensure_configured()?;
        }
        for zone_id in &config.selected_zones {
            zones.require(zone_id)?;
        }

        let threshold = config.confirmation_threshold();
        info!(
            zones = zones.len(),
            frame_interval = config.frame_interval(),
            threshold,
            mode = ?config.mode,
            identity = ?config.identity,
            "violation pipeline ready"
        );

        Ok(Self {
            detector,
            snapshots,
            zones,
            tracker: CentroidTracker::new(config.tracker.clone()),
            engine: ViolationEngine::new(config.lane_violation_threshold),
            buffer: FrameRetentionBuffer::new(config.retention_capacity),
            lanes: LaneSmoother::new(config.lane_smoothing_alpha),
            threshold,
            evidence: HashMap::new(),
            zone_presence: HashMap::new(),
            canvas: None,
            stats: StatsCollector::default(),
            config,
        })
    }

    /// Process one frame of the stream.
    ///
    /// Frames whose index is not a multiple of the frame interval are
    /// returned unsampled without touching any state. A detector failure
    /// skips the frame but still ages the tracker.
    pub fn process_frame(&mut self, frame_index: u64, frame: &Frame) -> Result<FrameResult> {
        if frame_index % self.config.frame_interval() != 0 {
            return Ok(FrameResult::new(frame_index, false, false));
        }

        self.fit_zones_to(frame);
        self.buffer.record(frame_index, frame.clone());
        let timestamp = self.timestamp(frame_index);

        let detections = match self.detector.detect(frame, frame_index) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(frame = frame_index, error = %e, "detection failed, skipping frame");
                if self.config.identity == IdentitySource::Tracker {
                    self.tracker.update(&[], timestamp);
                }
                self.stats.record_skipped();
                self.periodic_cleanup(frame_index);
                return Ok(FrameResult::new(frame_index, true, true));
            }
        };

        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| match d.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(frame = frame_index, error = %e, "dropping detection");
                    false
                }
            })
            .collect();
        self.stats.record_frame(detections.len());

        let candidates = self.filter_to_zones(frame_index, detections)?;
        if self.config.identity == IdentitySource::Tracker {
            self.tracker.update(&candidates, timestamp);
        }

        let mut result = FrameResult::new(frame_index, true, false);
        let mut observed = HashSet::new();
        for (index, detection) in candidates.into_iter().enumerate() {
            let (track_id, active) = match self.config.identity {
                IdentitySource::Tracker => match self.tracker.track_for_detection(index) {
                    Some(track) => (
                        Some(track.track_id),
                        track.is_confirmed(self.tracker.config().min_hits),
                    ),
                    None => (None, false),
                },
                IdentitySource::Upstream => (detection.track_id, true),
            };

            if !active {
                result.detections.push(TrackedDetection {
                    detection,
                    track_id,
                    violation: None,
                    confirmed: false,
                });
                continue;
            }

            let key = TrackKey::from(track_id);
            observed.insert(key);
            self.stats.record_vehicle(key);
            let status = match self.config.mode {
                EvaluationMode::Zones => self.engine.evaluate(
                    &self.zones,
                    &detection,
                    key,
                    &self.config.selected_zones,
                    frame_index,
                )?,
                EvaluationMode::Lanes => self.engine.evaluate_lane(
                    &detection,
                    key,
                    self.lanes.current(),
                    frame_index,
                ),
            };

            if status.is_violating {
                self.stats.record_violation(key);
            }
            let confirmed = status.is_confirmed(self.threshold);
            if confirmed {
                if self.stats.record_confirmation(key) {
                    info!(
                        track = %key,
                        frame = frame_index,
                        streak = status.consecutive_count,
                        zones = ?status.violated_zones,
                        "violation confirmed"
                    );
                }
                if !self.evidence.contains_key(&key) {
                    if let Some(snapshot) = self.capture(key, frame_index, frame, &detection) {
                        result.evidence.push(snapshot);
                    }
                }
            }

            result.detections.push(TrackedDetection {
                detection,
                track_id,
                violation: Some(status),
                confirmed,
            });
        }

        // Streaks only run over consecutive observations
        self.engine.break_unobserved(&observed);
        self.periodic_cleanup(frame_index);
        Ok(result)
    }

    /// Process frames until the iterator ends or `cancel` is set.
    pub fn run<I>(&mut self, frames: I, cancel: &AtomicBool) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = (u64, Frame)>,
    {
        self.stats.start();
        let outcome = self.run_frames(frames, cancel);
        self.stats.stop();
        outcome?;

        let summary = self.stats.summary();
        info!(
            frames = summary.frames_processed,
            skipped = summary.frames_skipped,
            confirmed = summary.confirmed_violations,
            vehicles = summary.unique_vehicles,
            seconds = summary.duration_seconds,
            "run finished"
        );
        Ok(summary)
    }

    fn run_frames<I>(&mut self, frames: I, cancel: &AtomicBool) -> Result<()>
    where
        I: IntoIterator<Item = (u64, Frame)>,
    {
        for (frame_index, frame) in frames {
            if cancel.load(Ordering::Relaxed) {
                info!(frame = frame_index, "run cancelled");
                break;
            }
            let result = self.process_frame(frame_index, &frame)?;
            if result.sampled && self.stats.frames_processed() % PROGRESS_EVERY == 0 {
                debug!(
                    frame = frame_index,
                    processed = self.stats.frames_processed(),
                    tracked = self.tracker.tracks().len(),
                    "progress"
                );
            }
        }
        Ok(())
    }

    /// Feed the lane boundaries observed on the current frame.
    pub fn set_lane_boundaries(&mut self, observed: &[LaneBoundary]) -> &[LaneBoundary] {
        self.lanes.smooth(observed)
    }

    /// Clear all per-run state. Zones and configuration are kept.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.engine.reset();
        self.buffer.clear();
        self.lanes.reset();
        self.evidence.clear();
        self.zone_presence.clear();
        self.stats = StatsCollector::default();
    }

    /// Statistics gathered so far.
    pub fn statistics(&self) -> RunStatistics {
        self.stats.summary()
    }

    pub fn evidence_for(&self, track: TrackKey) -> Option<&EvidenceSnapshot> {
        self.evidence.get(&track)
    }

    pub fn evidence(&self) -> impl Iterator<Item = &EvidenceSnapshot> {
        self.evidence.values()
    }

    pub fn confirmation_threshold(&self) -> u32 {
        self.threshold
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneStore {
        &self.zones
    }

    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &ViolationEngine {
        &self.engine
    }

    pub fn buffer(&self) -> &FrameRetentionBuffer<Frame> {
        &self.buffer
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn snapshot_store(&self) -> &S {
        &self.snapshots
    }

    fn timestamp(&self, frame_index: u64) -> f64 {
        if self.config.fps > 0.0 {
            frame_index as f64 / self.config.fps
        } else {
            frame_index as f64
        }
    }

    /// Zones are authored on a reference canvas; bring them to frame size.
    fn fit_zones_to(&mut self, frame: &Frame) {
        let dims = frame.dimensions();
        if self.canvas != Some(dims) {
            self.zones.rescale(dims.0, dims.1);
            self.canvas = Some(dims);
        }
    }

    /// Keep detections inside a selected zone, or inside any zone when none
    /// is selected. Upstream ids seen inside recently stay in for the grace
    /// window. Lane mode keeps everything.
    fn filter_to_zones(
        &mut self,
        frame_index: u64,
        detections: Vec<Detection>,
    ) -> Result<Vec<Detection>> {
        if self.config.mode == EvaluationMode::Lanes {
            return Ok(detections);
        }

        let grace = self.config.zone_grace_frames * self.config.frame_interval();
        let mut kept = Vec::with_capacity(detections.len());
        for detection in detections {
            let point = detection.ground_point();
            let inside = if self.config.selected_zones.is_empty() {
                !self.zones.zones_at_point(&point).is_empty()
            } else {
                let mut inside = false;
                for zone_id in &self.config.selected_zones {
                    if self.zones.contains(zone_id, &point)? {
                        inside = true;
                        break;
                    }
                }
                inside
            };

            if inside {
                if let Some(id) = detection.track_id {
                    self.zone_presence.insert(id, frame_index);
                }
                kept.push(detection);
                continue;
            }

            let recent = detection
                .track_id
                .and_then(|id| self.zone_presence.get(&id))
                .is_some_and(|&last| frame_index.saturating_sub(last) <= grace);
            if grace > 0 && recent {
                kept.push(detection);
            }
        }
        Ok(kept)
    }

    fn capture(
        &mut self,
        key: TrackKey,
        frame_index: u64,
        frame: &Frame,
        detection: &Detection,
    ) -> Option<EvidenceSnapshot> {
        let streak_start = self
            .engine
            .record(key)
            .and_then(|r| Some((r.first_violation_frame?, r.first_violation_bbox?)));

        // Crop from the streak start when that frame is still retained
        let (source_index, source_frame, source_bbox) = match streak_start {
            Some((start, bbox)) if start != frame_index => match self.buffer.get(start) {
                Some(retained) => (start, retained, bbox),
                None => (frame_index, frame, detection.bbox),
            },
            _ => (frame_index, frame, detection.bbox),
        };

        let request = SnapshotRequest {
            track: key,
            current_index: frame_index,
            current_frame: frame,
            current_bbox: detection.bbox,
            source_index,
            source_frame,
            source_bbox,
        };
        match self.snapshots.save(&request) {
            Ok(snapshot) => {
                self.evidence.insert(key, snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                warn!(track = %key, frame = frame_index, error = %e, "failed to save evidence");
                None
            }
        }
    }

    fn periodic_cleanup(&mut self, frame_index: u64) {
        let interval = self.config.cleanup_interval;
        if interval == 0 || self.stats.frames_processed() % interval != 0 {
            return;
        }
        let max_age = u64::from(self.config.tracker.max_age) * self.config.frame_interval();
        self.engine.cleanup(max_age, frame_index);

        let horizon = self.config.zone_grace_frames * self.config.frame_interval();
        self.zone_presence
            .retain(|_, last| frame_index.saturating_sub(*last) <= horizon);
    }
}
