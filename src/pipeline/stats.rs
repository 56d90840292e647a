//! Run statistics and the JSON report.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::violation::TrackKey;

const TOP_VIOLATORS: usize = 10;

/// Summary of one processing run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub frames_processed: u64,
    /// Sampled frames whose detection failed
    pub frames_skipped: u64,
    pub duration_seconds: f64,
    pub processing_fps: f64,
    pub total_detections: u64,
    pub avg_detections_per_frame: f64,
    /// Violating observations across all vehicles
    pub violating_observations: u64,
    pub confirmed_violations: u64,
    pub unique_vehicles: u64,
    pub violating_vehicles: u64,
    /// Share of unique vehicles seen violating at least once
    pub violation_rate: f64,
    /// Most frequent violators, highest count first
    pub top_violators: Vec<(TrackKey, u64)>,
}

impl RunStatistics {
    /// Write the statistics as pretty JSON.
    pub fn save_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }
}

/// Counters accumulated while the pipeline runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsCollector {
    frames_processed: u64,
    frames_skipped: u64,
    total_detections: u64,
    violations: BTreeMap<TrackKey, u64>,
    confirmed: BTreeSet<TrackKey>,
    vehicles: BTreeSet<TrackKey>,
    started: Option<Instant>,
    elapsed: Duration,
}

impl StatsCollector {
    pub(crate) fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub(crate) fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    pub(crate) fn record_frame(&mut self, detections: usize) {
        self.frames_processed += 1;
        self.total_detections += detections as u64;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.frames_processed += 1;
        self.frames_skipped += 1;
    }

    pub(crate) fn record_vehicle(&mut self, track: TrackKey) {
        if track != TrackKey::Untracked {
            self.vehicles.insert(track);
        }
    }

    pub(crate) fn record_violation(&mut self, track: TrackKey) {
        *self.violations.entry(track).or_default() += 1;
    }

    /// Returns true the first time `track` is confirmed.
    pub(crate) fn record_confirmation(&mut self, track: TrackKey) -> bool {
        self.confirmed.insert(track)
    }

    pub(crate) fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub(crate) fn summary(&self) -> RunStatistics {
        let elapsed = match self.started {
            Some(started) => self.elapsed + started.elapsed(),
            None => self.elapsed,
        };
        let duration_seconds = elapsed.as_secs_f64();
        let processing_fps = if duration_seconds > 0.0 {
            self.frames_processed as f64 / duration_seconds
        } else {
            0.0
        };
        let avg_detections_per_frame = if self.frames_processed > 0 {
            self.total_detections as f64 / self.frames_processed as f64
        } else {
            0.0
        };

        let violating_vehicles = self
            .violations
            .keys()
            .filter(|k| **k != TrackKey::Untracked)
            .count() as u64;
        let unique_vehicles = self.vehicles.len() as u64;
        let violation_rate = if unique_vehicles > 0 {
            violating_vehicles as f64 / unique_vehicles as f64
        } else {
            0.0
        };

        let mut top_violators: Vec<(TrackKey, u64)> =
            self.violations.iter().map(|(k, v)| (*k, *v)).collect();
        // Stable sort keeps key order among equal counts
        top_violators.sort_by(|a, b| b.1.cmp(&a.1));
        top_violators.truncate(TOP_VIOLATORS);

        RunStatistics {
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            duration_seconds,
            processing_fps,
            total_detections: self.total_detections,
            avg_detections_per_frame,
            violating_observations: self.violations.values().sum(),
            confirmed_violations: self.confirmed.len() as u64,
            unique_vehicles,
            violating_vehicles,
            violation_rate,
            top_violators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut stats = StatsCollector::default();
        stats.record_frame(2);
        stats.record_frame(4);
        stats.record_skipped();
        for id in [1, 2, 3] {
            stats.record_vehicle(TrackKey::Tracked(id));
        }
        stats.record_vehicle(TrackKey::Untracked);
        stats.record_violation(TrackKey::Tracked(2));
        stats.record_violation(TrackKey::Tracked(2));
        stats.record_violation(TrackKey::Tracked(3));
        assert!(stats.record_confirmation(TrackKey::Tracked(2)));
        assert!(!stats.record_confirmation(TrackKey::Tracked(2)));

        let summary = stats.summary();
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.total_detections, 6);
        assert_eq!(summary.avg_detections_per_frame, 2.0);
        assert_eq!(summary.violating_observations, 3);
        assert_eq!(summary.confirmed_violations, 1);
        assert_eq!(summary.unique_vehicles, 3);
        assert_eq!(summary.violating_vehicles, 2);
        assert_eq!(
            summary.top_violators,
            vec![(TrackKey::Tracked(2), 2), (TrackKey::Tracked(3), 1)]
        );
    }

    #[test]
    fn test_top_violators_truncated() {
        let mut stats = StatsCollector::default();
        for id in 0..15 {
            stats.record_violation(TrackKey::Tracked(id));
        }
        assert_eq!(stats.summary().top_violators.len(), TOP_VIOLATORS);
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut stats = StatsCollector::default();
        stats.record_violation(TrackKey::Untracked);
        stats.summary().save_report(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["violating_observations"], 1);
        assert_eq!(value["top_violators"][0][0], serde_json::Value::Null);
    }
}
