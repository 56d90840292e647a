//! Error type shared by the zone store, violation engine and pipeline.

use std::path::PathBuf;

/// Errors surfaced by the violation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Zone-based evaluation was requested with an empty zone store.
    #[error("no zones configured; zones are required before processing")]
    NoZones,

    /// A zone polygon has fewer than three vertices.
    #[error("zone {zone_id} has {points} polygon points, at least 3 are required")]
    DegeneratePolygon { zone_id: String, points: usize },

    /// A reference canvas with a zero dimension.
    #[error("zone {zone_id} has invalid reference canvas {width}x{height}")]
    InvalidCanvas {
        zone_id: String,
        width: u32,
        height: u32,
    },

    /// Lookup of a zone id that is not in the store.
    #[error("unknown zone id: {0}")]
    UnknownZone(String),

    /// A detection box that is not ordered as x1 < x2, y1 < y2.
    #[error("invalid detection box [{x1}, {y1}, {x2}, {y2}]")]
    InvalidBox { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// A crop region that does not intersect the frame.
    #[error("crop region for track {track} lies outside the {width}x{height} frame")]
    CropOutOfBounds {
        track: String,
        width: u32,
        height: u32,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
