//! Zone store: the set of configured zones and the membership queries on them.

use std::fs;
use std::path::Path;

use nalgebra::Point2;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::zone::definition::{ZoneDefinition, ZoneDocument};
use crate::zone::region::Zone;

/// Result of testing one ground point against the selected zones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoneCheck {
    /// Selected zones containing the point
    pub zones: Vec<String>,
    /// Subset of `zones` whose allow-list excludes the vehicle class
    pub violated: Vec<String>,
}

impl ZoneCheck {
    pub fn is_violating(&self) -> bool {
        !self.violated.is_empty()
    }
}

/// Holds the configured zones for one processing run.
#[derive(Debug, Clone, Default)]
pub struct ZoneStore {
    zones: Vec<Zone>,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from definitions, failing on the first invalid zone.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ZoneDefinition>) -> Result<Self> {
        let mut store = Self::new();
        for def in definitions {
            store.add(Zone::from_definition(def)?);
        }
        Ok(store)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ZoneDocument = serde_json::from_str(json)?;
        Self::from_definitions(doc.zones)
    }

    /// Load zones from a JSON zone document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let store = Self::from_json_str(&contents)?;
        info!(path = %path.display(), zones = store.len(), "loaded zones");
        Ok(store)
    }

    /// Write the zones back as a JSON zone document, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let doc = ZoneDocument {
            zones: self.zones.iter().map(Zone::to_definition).collect(),
            version: "1.0".to_string(),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))?;
        info!(path = %path.display(), zones = self.len(), "saved zones");
        Ok(())
    }

    /// Add a zone, replacing any zone with the same id.
    pub fn add(&mut self, zone: Zone) {
        if let Some(pos) = self.zones.iter().position(|z| z.id() == zone.id()) {
            warn!(zone_id = zone.id(), "zone already exists, replacing");
            self.zones.remove(pos);
        }
        info!(zone_id = zone.id(), name = zone.name(), "added zone");
        self.zones.push(zone);
    }

    pub fn remove(&mut self, zone_id: &str) -> bool {
        let before = self.zones.len();
        self.zones.retain(|z| z.id() != zone_id);
        let removed = self.zones.len() < before;
        if removed {
            info!(zone_id, "removed zone");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.zones.clear();
        info!("cleared all zones");
    }

    pub fn get(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id() == zone_id)
    }

    /// Lookup that treats an unknown id as an error.
    pub fn require(&self, zone_id: &str) -> Result<&Zone> {
        self.get(zone_id)
            .ok_or_else(|| Error::UnknownZone(zone_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Fails with [`Error::NoZones`] when nothing is configured.
    pub fn ensure_configured(&self) -> Result<()> {
        if self.is_empty() {
            Err(Error::NoZones)
        } else {
            Ok(())
        }
    }

    pub fn contains(&self, zone_id: &str, point: &Point2<f64>) -> Result<bool> {
        Ok(self.require(zone_id)?.contains(point))
    }

    pub fn is_class_allowed(&self, zone_id: &str, class: &str) -> Result<bool> {
        Ok(self.require(zone_id)?.is_class_allowed(class))
    }

    pub fn zones_at_point(&self, point: &Point2<f64>) -> Vec<&Zone> {
        self.zones.iter().filter(|z| z.contains(point)).collect()
    }

    /// Test a ground point of a vehicle of `class` against the selected zones.
    ///
    /// An empty selection means every zone. Unknown selected ids are an error.
    pub fn check_violation(
        &self,
        point: &Point2<f64>,
        class: &str,
        selected: &[String],
    ) -> Result<ZoneCheck> {
        let candidates: Vec<&Zone> = if selected.is_empty() {
            self.zones.iter().collect()
        } else {
            selected
                .iter()
                .map(|id| self.require(id))
                .collect::<Result<_>>()?
        };

        let mut check = ZoneCheck::default();
        for zone in candidates {
            if !zone.contains(point) {
                continue;
            }
            check.zones.push(zone.id().to_string());
            if !zone.is_class_allowed(class) {
                check.violated.push(zone.id().to_string());
            }
        }
        Ok(check)
    }

    /// Rescale every zone that carries a reference canvas to the target size.
    ///
    /// Zones without a reference canvas are assumed to be in target scale
    /// already and are left as they are.
    pub fn rescale(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!(width, height, "invalid target size for rescaling zones");
            return;
        }
        for zone in &mut self.zones {
            match zone.rescale(width, height) {
                Some((sx, sy)) => {
                    info!(zone_id = zone.id(), name = zone.name(), sx, sy, "rescaled zone")
                }
                None => debug!(
                    zone_id = zone.id(),
                    "zone has no reference canvas, skipping rescale"
                ),
            }
        }
    }
}
