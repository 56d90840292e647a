//! Validated zone: polygon plus vehicle-class allow-list.

use std::collections::BTreeSet;

use nalgebra::Point2;

use crate::error::{Error, Result};
use crate::zone::definition::{Canvas, Vertex, ZoneDefinition};
use crate::zone::polygon::Polygon;

/// A named polygon region with the vehicle classes permitted inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    id: String,
    name: String,
    polygon: Polygon,
    allowed_classes: BTreeSet<String>,
    reference_canvas: Option<Canvas>,
    color: [u8; 3],
}

impl Zone {
    /// Validate a definition: at least three vertices, non-zero canvas.
    pub fn from_definition(def: ZoneDefinition) -> Result<Self> {
        if def.polygon.len() < 3 {
            return Err(Error::DegeneratePolygon {
                zone_id: def.id,
                points: def.polygon.len(),
            });
        }
        if let Some(canvas) = def.reference_canvas {
            if canvas.width == 0 || canvas.height == 0 {
                return Err(Error::InvalidCanvas {
                    zone_id: def.id,
                    width: canvas.width,
                    height: canvas.height,
                });
            }
        }

        let vertices = def
            .polygon
            .iter()
            .map(|v| {
                let (x, y) = v.xy();
                Point2::new(x, y)
            })
            .collect();

        Ok(Self {
            id: def.id,
            name: def.name,
            polygon: Polygon::new(vertices),
            allowed_classes: def.allowed_classes.into_iter().collect(),
            reference_canvas: def.reference_canvas,
            color: def.color,
        })
    }

    pub fn to_definition(&self) -> ZoneDefinition {
        ZoneDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            polygon: self
                .polygon
                .vertices()
                .iter()
                .map(|v| Vertex::Pair([v.x, v.y]))
                .collect(),
            allowed_classes: self.allowed_classes.iter().cloned().collect(),
            reference_canvas: self.reference_canvas,
            color: self.color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn allowed_classes(&self) -> &BTreeSet<String> {
        &self.allowed_classes
    }

    pub fn reference_canvas(&self) -> Option<Canvas> {
        self.reference_canvas
    }

    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.polygon.contains(point)
    }

    pub fn is_class_allowed(&self, class: &str) -> bool {
        self.allowed_classes.contains(class)
    }

    /// Rescale from the reference canvas to `width` x `height`.
    ///
    /// Returns the applied factors, or `None` when the zone has no reference
    /// canvas and is left untouched. The target becomes the new reference
    /// canvas, so rescaling back to the authored size restores the polygon.
    pub fn rescale(&mut self, width: u32, height: u32) -> Option<(f64, f64)> {
        let canvas = self.reference_canvas?;
        let sx = width as f64 / canvas.width as f64;
        let sy = height as f64 / canvas.height as f64;
        self.polygon.scale(sx, sy);
        self.reference_canvas = Some(Canvas::new(width, height));
        Some((sx, sy))
    }
}
