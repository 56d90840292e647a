//! Serialized zone definitions, as authored by the zone editor.

use serde::{Deserialize, Serialize};

/// A polygon vertex in either `[x, y]` or `{"x": .., "y": ..}` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vertex {
    Pair([f64; 2]),
    Object { x: f64, y: f64 },
}

impl Vertex {
    pub fn xy(&self) -> (f64, f64) {
        match *self {
            Vertex::Pair([x, y]) => (x, y),
            Vertex::Object { x, y } => (x, y),
        }
    }
}

/// Canvas size a polygon was drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

fn default_color() -> [u8; 3] {
    [0, 255, 0]
}

/// One zone as stored in the zone configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    #[serde(alias = "zone_id")]
    pub id: String,
    pub name: String,
    pub polygon: Vec<Vertex>,
    pub allowed_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_canvas: Option<Canvas>,
    /// BGR display color; renderers only
    #[serde(default = "default_color")]
    pub color: [u8; 3],
}

impl ZoneDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        polygon: &[(f64, f64)],
        allowed_classes: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            polygon: polygon.iter().map(|&(x, y)| Vertex::Pair([x, y])).collect(),
            allowed_classes: allowed_classes.iter().map(|c| c.to_string()).collect(),
            reference_canvas: None,
            color: default_color(),
        }
    }

    pub fn with_reference_canvas(mut self, width: u32, height: u32) -> Self {
        self.reference_canvas = Some(Canvas::new(width, height));
        self
    }
}

/// Top-level zone configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDocument {
    pub zones: Vec<ZoneDefinition>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_vertex_forms() {
        let json = r#"{
            "zones": [
                {
                    "zone_id": "bus-lane",
                    "name": "Bus lane",
                    "polygon": [[0, 0], {"x": 100, "y": 0}, [100, 100]],
                    "allowed_classes": ["bus"],
                    "reference_canvas": {"width": 1280, "height": 720}
                }
            ]
        }"#;
        let doc: ZoneDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.version, "1.0");

        let zone = &doc.zones[0];
        assert_eq!(zone.id, "bus-lane");
        let xy: Vec<_> = zone.polygon.iter().map(Vertex::xy).collect();
        assert_eq!(xy, vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
        assert_eq!(zone.reference_canvas, Some(Canvas::new(1280, 720)));
        assert_eq!(zone.color, [0, 255, 0]);
    }

    #[test]
    fn test_missing_canvas_defaults_to_none() {
        let json = r#"{"id": "a", "name": "A", "polygon": [[0,0],[1,0],[1,1]], "allowed_classes": []}"#;
        let zone: ZoneDefinition = serde_json::from_str(json).unwrap();
        assert!(zone.reference_canvas.is_none());
    }
}
