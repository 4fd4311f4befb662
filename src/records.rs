//! Plain records handed to the scene core by the file adapters.
//!
//! Parsers for CSV/EVP/DXF live outside this crate; whatever they read ends up
//! in one of these shapes. Everything here is serde-friendly so a whole
//! dataset can also be loaded from a single JSON document.

use glam::Vec3;

/// Marker geometry family used for seismic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    #[default]
    Spheres,
    BeachBalls,
    Points,
}

impl VisualStyle {
    pub fn label(self) -> &'static str {
        match self {
            Self::Spheres => "spheres",
            Self::BeachBalls => "beach_balls",
            Self::Points => "points",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(alias = "eventType", default = "unknown_event_type")]
    pub event_type: String,
    #[serde(default)]
    pub energy: f64,
}

fn unknown_event_type() -> String {
    "unknown".to_string()
}

impl EventRecord {
    pub fn scene_position(&self) -> Vec3 {
        survey_to_scene([self.x, self.y, self.z])
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectorRecord {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DetectorRecord {
    pub fn scene_position(&self) -> Vec3 {
        survey_to_scene([self.x, self.y, self.z])
    }
}

/// One planar face of an imported CAD model, in source (Z-up) coordinates.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PolygonFace {
    pub vertices: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PolygonSoup {
    pub faces: Vec<PolygonFace>,
}

/// Per-energy-bucket colour/opacity override chosen for one source file.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BucketOverride {
    pub threshold: f64,
    pub color: [f32; 3],
    #[serde(default = "full_opacity")]
    pub opacity: f32,
}

fn full_opacity() -> f32 {
    1.0
}

impl BucketOverride {
    pub fn rgba(&self) -> [f32; 4] {
        [self.color[0], self.color[1], self.color[2], self.opacity.clamp(0.0, 1.0)]
    }
}

/// Survey files are Z-up; the renderer is Y-up.
pub fn survey_to_scene(point: [f64; 3]) -> Vec3 {
    Vec3::new(point[0] as f32, point[2] as f32, point[1] as f32)
}

/// A bundle of sources, as read by the viewer harness.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub sources: Vec<DatasetSource>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSource {
    Events {
        name: String,
        #[serde(default)]
        style: VisualStyle,
        #[serde(default)]
        overrides: Vec<BucketOverride>,
        events: Vec<EventRecord>,
    },
    Detectors {
        name: String,
        detectors: Vec<DetectorRecord>,
    },
    Terrain {
        name: String,
        soup: PolygonSoup,
    },
}

impl DatasetSource {
    pub fn name(&self) -> &str {
        match self {
            Self::Events { name, .. } | Self::Detectors { name, .. } | Self::Terrain { name, .. } => {
                name
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_coordinates_swap_y_and_z() {
        let p = survey_to_scene([1.0, 2.0, 3.0]);
        assert_eq!(p, Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn style_uses_snake_case_names() {
        let json = serde_json::to_string(&VisualStyle::BeachBalls).unwrap();
        assert_eq!(json, "\"beach_balls\"");
        let parsed: VisualStyle = serde_json::from_str("\"points\"").unwrap();
        assert_eq!(parsed, VisualStyle::Points);
    }

    #[test]
    fn event_record_accepts_camel_case_type_and_defaults() {
        let record: EventRecord =
            serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.0, "eventType": "explosion"}"#)
                .unwrap();
        assert_eq!(record.event_type, "explosion");
        assert_eq!(record.energy, 0.0);

        let record: EventRecord = serde_json::from_str(r#"{"x": 0, "y": 0, "z": 0}"#).unwrap();
        assert_eq!(record.event_type, "unknown");
    }

    #[test]
    fn dataset_sources_are_tagged_by_kind() {
        let json = r#"{
            "sources": [
                {"kind": "detectors", "name": "detectors.csv",
                 "detectors": [{"id": 7, "x": 1, "y": 2, "z": 3}]},
                {"kind": "events", "name": "march.evp", "style": "points",
                 "events": [{"x": 0, "y": 0, "z": 0, "event_type": "earthquake", "energy": 5e9}]},
                {"kind": "terrain", "name": "pit.dxf",
                 "soup": {"faces": [{"vertices": [[0,0,0],[1,0,0],[0,1,0]]}]}}
            ]
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.sources.len(), 3);
        assert_eq!(dataset.sources[0].name(), "detectors.csv");
        match &dataset.sources[1] {
            DatasetSource::Events { style, events, overrides, .. } => {
                assert_eq!(*style, VisualStyle::Points);
                assert_eq!(events[0].energy, 5e9);
                assert!(overrides.is_empty());
            }
            other => panic!("Expected events source, got {:?}", other),
        }
    }
}
