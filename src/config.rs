use crate::geometry::{with_alpha, Rgb, Rgba, POINT_TESSELLATION};
use crate::records::Dataset;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Default colour and opacity for events above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnergyBucket {
    pub threshold: f64,
    pub color: Rgb,
    pub opacity: f32,
}

impl EnergyBucket {
    pub fn rgba(&self) -> Rgba {
        with_alpha(self.color, self.opacity)
    }
}

fn default_buckets() -> Vec<EnergyBucket> {
    [
        (1e11, [1.0, 0.0, 0.0]),
        (1e9, [1.0, 0.5, 0.0]),
        (1e8, [1.0, 1.0, 0.0]),
        (1e6, [0.0, 1.0, 0.0]),
        (1e3, [0.0, 0.0, 1.0]),
        (0.0, [0.5, 0.5, 0.5]),
    ]
    .into_iter()
    .map(|(threshold, color)| EnergyBucket {
        threshold,
        color,
        opacity: 1.0,
    })
    .collect()
}

fn default_type_multipliers() -> BTreeMap<String, f64> {
    [
        ("explosion", 3.0),
        ("earthquake", 1.5),
        ("microseismic", 0.8),
        ("unknown", 0.5),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}

/// Sizing and colouring rules for event and detector markers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub energy_buckets: Vec<EnergyBucket>,
    pub type_multipliers: BTreeMap<String, f64>,
    pub default_type_multiplier: f64,
    pub size_cap: f64,
    pub point_scale: f32,
    pub detector_scale: f32,
    pub sphere_tessellation: u32,
    pub point_tessellation: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            energy_buckets: default_buckets(),
            type_multipliers: default_type_multipliers(),
            default_type_multiplier: 1.5,
            size_cap: 100.0,
            point_scale: 5.0,
            detector_scale: 50.0,
            sphere_tessellation: 32,
            point_tessellation: POINT_TESSELLATION,
        }
    }
}

const FALLBACK_BUCKET: EnergyBucket = EnergyBucket {
    threshold: 0.0,
    color: [0.5, 0.5, 0.5],
    opacity: 1.0,
};

impl MarkerConfig {
    /// Sorts buckets by descending threshold.
    pub fn normalized(mut self) -> Self {
        self.energy_buckets
            .sort_by(|a, b| b.threshold.total_cmp(&a.threshold));
        self
    }

    /// First bucket whose threshold `energy` exceeds; the lowest bucket
    /// catches everything else, including non-positive energies.
    pub fn bucket_for(&self, energy: f64) -> &EnergyBucket {
        self.energy_buckets
            .iter()
            .find(|bucket| energy > bucket.threshold)
            .or_else(|| self.energy_buckets.last())
            .unwrap_or(&FALLBACK_BUCKET)
    }

    pub fn type_multiplier(&self, event_type: &str) -> f64 {
        self.type_multipliers
            .get(event_type)
            .copied()
            .unwrap_or(self.default_type_multiplier)
    }

    /// `min(|ln(energy)| * multiplier, size_cap)`, or 1 for non-positive energy.
    pub fn event_scale(&self, event_type: &str, energy: f64) -> f32 {
        if !(energy > 0.0) || !energy.is_finite() {
            return 1.0;
        }
        let size = energy.ln().abs() * self.type_multiplier(event_type);
        size.min(self.size_cap) as f32
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub arm_min: f32,
    pub arm_max: f32,
    pub initial_arm: f32,
    pub sensitivity_x: f32,
    pub sensitivity_y: f32,
    pub sensitivity_arm: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 60.0,
            near: 1.0,
            far: 1_000_000.0,
            arm_min: 5.0,
            arm_max: 10_000.0,
            initial_arm: 20.0,
            sensitivity_x: 360.0,
            sensitivity_y: 480.0,
            sensitivity_arm: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub markers: MarkerConfig,
    pub camera: CameraConfig,
    /// Ray-pick the object under the cursor every frame.
    pub hover_enabled: bool,
    pub frame_interval_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            markers: MarkerConfig::default(),
            camera: CameraConfig::default(),
            hover_enabled: false,
            frame_interval_ms: 20,
        }
    }
}

pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    let json = std::fs::read_to_string(path)?;
    let mut config: ViewerConfig = serde_json::from_str(&json)?;
    config.markers = config.markers.normalized();
    Ok(config)
}

pub fn save_config(config: &ViewerConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let json = std::fs::read_to_string(path)?;
    let dataset: Dataset = serde_json::from_str(&json)?;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("seisview_{}_{}_{}.json", tag, std::process::id(), nonce));
        path
    }

    #[test]
    fn bucket_selection_uses_descending_thresholds() {
        let markers = MarkerConfig::default();
        assert_eq!(markers.bucket_for(5e11).color, [1.0, 0.0, 0.0]);
        assert_eq!(markers.bucket_for(5e9).threshold, 1e9);
        assert_eq!(markers.bucket_for(5e9).color, [1.0, 0.5, 0.0]);
        assert_eq!(markers.bucket_for(1e9).threshold, 1e8);
        assert_eq!(markers.bucket_for(2e3).color, [0.0, 0.0, 1.0]);
        assert_eq!(markers.bucket_for(10.0).color, [0.5, 0.5, 0.5]);
        assert_eq!(markers.bucket_for(0.0).threshold, 0.0);
        assert_eq!(markers.bucket_for(-4.0).threshold, 0.0);
    }

    #[test]
    fn empty_bucket_table_falls_back_to_gray() {
        let markers = MarkerConfig {
            energy_buckets: Vec::new(),
            ..MarkerConfig::default()
        };
        assert_eq!(markers.bucket_for(1e12).color, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn type_multipliers_have_a_default() {
        let markers = MarkerConfig::default();
        assert_eq!(markers.type_multiplier("explosion"), 3.0);
        assert_eq!(markers.type_multiplier("earthquake"), 1.5);
        assert_eq!(markers.type_multiplier("microseismic"), 0.8);
        assert_eq!(markers.type_multiplier("unknown"), 0.5);
        assert_eq!(markers.type_multiplier("rockburst"), 1.5);
    }

    #[test]
    fn event_scale_is_monotonic_above_one_and_capped() {
        let markers = MarkerConfig::default();
        for event_type in ["explosion", "earthquake", "microseismic", "other"] {
            let mut previous = 0.0f32;
            let mut energy = 1.5f64;
            while energy < 1e300 {
                let s = markers.event_scale(event_type, energy);
                assert!(s >= previous, "{} at {}", event_type, energy);
                assert!(s <= 100.0);
                previous = s;
                energy *= 7.3;
            }
        }
    }

    #[test]
    fn event_scale_floors_non_positive_energy() {
        let markers = MarkerConfig::default();
        assert_eq!(markers.event_scale("earthquake", 0.0), 1.0);
        assert_eq!(markers.event_scale("earthquake", -10.0), 1.0);
        assert_eq!(markers.event_scale("earthquake", f64::NAN), 1.0);
        // Energies below one keep the literal |ln| behaviour.
        let tiny = markers.event_scale("earthquake", 1e-3);
        assert!((tiny - (1e-3f64.ln().abs() * 1.5) as f32).abs() < 1e-4);
    }

    #[test]
    fn normalized_sorts_buckets() {
        let markers = MarkerConfig {
            energy_buckets: vec![
                EnergyBucket { threshold: 0.0, color: [0.0; 3], opacity: 1.0 },
                EnergyBucket { threshold: 1e9, color: [1.0; 3], opacity: 1.0 },
            ],
            ..MarkerConfig::default()
        }
        .normalized();
        assert_eq!(markers.energy_buckets[0].threshold, 1e9);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"hover_enabled": true, "camera": {"fov_deg": 45.0}}"#).unwrap();
        assert!(config.hover_enabled);
        assert_eq!(config.camera.fov_deg, 45.0);
        assert_eq!(config.camera.arm_max, 10_000.0);
        assert_eq!(config.markers.energy_buckets.len(), 6);
        assert_eq!(config.frame_interval_ms, 20);
    }

    #[test]
    fn config_survives_save_and_load() {
        let mut config = ViewerConfig::default();
        config.hover_enabled = true;
        config.markers.size_cap = 42.0;
        let path = temp_path("config");
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_path("missing");
        match load_dataset(&path) {
            Err(ConfigError::Io(_)) => {}
            other => panic!("Expected Io error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let path = temp_path("broken");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Json(_))));
        let _ = std::fs::remove_file(path);
    }
}
