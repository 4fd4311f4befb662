//! Objects grouped by the file they were loaded from.
//!
//! A source remembers the ids it created so it can be hidden, unloaded or
//! restyled as a unit. Ids that have already left the scene are skipped.

use super::{ObjectId, Scene};
use crate::geometry::Rgb;
use crate::records::{
    BucketOverride, DatasetSource, DetectorRecord, EventRecord, PolygonSoup, VisualStyle,
};
use crate::render::backend::RenderBackend;
use std::collections::BTreeMap;

/// Per-source visual settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceProperties {
    pub style: VisualStyle,
    pub overrides: Vec<BucketOverride>,
}

impl SourceProperties {
    pub fn override_for(&self, threshold: f64) -> Option<&BucketOverride> {
        self.overrides
            .iter()
            .find(|entry| entry.threshold == threshold)
    }
}

#[derive(Debug, Clone)]
struct Source {
    ids: Vec<ObjectId>,
    properties: SourceProperties,
    visible: bool,
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn ids(&self, key: &str) -> &[ObjectId] {
        self.sources
            .get(key)
            .map(|source| source.ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn properties(&self, key: &str) -> Option<&SourceProperties> {
        self.sources.get(key).map(|source| &source.properties)
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.sources.get(key).is_some_and(|source| source.visible)
    }

    /// Loads any dataset source under its own name.
    pub fn load<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        source: &DatasetSource,
    ) -> usize {
        match source {
            DatasetSource::Events {
                name,
                style,
                overrides,
                events,
            } => self.load_events(
                scene,
                name,
                events,
                SourceProperties {
                    style: *style,
                    overrides: overrides.clone(),
                },
            ),
            DatasetSource::Detectors { name, detectors } => {
                self.load_detectors(scene, name, detectors)
            }
            DatasetSource::Terrain { name, soup } => self.load_terrain(scene, name, soup),
        }
    }

    /// Adds one marker per event. Returns how many were created; records with
    /// non-finite coordinates are skipped.
    pub fn load_events<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        events: &[EventRecord],
        properties: SourceProperties,
    ) -> usize {
        self.unload(scene, key);
        let mut ids = Vec::with_capacity(events.len());
        for (index, record) in events.iter().enumerate() {
            let location = record.scene_position();
            if !location.is_finite() {
                log::warn!("{}: skipping event {} with invalid coordinates", key, index);
                continue;
            }
            let threshold = scene.factory().config().bucket_for(record.energy).threshold;
            let override_color = properties.override_for(threshold).map(BucketOverride::rgba);
            match scene.spawn_event(
                location,
                &record.event_type,
                record.energy,
                properties.style,
                override_color,
            ) {
                Ok(id) => ids.push(id),
                Err(err) => log::warn!("{}: skipping event {}: {}", key, index, err),
            }
        }
        log::info!("{}: loaded {} of {} events", key, ids.len(), events.len());
        self.insert(key, ids, properties)
    }

    pub fn load_detectors<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        detectors: &[DetectorRecord],
    ) -> usize {
        self.unload(scene, key);
        let mut ids = Vec::with_capacity(detectors.len());
        for record in detectors {
            let location = record.scene_position();
            if !location.is_finite() {
                log::warn!("{}: skipping detector {} with invalid coordinates", key, record.id);
                continue;
            }
            match scene.spawn_detector(record.id, location) {
                Ok(id) => ids.push(id),
                Err(err) => log::warn!("{}: skipping detector {}: {}", key, record.id, err),
            }
        }
        log::info!("{}: loaded {} detectors", key, ids.len());
        self.insert(key, ids, SourceProperties::default())
    }

    pub fn load_terrain<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        soup: &PolygonSoup,
    ) -> usize {
        self.unload(scene, key);
        let ids = match scene.spawn_terrain(soup) {
            Ok(id) => {
                if scene.object(id).is_some_and(|object| object.is_placeholder()) {
                    log::warn!("{}: object contains no 3D geometry", key);
                }
                vec![id]
            }
            Err(err) => {
                log::warn!("{}: failed to build terrain: {}", key, err);
                Vec::new()
            }
        };
        self.insert(key, ids, SourceProperties::default())
    }

    fn insert(&mut self, key: &str, ids: Vec<ObjectId>, properties: SourceProperties) -> usize {
        let count = ids.len();
        self.sources.insert(
            key.to_string(),
            Source {
                ids,
                properties,
                visible: true,
            },
        );
        count
    }

    pub fn set_visible<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        visible: bool,
    ) -> bool {
        let Some(source) = self.sources.get_mut(key) else {
            return false;
        };
        source.visible = visible;
        for &id in &source.ids {
            scene.set_enabled(id, visible);
        }
        true
    }

    /// Removes every object of the source and forgets it.
    pub fn unload<B: RenderBackend>(&mut self, scene: &mut Scene<B>, key: &str) -> bool {
        let Some(source) = self.sources.remove(key) else {
            return false;
        };
        for id in source.ids {
            scene.remove_object(id);
        }
        log::debug!("Unloaded source {}", key);
        true
    }

    /// Sets the opacity of every event of the source in the bucket that
    /// starts at `threshold`. Returns how many objects changed.
    pub fn set_bucket_opacity<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        threshold: f64,
        opacity: f32,
    ) -> usize {
        let opacity = opacity.clamp(0.0, 1.0);
        self.update_bucket(scene, key, threshold, |entry| entry.opacity = opacity)
    }

    pub fn set_bucket_color<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        threshold: f64,
        color: Rgb,
    ) -> usize {
        self.update_bucket(scene, key, threshold, |entry| entry.color = color)
    }

    fn update_bucket<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        threshold: f64,
        apply: impl FnOnce(&mut BucketOverride),
    ) -> usize {
        let Some(source) = self.sources.get_mut(key) else {
            return 0;
        };
        let markers = scene.factory().config();
        let index = match source
            .properties
            .overrides
            .iter()
            .position(|entry| entry.threshold == threshold)
        {
            Some(index) => index,
            None => {
                let Some(bucket) = markers
                    .energy_buckets
                    .iter()
                    .find(|bucket| bucket.threshold == threshold)
                else {
                    log::warn!("{}: no energy bucket starts at {}", key, threshold);
                    return 0;
                };
                source.properties.overrides.push(BucketOverride {
                    threshold,
                    color: bucket.color,
                    opacity: bucket.opacity,
                });
                source.properties.overrides.len() - 1
            }
        };
        apply(&mut source.properties.overrides[index]);
        let entry = source.properties.overrides[index];

        let members: Vec<ObjectId> = source
            .ids
            .iter()
            .copied()
            .filter(|&id| {
                scene
                    .object(id)
                    .and_then(|object| object.event())
                    .is_some_and(|event| markers.bucket_for(event.energy).threshold == threshold)
            })
            .collect();
        members
            .into_iter()
            .filter(|&id| scene.retint(id, entry.color, entry.opacity))
            .count()
    }

    /// Rebuilds every event of the source with `style`.
    pub fn set_style<B: RenderBackend>(
        &mut self,
        scene: &mut Scene<B>,
        key: &str,
        style: VisualStyle,
    ) -> usize {
        let Some(source) = self.sources.get_mut(key) else {
            return 0;
        };
        source.properties.style = style;
        let mut rebuilt = 0;
        for &id in &source.ids {
            let current = scene
                .object(id)
                .and_then(|object| object.event())
                .map(|event| event.style);
            if current.is_none() || current == Some(style) {
                continue;
            }
            match scene.rebuild(id, style) {
                Ok(()) => rebuilt += 1,
                Err(err) => log::warn!("{}: failed to restyle {}: {}", key, id, err),
            }
        }
        rebuilt
    }
}
