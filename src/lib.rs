//! Scene core of the seisview seismic data viewer.
//!
//! [`scene::Scene`] owns every drawable object, the orbit camera and hover
//! state, and submits frames through a [`render::RenderBackend`]. File
//! adapters hand in plain [`records`]; [`scene::SourceRegistry`] groups the
//! resulting objects per file.

pub mod app;
pub mod config;
pub mod geometry;
pub mod records;
pub mod render;
pub mod scene;
