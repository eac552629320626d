//! wmx: watermark overlay engine for video surfaces.
//!
//! The engine discovers video elements on a dynamic page, attaches a
//! positioned overlay to each, and drives one of three placement
//! behaviors (static anchor, periodic random relocation, velocity-driven
//! bounce) with pause/resume tied to tab visibility and playback state.
//! The page itself is reached only through the [`host::Host`] capability
//! trait; [`sim::SimHost`] is a deterministic stand-in for tests and
//! offline runs.

pub mod content;
pub mod controller;
pub mod filter;
pub mod geometry;
pub mod host;
pub mod placement;
pub mod registry;
pub mod settings;
pub mod sim;
pub mod store;

pub use controller::{Controller, ControllerSnapshot};
pub use geometry::{clamp_or, Rect, Size, Vec2};
pub use host::{Host, OverlayId, Playback, VideoEvent};
pub use registry::{Engine, EngineOptions, LOCATION_POLL_MS};
pub use settings::{Anchor, ContentMode, PlacementMode, Settings, SettingsPatch};
pub use store::{load_settings, persist_settings, MemoryStore, SettingsStore};
