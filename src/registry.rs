//! Top-level coordinator: discovers video elements, owns the
//! video-to-controller map, and fans global events out to controllers.
//! All map mutation funnels through `scan`, which is what keeps the
//! one-controller-per-live-video invariant.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::controller::{Controller, ControllerSnapshot};
use crate::host::{FrameId, Host, TimerId, VideoEvent};
use crate::settings::{Settings, SettingsPatch};

/// Cadence of the navigation poll. Structural mutations don't cover
/// single-page-app navigations that swap video sources in place, so the
/// location string is compared on a fixed interval; a change forces a
/// full rescan. Deliberate heuristic: responsiveness vs. overhead.
pub const LOCATION_POLL_MS: f64 = 800.0;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Base RNG seed; per-controller seeds derive from it. `None` draws
    /// one from OS entropy.
    pub seed: Option<u64>,
}

pub struct Engine<H: Host> {
    host: H,
    settings: Settings,
    controllers: HashMap<H::VideoId, Controller<H::VideoId>>,
    nav_timer: Option<TimerId>,
    last_location: String,
    seed: u64,
    spawned: u64,
    started: bool,
}

impl<H: Host> Engine<H> {
    pub fn new(host: H, settings: Settings, options: EngineOptions) -> Self {
        let seed = options.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            host,
            settings,
            controllers: HashMap::new(),
            nav_timer: None,
            last_location: String::new(),
            seed,
            spawned: 0,
            started: false,
        }
    }

    /// Initial scan plus the navigation poll. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.last_location = self.host.location();
        self.scan(false);
        self.nav_timer = Some(self.host.set_interval(LOCATION_POLL_MS));
    }

    /// Tear down every controller and stop polling. The host outlives the
    /// engine; only what the engine acquired is released.
    pub fn stop(&mut self) {
        if let Some(timer) = self.nav_timer.take() {
            self.host.clear_interval(timer);
        }
        let Self {
            host, controllers, ..
        } = self;
        for controller in controllers.values_mut() {
            controller.destroy(host);
        }
        controllers.clear();
        self.started = false;
    }

    /// Find-and-reconcile: create a controller for every new video,
    /// refresh existing ones when forced (suspected navigation), then
    /// reclaim controllers whose element left the document. A document
    /// with no videos is not an error.
    pub fn scan(&mut self, force: bool) {
        for video in self.host.videos() {
            if !self.controllers.contains_key(&video) {
                let seed = self.next_seed();
                let controller =
                    Controller::new(&mut self.host, video, self.settings.clone(), seed);
                self.controllers.insert(video, controller);
            } else if force {
                let Self {
                    host,
                    controllers,
                    settings,
                    ..
                } = self;
                if let Some(controller) = controllers.get_mut(&video) {
                    controller.update_bounds(host);
                    controller.update_settings(host, settings.clone());
                }
            }
        }

        let Self {
            host, controllers, ..
        } = self;
        let detached: Vec<H::VideoId> = controllers
            .keys()
            .copied()
            .filter(|video| !host.is_attached(*video))
            .collect();
        for video in detached {
            if let Some(controller) = controllers.get_mut(&video) {
                controller.destroy(host);
            }
            controllers.remove(&video);
        }

        if self.settings.debug {
            debug!(controllers = self.controllers.len(), force, "scan complete");
        }
    }

    /// Structural mutation batch observed on the document subtree.
    pub fn on_mutation(&mut self) {
        self.scan(false);
    }

    /// Timer fired: either the navigation poll or a controller's
    /// random-pop interval.
    pub fn on_timer(&mut self, id: TimerId) {
        if self.nav_timer == Some(id) {
            let location = self.host.location();
            if location != self.last_location {
                if self.settings.debug {
                    debug!(%location, "location changed, rescanning");
                }
                self.last_location = location;
                self.scan(true);
            }
            return;
        }

        let Self {
            host, controllers, ..
        } = self;
        for controller in controllers.values_mut() {
            if controller.on_timer(host, id) {
                break;
            }
        }
    }

    /// Frame callback fired for some controller's bounce loop.
    pub fn on_frame(&mut self, id: FrameId) {
        let Self {
            host, controllers, ..
        } = self;
        for controller in controllers.values_mut() {
            if controller.on_frame(host, id) {
                break;
            }
        }
    }

    /// Window resize, scroll, or fullscreen toggle.
    pub fn on_viewport_change(&mut self) {
        let Self {
            host, controllers, ..
        } = self;
        for controller in controllers.values_mut() {
            controller.update_bounds(host);
        }
    }

    pub fn on_visibility_change(&mut self) {
        let Self {
            host, controllers, ..
        } = self;
        let visible = host.is_visible();
        for controller in controllers.values_mut() {
            controller.handle_visibility(host, visible);
        }
    }

    /// Per-video media or size signal.
    pub fn on_video_event(&mut self, video: H::VideoId, event: VideoEvent) {
        let Self {
            host, controllers, ..
        } = self;
        if let Some(controller) = controllers.get_mut(&video) {
            controller.on_video_event(host, event);
        }
    }

    /// The mark image for this video finished decoding.
    pub fn on_image_loaded(&mut self, video: H::VideoId) {
        let Self {
            host, controllers, ..
        } = self;
        if let Some(controller) = controllers.get_mut(&video) {
            controller.on_image_loaded(host);
        }
    }

    /// Synced-partition change batch: merge into the live configuration
    /// and push the result to every controller wholesale.
    pub fn on_settings_patch(&mut self, patch: &SettingsPatch) {
        self.settings.apply_patch(patch);
        let Self {
            host,
            controllers,
            settings,
            ..
        } = self;
        for controller in controllers.values_mut() {
            controller.update_settings(host, settings.clone());
        }
    }

    fn next_seed(&mut self) -> u64 {
        let seed = self
            .seed
            .wrapping_add(self.spawned.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.spawned += 1;
        seed
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn snapshot(&self, video: H::VideoId) -> Option<ControllerSnapshot> {
        self.controllers.get(&video).map(Controller::snapshot)
    }
}
