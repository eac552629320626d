//! Per-video controller: owns the overlay layer, a configuration
//! snapshot, and the placement state for one tracked video element.
//! Created and destroyed by the registry; everything acquired here
//! (overlay node, watch subscription, timer or frame handle, inline
//! filter override) is released in `destroy`.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::debug;

use crate::content::MarkContent;
use crate::filter::{compose_filter, HdrParams};
use crate::geometry::{Size, Vec2};
use crate::host::{FrameId, Host, OverlayId, Playback, TimerId, VideoEvent};
use crate::placement::{
    anchored_position, bounce_step, clamp_position, effective_interval_ms, random_position,
    random_velocity, PlacementState,
};
use crate::settings::{PlacementMode, Settings};

pub struct Controller<V> {
    video: V,
    overlay: Option<OverlayId>,
    settings: Settings,
    bounds: Size,
    position: Vec2,
    placement: PlacementState,
    rng: SmallRng,
    /// Inline filter the page had set before we touched the element.
    saved_filter: String,
    bounce_launches: u64,
}

/// Read-only view for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSnapshot {
    pub mode: PlacementMode,
    pub position: Vec2,
    pub bounds: Size,
    pub velocity: Option<Vec2>,
    pub animating: bool,
    /// How many times a fresh bounce velocity has been drawn.
    pub bounce_launches: u64,
}

impl<V: Copy> Controller<V> {
    pub fn new<H: Host<VideoId = V>>(host: &mut H, video: V, settings: Settings, seed: u64) -> Self {
        let saved_filter = host.video_filter(video);
        let mut controller = Self {
            video,
            overlay: None,
            settings,
            bounds: Size::default(),
            position: Vec2::ZERO,
            placement: PlacementState::Stopped,
            rng: SmallRng::seed_from_u64(seed),
            saved_filter,
            bounce_launches: 0,
        };
        controller.attach(host);
        controller
    }

    fn attach<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        self.overlay = Some(host.create_overlay(self.video));
        host.watch_video(self.video);
        self.apply_style(host);
        self.apply_filter(host);
        self.update_bounds(host);
        self.apply_mode(host);
        if self.settings.debug {
            debug!(overlay = ?self.overlay, "overlay attached");
        }
    }

    /// Full configuration replace. Content and styles first, then bounds
    /// (clamping needs the new mark size), then mode re-application.
    pub fn update_settings<H: Host<VideoId = V>>(&mut self, host: &mut H, settings: Settings) {
        self.settings = settings;
        self.apply_style(host);
        self.apply_filter(host);
        self.update_bounds(host);
        self.apply_mode(host);
    }

    /// Re-derive the overlay box from the video's current geometry. No-op
    /// while the overlay is gone or the video is detached; stale geometry
    /// must never reach layout.
    pub fn update_bounds<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        let Some(overlay) = self.overlay else {
            return;
        };
        if !host.is_attached(self.video) {
            return;
        }

        let rect = host.video_box(self.video);
        let scroll = host.scroll_offset();
        self.bounds = rect.size();
        host.place_overlay(
            overlay,
            Vec2::new(rect.x + scroll.x, rect.y + scroll.y),
            self.bounds,
        );

        self.constrain_position(host);
        self.render_position(host);
    }

    /// Rebuild the mark's children from the configuration.
    pub fn refresh_content<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        let Some(overlay) = self.overlay else {
            return;
        };
        let natural = host.image_natural_size(overlay);
        let content = MarkContent::from_settings(&self.settings, natural);
        host.set_mark_content(overlay, &content);
    }

    pub fn apply_style<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        self.refresh_content(host);
        if let Some(overlay) = self.overlay {
            host.set_overlay_hidden(overlay, !self.settings.enabled);
        }
    }

    fn apply_filter<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        let params = HdrParams::from_settings(&self.settings);
        match compose_filter(&self.saved_filter, self.settings.hdr_enabled, params) {
            Some(filter) => host.set_video_filter(self.video, Some(filter)),
            None => self.restore_filter(host),
        }
    }

    fn restore_filter<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        let restored = if self.saved_filter.is_empty() {
            None
        } else {
            Some(self.saved_filter.clone())
        };
        host.set_video_filter(self.video, restored);
    }

    /// Enter the placement behavior selected by the configuration. Always
    /// cancels whatever the previous mode had scheduled first.
    pub fn apply_mode<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        self.stop_animations(host);
        let Some(overlay) = self.overlay else {
            return;
        };
        if !self.settings.enabled {
            host.set_overlay_hidden(overlay, true);
            self.placement = PlacementState::Stopped;
            return;
        }
        host.set_overlay_hidden(overlay, false);

        match self.settings.mode {
            PlacementMode::Static => self.apply_static(host),
            PlacementMode::RandomPop => self.apply_random_pop(host),
            PlacementMode::Bounce => self.apply_bounce(host),
        }
    }

    fn apply_static<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        if let Some(overlay) = self.overlay {
            let mark = host.mark_size(overlay);
            self.position = anchored_position(
                self.settings.static_position,
                self.settings.offset,
                self.bounds,
                mark,
            );
            self.render_position(host);
        }
        self.placement = PlacementState::Static;
    }

    fn apply_random_pop<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        // First placement is unconditional so the mark is visible even
        // while animation is gated off.
        self.randomize_position(host);
        let timer = if self.animation_permitted(host) {
            let period = effective_interval_ms(self.settings.random_interval_ms);
            Some(host.set_interval(period))
        } else {
            None
        };
        self.placement = PlacementState::RandomPop { timer };
    }

    fn apply_bounce<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        let Some(overlay) = self.overlay else {
            return;
        };
        let mark = host.mark_size(overlay);
        let start = if self.position.is_zero() {
            random_position(&mut self.rng, self.bounds, mark)
        } else {
            self.position
        };
        self.position = clamp_position(start, self.bounds, mark);

        let velocity = random_velocity(&mut self.rng, self.settings.bounce_speed);
        self.bounce_launches += 1;
        self.render_position(host);

        let frame = if self.animation_permitted(host) {
            Some(host.request_frame())
        } else {
            None
        };
        self.placement = PlacementState::Bounce {
            velocity,
            frame,
            last_tick_ms: host.now(),
        };
    }

    fn randomize_position<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        if let Some(overlay) = self.overlay {
            let mark = host.mark_size(overlay);
            self.position = random_position(&mut self.rng, self.bounds, mark);
            self.render_position(host);
        }
    }

    /// Repeating random-pop tick. Returns false when the timer isn't ours
    /// (already cancelled handles never reach a live controller).
    pub fn on_timer<H: Host<VideoId = V>>(&mut self, host: &mut H, id: TimerId) -> bool {
        if !self.placement.owns_timer(id) {
            return false;
        }
        self.randomize_position(host);
        true
    }

    /// One bounce frame: integrate, reflect, clamp, render, reschedule.
    /// The loop self-terminates when the watermark is disabled between
    /// frames.
    pub fn on_frame<H: Host<VideoId = V>>(&mut self, host: &mut H, id: FrameId) -> bool {
        let (velocity, last_tick_ms) = match self.placement {
            PlacementState::Bounce {
                velocity,
                frame: Some(frame),
                last_tick_ms,
            } if frame == id => (velocity, last_tick_ms),
            _ => return false,
        };
        let Some(overlay) = self.overlay else {
            return true;
        };

        let now = host.now();
        let elapsed_secs = ((now - last_tick_ms) / 1000.0).max(0.0);
        let mark = host.mark_size(overlay);
        let step = bounce_step(self.position, velocity, elapsed_secs, self.bounds, mark);
        self.position = step.position;

        let next = if self.settings.enabled {
            Some(host.request_frame())
        } else {
            None
        };
        self.placement = PlacementState::Bounce {
            velocity: step.velocity,
            frame: next,
            last_tick_ms: now,
        };
        self.render_position(host);
        true
    }

    pub fn on_video_event<H: Host<VideoId = V>>(&mut self, host: &mut H, event: VideoEvent) {
        match event {
            VideoEvent::LoadedMetadata
            | VideoEvent::LoadedData
            | VideoEvent::Emptied
            | VideoEvent::Resize => {
                self.update_bounds(host);
            }
            VideoEvent::Pause | VideoEvent::Ended => self.stop_animations(host),
            VideoEvent::Play | VideoEvent::Playing => self.apply_mode(host),
        }
    }

    /// The mark's natural image size became known; re-lay-out with the
    /// real dimensions.
    pub fn on_image_loaded<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        self.refresh_content(host);
        self.update_bounds(host);
        self.apply_mode(host);
    }

    /// Tab visibility gate. Hidden stops any timer/loop in place
    /// (position preserved); visible re-enters the animated modes, Bounce
    /// with a fresh velocity.
    pub fn handle_visibility<H: Host<VideoId = V>>(&mut self, host: &mut H, visible: bool) {
        if !visible {
            self.stop_animations(host);
            return;
        }
        if !self.settings.enabled {
            return;
        }
        match self.settings.mode {
            PlacementMode::Bounce if !self.placement.is_animating() => self.apply_bounce(host),
            PlacementMode::RandomPop if !self.placement.is_animating() => {
                self.apply_random_pop(host);
            }
            _ => {}
        }
    }

    /// Cancel any outstanding timer or frame, keeping position and
    /// velocity so a resume can pick up where it stopped.
    pub fn stop_animations<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        match &mut self.placement {
            PlacementState::RandomPop { timer } => {
                if let Some(timer) = timer.take() {
                    host.clear_interval(timer);
                }
            }
            PlacementState::Bounce { frame, .. } => {
                if let Some(frame) = frame.take() {
                    host.cancel_frame(frame);
                }
            }
            PlacementState::Stopped | PlacementState::Static => {}
        }
    }

    /// Release everything: animation handles, watch subscription, the
    /// overlay node, and the video's original inline filter.
    pub fn destroy<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        self.stop_animations(host);
        self.placement = PlacementState::Stopped;
        host.unwatch_video(self.video);
        self.restore_filter(host);
        if let Some(overlay) = self.overlay.take() {
            host.remove_overlay(overlay);
        }
        if self.settings.debug {
            debug!("overlay detached");
        }
    }

    fn animation_permitted<H: Host<VideoId = V>>(&self, host: &H) -> bool {
        self.settings.enabled
            && host.is_visible()
            && host.playback(self.video) == Playback::Playing
    }

    fn constrain_position<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        if let Some(overlay) = self.overlay {
            let mark = host.mark_size(overlay);
            self.position = clamp_position(self.position, self.bounds, mark);
        }
    }

    fn render_position<H: Host<VideoId = V>>(&mut self, host: &mut H) {
        if let Some(overlay) = self.overlay {
            host.set_mark_translation(overlay, self.position);
        }
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.placement.owns_timer(id)
    }

    pub fn owns_frame(&self, id: FrameId) -> bool {
        self.placement.owns_frame(id)
    }

    pub fn overlay(&self) -> Option<OverlayId> {
        self.overlay
    }

    pub fn video(&self) -> V {
        self.video
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let velocity = match self.placement {
            PlacementState::Bounce { velocity, .. } => Some(velocity),
            _ => None,
        };
        ControllerSnapshot {
            mode: self.settings.mode,
            position: self.position,
            bounds: self.bounds,
            velocity,
            animating: self.placement.is_animating(),
            bounce_launches: self.bounce_launches,
        }
    }
}
