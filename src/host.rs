//! Capability surface the engine needs from the embedding page. The
//! engine never owns DOM nodes or real timers; it asks the host for them
//! and gets opaque handles back. Events travel the other way: the host
//! (or a test driver) feeds them into `Engine` as they occur.

use std::fmt::Debug;
use std::hash::Hash;

use crate::content::MarkContent;
use crate::geometry::{Rect, Size, Vec2};

/// Overlay layer handle. One per tracked video, owned by its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// Repeating timer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// One-shot frame callback handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
    Ended,
}

/// Per-video signals the registry forwards to the owning controller:
/// media events plus the element-level size observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    LoadedMetadata,
    LoadedData,
    Emptied,
    /// The element's own box changed (responsive player, PiP-style
    /// layout), independent of any window-level geometry event.
    Resize,
    Play,
    Playing,
    Pause,
    Ended,
}

pub trait Host {
    /// Stable identity of a video element for the registry map.
    type VideoId: Copy + Eq + Hash + Debug;

    // -- page and document state --

    /// All video elements currently in the document, attached or not yet
    /// laid out. Order is not significant.
    fn videos(&self) -> Vec<Self::VideoId>;
    fn is_attached(&self, video: Self::VideoId) -> bool;
    fn location(&self) -> String;
    fn is_visible(&self) -> bool;
    fn playback(&self, video: Self::VideoId) -> Playback;

    // -- geometry --

    /// Bounding box in viewport coordinates.
    fn video_box(&self, video: Self::VideoId) -> Rect;
    fn scroll_offset(&self) -> Vec2;
    /// Rendered size of the mark node (text plus image, current styles).
    fn mark_size(&self, overlay: OverlayId) -> Size;
    /// Natural pixel size of the mark's image once decoded; `None` while
    /// the load is still in flight or no image is assigned.
    fn image_natural_size(&self, overlay: OverlayId) -> Option<Size>;

    // -- overlay nodes --

    fn create_overlay(&mut self, video: Self::VideoId) -> OverlayId;
    fn remove_overlay(&mut self, overlay: OverlayId);
    /// Begin delivering per-video signals (size observation, media
    /// events) for this element. Released by `unwatch_video`.
    fn watch_video(&mut self, video: Self::VideoId);
    fn unwatch_video(&mut self, video: Self::VideoId);
    /// Move/resize the overlay so its box coincides with the video box,
    /// in document coordinates (viewport box plus scroll offset).
    fn place_overlay(&mut self, overlay: OverlayId, origin: Vec2, size: Size);
    fn set_overlay_hidden(&mut self, overlay: OverlayId, hidden: bool);
    fn set_mark_content(&mut self, overlay: OverlayId, content: &MarkContent);
    fn set_mark_translation(&mut self, overlay: OverlayId, position: Vec2);

    // -- inline display filter on the video element --

    fn video_filter(&self, video: Self::VideoId) -> String;
    /// `None` clears the inline filter entirely.
    fn set_video_filter(&mut self, video: Self::VideoId, filter: Option<String>);

    // -- scheduling --

    /// Monotonic clock in milliseconds.
    fn now(&self) -> f64;
    fn set_interval(&mut self, period_ms: f64) -> TimerId;
    /// Cancellation is synchronous: a cleared timer never fires again.
    fn clear_interval(&mut self, timer: TimerId);
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, frame: FrameId);
}
