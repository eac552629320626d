//! Deterministic in-memory host. Scripted videos, a virtual clock, and
//! exact event ordering: the pump advances to one due callback at a
//! time and dispatches it before looking at the next, so a cancellation
//! always lands before the handle could fire again, the same guarantee
//! the engine gets from a real page.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::content::MarkContent;
use crate::geometry::{Rect, Size, Vec2};
use crate::host::{FrameId, Host, OverlayId, Playback, TimerId};
use crate::registry::Engine;

/// Simulated frame-callback cadence, close to a 60 Hz display.
pub const FRAME_INTERVAL_MS: f64 = 16.0;
/// Delay between assigning an image source and its natural size
/// becoming known.
pub const IMAGE_LOAD_DELAY_MS: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoKey(pub u64);

/// A due callback the driver must feed back into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fired {
    Timer(TimerId),
    Frame(FrameId),
    ImageLoaded(VideoKey),
}

#[derive(Debug, Clone)]
struct SimVideo {
    rect: Rect,
    attached: bool,
    playback: Playback,
    filter: Option<String>,
}

#[derive(Debug, Clone)]
struct SimOverlay {
    video: VideoKey,
    origin: Vec2,
    size: Size,
    hidden: bool,
    content: MarkContent,
    translation: Vec2,
    renders: u64,
    image_source: Option<String>,
    image_loaded: bool,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    id: TimerId,
    period_ms: f64,
    due: f64,
}

#[derive(Debug, Clone, Copy)]
struct FrameRequest {
    id: FrameId,
    due: f64,
}

#[derive(Debug, Clone)]
struct PendingImage {
    video: VideoKey,
    overlay: u64,
    due: f64,
}

#[derive(Debug, Default)]
pub struct SimHost {
    now_ms: f64,
    location: String,
    visible: bool,
    scroll: Vec2,
    videos: BTreeMap<VideoKey, SimVideo>,
    overlays: BTreeMap<u64, SimOverlay>,
    watched: BTreeSet<VideoKey>,
    intervals: Vec<Interval>,
    frames: Vec<FrameRequest>,
    image_loads: Vec<PendingImage>,
    /// Natural pixel sizes by source URI; unregistered sources never
    /// finish loading.
    image_sizes: HashMap<String, Size>,
    /// When set, `mark_size` reports this instead of the measurement
    /// heuristic. Lets tests pin exact mark dimensions.
    pub mark_size_override: Option<Size>,
    next_video: u64,
    next_overlay: u64,
    next_timer: u64,
    next_frame: u64,
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            visible: true,
            location: "https://example.test/watch".to_owned(),
            ..Self::default()
        }
    }

    // -- scripting --

    pub fn add_video(&mut self, rect: Rect) -> VideoKey {
        self.next_video += 1;
        let key = VideoKey(self.next_video);
        self.videos.insert(
            key,
            SimVideo {
                rect,
                attached: true,
                playback: Playback::Playing,
                filter: None,
            },
        );
        key
    }

    pub fn detach_video(&mut self, video: VideoKey) {
        if let Some(entry) = self.videos.get_mut(&video) {
            entry.attached = false;
        }
    }

    pub fn set_video_rect(&mut self, video: VideoKey, rect: Rect) {
        if let Some(entry) = self.videos.get_mut(&video) {
            entry.rect = rect;
        }
    }

    pub fn set_playback(&mut self, video: VideoKey, playback: Playback) {
        if let Some(entry) = self.videos.get_mut(&video) {
            entry.playback = playback;
        }
    }

    pub fn set_page_filter(&mut self, video: VideoKey, filter: &str) {
        if let Some(entry) = self.videos.get_mut(&video) {
            entry.filter = Some(filter.to_owned());
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_owned();
    }

    pub fn set_scroll(&mut self, scroll: Vec2) {
        self.scroll = scroll;
    }

    pub fn register_image(&mut self, source: &str, natural: Size) {
        self.image_sizes.insert(source.to_owned(), natural);
    }

    // -- inspection --

    pub fn overlay_for_video(&self, video: VideoKey) -> Option<OverlayId> {
        self.overlays
            .iter()
            .find(|(_, overlay)| overlay.video == video)
            .map(|(id, _)| OverlayId(*id))
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn overlay_hidden(&self, overlay: OverlayId) -> bool {
        self.overlays
            .get(&overlay.0)
            .map(|entry| entry.hidden)
            .unwrap_or(true)
    }

    pub fn overlay_frame(&self, overlay: OverlayId) -> Option<(Vec2, Size)> {
        self.overlays
            .get(&overlay.0)
            .map(|entry| (entry.origin, entry.size))
    }

    pub fn mark_translation(&self, overlay: OverlayId) -> Option<Vec2> {
        self.overlays.get(&overlay.0).map(|entry| entry.translation)
    }

    pub fn mark_content(&self, overlay: OverlayId) -> Option<&MarkContent> {
        self.overlays.get(&overlay.0).map(|entry| &entry.content)
    }

    pub fn render_count(&self, overlay: OverlayId) -> u64 {
        self.overlays
            .get(&overlay.0)
            .map(|entry| entry.renders)
            .unwrap_or(0)
    }

    pub fn applied_filter(&self, video: VideoKey) -> Option<String> {
        self.videos.get(&video).and_then(|entry| entry.filter.clone())
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn frame_request_count(&self) -> usize {
        self.frames.len()
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    // -- clock --

    /// Advance to the next due callback within `limit`, fire it, and
    /// stop. Returns `None` (clock at `limit`) once nothing is due.
    pub fn advance_until_next(&mut self, limit: f64) -> Option<Fired> {
        let next_interval = self
            .intervals
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.due.total_cmp(&b.1.due))
            .map(|(index, entry)| (entry.due, index));
        let next_frame = self
            .frames
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.due.total_cmp(&b.1.due))
            .map(|(index, entry)| (entry.due, index));
        let next_image = self
            .image_loads
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.due.total_cmp(&b.1.due))
            .map(|(index, entry)| (entry.due, index));

        let mut best: Option<(f64, u8, usize)> = None;
        for (kind, candidate) in [
            (0_u8, next_interval),
            (1_u8, next_frame),
            (2_u8, next_image),
        ] {
            if let Some((due, index)) = candidate {
                if best.map(|(b, _, _)| due < b).unwrap_or(true) {
                    best = Some((due, kind, index));
                }
            }
        }

        match best {
            Some((due, kind, index)) if due <= limit => {
                self.now_ms = self.now_ms.max(due);
                match kind {
                    0 => {
                        let entry = &mut self.intervals[index];
                        entry.due += entry.period_ms;
                        Some(Fired::Timer(entry.id))
                    }
                    1 => {
                        let entry = self.frames.swap_remove(index);
                        Some(Fired::Frame(entry.id))
                    }
                    _ => {
                        let entry = self.image_loads.swap_remove(index);
                        if let Some(overlay) = self.overlays.get_mut(&entry.overlay) {
                            overlay.image_loaded = true;
                        }
                        Some(Fired::ImageLoaded(entry.video))
                    }
                }
            }
            _ => {
                self.now_ms = self.now_ms.max(limit);
                None
            }
        }
    }

    fn measure_mark(&self, overlay: &SimOverlay) -> Size {
        if let Some(size) = self.mark_size_override {
            return size;
        }
        let text = overlay
            .content
            .text
            .as_ref()
            .map(|spec| {
                Size::new(
                    spec.text.chars().count() as f64 * spec.font_size * 0.6,
                    spec.font_size * 1.2,
                )
            })
            .unwrap_or_default();
        let image = overlay
            .content
            .image
            .as_ref()
            .and_then(|spec| spec.display)
            .unwrap_or_default();

        let gap = if text.width > 0.0 && image.width > 0.0 {
            6.0
        } else {
            0.0
        };
        Size::new(
            text.width + image.width + gap,
            text.height.max(image.height),
        )
    }
}

impl Host for SimHost {
    type VideoId = VideoKey;

    fn videos(&self) -> Vec<VideoKey> {
        self.videos
            .iter()
            .filter(|(_, video)| video.attached)
            .map(|(key, _)| *key)
            .collect()
    }

    fn is_attached(&self, video: VideoKey) -> bool {
        self.videos
            .get(&video)
            .map(|entry| entry.attached)
            .unwrap_or(false)
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn playback(&self, video: VideoKey) -> Playback {
        self.videos
            .get(&video)
            .map(|entry| entry.playback)
            .unwrap_or(Playback::Paused)
    }

    fn video_box(&self, video: VideoKey) -> Rect {
        self.videos
            .get(&video)
            .map(|entry| entry.rect)
            .unwrap_or_default()
    }

    fn scroll_offset(&self) -> Vec2 {
        self.scroll
    }

    fn mark_size(&self, overlay: OverlayId) -> Size {
        self.overlays
            .get(&overlay.0)
            .map(|entry| self.measure_mark(entry))
            .unwrap_or_default()
    }

    fn image_natural_size(&self, overlay: OverlayId) -> Option<Size> {
        let entry = self.overlays.get(&overlay.0)?;
        if !entry.image_loaded {
            return None;
        }
        let source = entry.image_source.as_ref()?;
        self.image_sizes.get(source).copied()
    }

    fn create_overlay(&mut self, video: VideoKey) -> OverlayId {
        self.next_overlay += 1;
        self.overlays.insert(
            self.next_overlay,
            SimOverlay {
                video,
                origin: Vec2::ZERO,
                size: Size::default(),
                hidden: false,
                content: MarkContent::default(),
                translation: Vec2::ZERO,
                renders: 0,
                image_source: None,
                image_loaded: false,
            },
        );
        OverlayId(self.next_overlay)
    }

    fn remove_overlay(&mut self, overlay: OverlayId) {
        self.overlays.remove(&overlay.0);
        self.image_loads.retain(|pending| pending.overlay != overlay.0);
    }

    fn watch_video(&mut self, video: VideoKey) {
        self.watched.insert(video);
    }

    fn unwatch_video(&mut self, video: VideoKey) {
        self.watched.remove(&video);
    }

    fn place_overlay(&mut self, overlay: OverlayId, origin: Vec2, size: Size) {
        if let Some(entry) = self.overlays.get_mut(&overlay.0) {
            entry.origin = origin;
            entry.size = size;
        }
    }

    fn set_overlay_hidden(&mut self, overlay: OverlayId, hidden: bool) {
        if let Some(entry) = self.overlays.get_mut(&overlay.0) {
            entry.hidden = hidden;
        }
    }

    fn set_mark_content(&mut self, overlay: OverlayId, content: &MarkContent) {
        let now = self.now_ms;
        let Some(entry) = self.overlays.get_mut(&overlay.0) else {
            return;
        };

        let new_source = content.image.as_ref().map(|image| image.source.clone());
        if new_source != entry.image_source {
            entry.image_source = new_source.clone();
            entry.image_loaded = false;
            self.image_loads.retain(|pending| pending.overlay != overlay.0);
            if let Some(source) = new_source {
                if self.image_sizes.contains_key(&source) {
                    self.image_loads.push(PendingImage {
                        video: entry.video,
                        overlay: overlay.0,
                        due: now + IMAGE_LOAD_DELAY_MS,
                    });
                }
            }
        }
        entry.content = content.clone();
    }

    fn set_mark_translation(&mut self, overlay: OverlayId, position: Vec2) {
        if let Some(entry) = self.overlays.get_mut(&overlay.0) {
            entry.translation = position;
            entry.renders += 1;
        }
    }

    fn video_filter(&self, video: VideoKey) -> String {
        self.videos
            .get(&video)
            .and_then(|entry| entry.filter.clone())
            .unwrap_or_default()
    }

    fn set_video_filter(&mut self, video: VideoKey, filter: Option<String>) {
        if let Some(entry) = self.videos.get_mut(&video) {
            entry.filter = filter;
        }
    }

    fn now(&self) -> f64 {
        self.now_ms
    }

    fn set_interval(&mut self, period_ms: f64) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.intervals.push(Interval {
            id,
            period_ms: period_ms.max(1.0),
            due: self.now_ms + period_ms.max(1.0),
        });
        id
    }

    fn clear_interval(&mut self, timer: TimerId) {
        self.intervals.retain(|entry| entry.id != timer);
    }

    fn request_frame(&mut self) -> FrameId {
        self.next_frame += 1;
        let id = FrameId(self.next_frame);
        self.frames.push(FrameRequest {
            id,
            due: self.now_ms + FRAME_INTERVAL_MS,
        });
        id
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        self.frames.retain(|entry| entry.id != frame);
    }
}

/// Run the engine forward by `duration_ms` of virtual time, dispatching
/// each due callback in order.
pub fn pump(engine: &mut Engine<SimHost>, duration_ms: f64) {
    let limit = engine.host().now() + duration_ms;
    loop {
        match engine.host_mut().advance_until_next(limit) {
            Some(Fired::Timer(id)) => engine.on_timer(id),
            Some(Fired::Frame(id)) => engine.on_frame(id),
            Some(Fired::ImageLoaded(video)) => engine.on_image_loaded(video),
            None => break,
        }
    }
}
