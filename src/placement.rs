//! Placement engine: the three mark-positioning behaviors and the state
//! they carry. The math here is pure and unit-tested; the controller owns
//! scheduling and feeds elapsed time in.

use rand::Rng;

use crate::geometry::{clamp_or, Size, Vec2};
use crate::host::{FrameId, TimerId};
use crate::settings::{Anchor, Offset};

/// Hard floor for the random-pop interval, applied at use regardless of
/// what the store holds.
pub const MIN_RANDOM_INTERVAL_MS: f64 = 300.0;
/// Hard floor for bounce speed in pixels per second.
pub const MIN_BOUNCE_SPEED: f64 = 10.0;

const FALLBACK_INTERVAL_MS: f64 = 1200.0;
const FALLBACK_BOUNCE_SPEED: f64 = 80.0;

/// Active placement behavior for one controller. At most one timer or
/// frame handle lives here at any time; switching variants goes through
/// the controller, which cancels the old handle first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementState {
    /// No behavior active: watermark disabled or controller torn down.
    Stopped,
    Static,
    RandomPop {
        timer: Option<TimerId>,
    },
    Bounce {
        velocity: Vec2,
        frame: Option<FrameId>,
        last_tick_ms: f64,
    },
}

impl PlacementState {
    pub fn owns_timer(&self, id: TimerId) -> bool {
        matches!(self, Self::RandomPop { timer: Some(t) } if *t == id)
    }

    pub fn owns_frame(&self, id: FrameId) -> bool {
        matches!(self, Self::Bounce { frame: Some(f), .. } if *f == id)
    }

    /// Whether a timer or frame loop is currently scheduled.
    pub fn is_animating(&self) -> bool {
        match self {
            Self::Stopped | Self::Static => false,
            Self::RandomPop { timer } => timer.is_some(),
            Self::Bounce { frame, .. } => frame.is_some(),
        }
    }
}

/// Largest valid mark position for the given bounds: the mark may never
/// render outside the overlay box, floored at zero when it doesn't fit.
pub fn max_extent(bounds: Size, mark: Size) -> Size {
    Size::new(
        (bounds.width - mark.width).max(0.0),
        (bounds.height - mark.height).max(0.0),
    )
}

pub fn clamp_position(position: Vec2, bounds: Size, mark: Size) -> Vec2 {
    let max = max_extent(bounds, mark);
    Vec2::new(
        clamp_or(position.x, 0.0, max.width, 0.0),
        clamp_or(position.y, 0.0, max.height, 0.0),
    )
}

/// Static placement: anchor plus offset against the current bounds,
/// clamped into the valid extent.
pub fn anchored_position(anchor: Anchor, offset: Offset, bounds: Size, mark: Size) -> Vec2 {
    let raw = match anchor {
        Anchor::TopLeft => Vec2::new(offset.x, offset.y),
        Anchor::TopRight => Vec2::new(bounds.width - mark.width - offset.x, offset.y),
        Anchor::BottomLeft => Vec2::new(offset.x, bounds.height - mark.height - offset.y),
        Anchor::BottomRight => Vec2::new(
            bounds.width - mark.width - offset.x,
            bounds.height - mark.height - offset.y,
        ),
        Anchor::Center => Vec2::new(
            (bounds.width - mark.width) / 2.0,
            (bounds.height - mark.height) / 2.0,
        ),
    };
    clamp_position(raw, bounds, mark)
}

/// Uniform random position within the valid extent.
pub fn random_position<R: Rng>(rng: &mut R, bounds: Size, mark: Size) -> Vec2 {
    let max = max_extent(bounds, mark);
    let x = if max.width > 0.0 {
        rng.random_range(0.0..=max.width)
    } else {
        0.0
    };
    let y = if max.height > 0.0 {
        rng.random_range(0.0..=max.height)
    } else {
        0.0
    };
    Vec2::new(x, y)
}

/// Initial bounce velocity: a uniformly random angle scaled to the
/// configured speed (floored at `MIN_BOUNCE_SPEED`).
pub fn random_velocity<R: Rng>(rng: &mut R, speed: f64) -> Vec2 {
    let speed = effective_speed(speed);
    let angle = rng.random_range(0.0..std::f64::consts::TAU);
    Vec2::new(angle.cos() * speed, angle.sin() * speed)
}

pub fn effective_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.max(MIN_BOUNCE_SPEED)
    } else {
        FALLBACK_BOUNCE_SPEED
    }
}

pub fn effective_interval_ms(interval_ms: f64) -> f64 {
    if interval_ms.is_finite() {
        interval_ms.max(MIN_RANDOM_INTERVAL_MS)
    } else {
        FALLBACK_INTERVAL_MS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceStep {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Advance one frame: project the position, reflect each axis whose
/// projection leaves the extent, clamp the realized position. Reflection
/// is boundary-inclusive (`<= 0` / `>= max`): an exact-edge projection
/// still flips the velocity.
pub fn bounce_step(
    position: Vec2,
    velocity: Vec2,
    elapsed_secs: f64,
    bounds: Size,
    mark: Size,
) -> BounceStep {
    let max = max_extent(bounds, mark);
    let next = Vec2::new(
        position.x + velocity.x * elapsed_secs,
        position.y + velocity.y * elapsed_secs,
    );

    let mut velocity = velocity;
    if next.x <= 0.0 || next.x >= max.width {
        velocity.x = -velocity.x;
    }
    if next.y <= 0.0 || next.y >= max.height {
        velocity.y = -velocity.y;
    }

    BounceStep {
        position: clamp_position(next, bounds, mark),
        velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        anchored_position, bounce_step, clamp_position, effective_interval_ms, effective_speed,
        max_extent, random_position, random_velocity,
    };
    use crate::geometry::{Size, Vec2};
    use crate::settings::{Anchor, Offset};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const BOUNDS: Size = Size {
        width: 500.0,
        height: 300.0,
    };
    const MARK: Size = Size {
        width: 100.0,
        height: 40.0,
    };
    const OFFSET: Offset = Offset { x: 8.0, y: 8.0 };

    #[test]
    fn anchors_resolve_to_their_corners() {
        assert_eq!(
            anchored_position(Anchor::TopLeft, OFFSET, BOUNDS, MARK),
            Vec2::new(8.0, 8.0)
        );
        assert_eq!(
            anchored_position(Anchor::TopRight, OFFSET, BOUNDS, MARK),
            Vec2::new(392.0, 8.0)
        );
        assert_eq!(
            anchored_position(Anchor::BottomLeft, OFFSET, BOUNDS, MARK),
            Vec2::new(8.0, 252.0)
        );
        assert_eq!(
            anchored_position(Anchor::BottomRight, OFFSET, BOUNDS, MARK),
            Vec2::new(392.0, 252.0)
        );
        assert_eq!(
            anchored_position(Anchor::Center, OFFSET, BOUNDS, MARK),
            Vec2::new(200.0, 130.0)
        );
    }

    #[test]
    fn static_placement_is_idempotent() {
        let first = anchored_position(Anchor::BottomRight, OFFSET, BOUNDS, MARK);
        let second = anchored_position(Anchor::BottomRight, OFFSET, BOUNDS, MARK);
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_mark_pins_to_origin() {
        let huge = Size::new(900.0, 700.0);
        assert_eq!(max_extent(BOUNDS, huge), Size::new(0.0, 0.0));
        assert_eq!(
            anchored_position(Anchor::Center, OFFSET, BOUNDS, huge),
            Vec2::ZERO
        );
        assert_eq!(
            clamp_position(Vec2::new(50.0, 50.0), BOUNDS, huge),
            Vec2::ZERO
        );
    }

    #[test]
    fn random_positions_stay_in_extent() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let position = random_position(&mut rng, BOUNDS, MARK);
            assert!(position.x >= 0.0 && position.x <= 400.0, "x={}", position.x);
            assert!(position.y >= 0.0 && position.y <= 260.0, "y={}", position.y);
        }
    }

    #[test]
    fn random_velocity_has_configured_magnitude() {
        let mut rng = SmallRng::seed_from_u64(11);
        let velocity = random_velocity(&mut rng, 80.0);
        let magnitude = (velocity.x * velocity.x + velocity.y * velocity.y).sqrt();
        assert!((magnitude - 80.0).abs() < 1e-9);

        let floored = random_velocity(&mut rng, 3.0);
        let magnitude = (floored.x * floored.x + floored.y * floored.y).sqrt();
        assert!((magnitude - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bounce_reflects_off_the_right_edge() {
        // 100 px/s rightward from the origin: unclamped x after six
        // seconds is 600, past max_x = 400, so the horizontal velocity
        // must flip at least once and x must stay in [0, 400].
        let mut position = Vec2::ZERO;
        let mut velocity = Vec2::new(100.0, 0.0);
        let mut sign_flips = 0;
        let dt = 1.0 / 60.0;
        for _ in 0..360 {
            let step = bounce_step(position, velocity, dt, BOUNDS, MARK);
            if step.velocity.x.signum() != velocity.x.signum() {
                sign_flips += 1;
            }
            position = step.position;
            velocity = step.velocity;
            assert!(position.x >= 0.0 && position.x <= 400.0, "x={}", position.x);
        }
        assert!(sign_flips >= 1);
    }

    #[test]
    fn bounce_reflects_both_axes_independently() {
        let step = bounce_step(
            Vec2::new(399.0, 1.0),
            Vec2::new(100.0, -100.0),
            0.1,
            BOUNDS,
            MARK,
        );
        assert!(step.velocity.x < 0.0);
        assert!(step.velocity.y > 0.0);
        assert_eq!(step.position, Vec2::new(400.0, 0.0));
    }

    #[test]
    fn bounce_reflection_is_boundary_inclusive() {
        // A projection landing exactly on the edge still flips.
        let step = bounce_step(
            Vec2::new(390.0, 100.0),
            Vec2::new(100.0, 0.0),
            0.1,
            BOUNDS,
            MARK,
        );
        assert_eq!(step.position.x, 400.0);
        assert!(step.velocity.x < 0.0);
    }

    #[test]
    fn floors_apply_at_use() {
        assert_eq!(effective_interval_ms(50.0), 300.0);
        assert_eq!(effective_interval_ms(1200.0), 1200.0);
        assert_eq!(effective_interval_ms(f64::NAN), 1200.0);
        assert_eq!(effective_speed(2.0), 10.0);
        assert_eq!(effective_speed(f64::NAN), 80.0);
    }
}
