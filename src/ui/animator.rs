//! Time-based position animation
//!
//! Produces interpolated positions between two points over wall-clock time,
//! so a late frame lands where it should instead of slowing the animation.
//! At most one animation runs at a time; starting another replaces it
//! without reporting completion for the old one.

use log::trace;

use crate::domain::core::Position;

/// Accelerate-decelerate easing: slow start, fast middle, slow end
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    ((t + 1.0) * std::f32::consts::PI).cos() / 2.0 + 0.5
}

/// One running animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSession {
    pub start: Position,
    pub target: Position,
    pub start_time_ms: u64,
    pub duration_ms: u64,
}

impl AnimationSession {
    /// Interpolated position at `now_ms`, and whether the animation is done
    pub fn sample(&self, now_ms: u64) -> (Position, bool) {
        let elapsed = now_ms.saturating_sub(self.start_time_ms);
        if self.duration_ms == 0 || elapsed >= self.duration_ms {
            return (self.target, true);
        }

        let fraction = ease_in_out(elapsed as f32 / self.duration_ms as f32);
        let lerp = |from: i32, to: i32| from + ((to - from) as f32 * fraction).round() as i32;
        (
            Position::new(
                lerp(self.start.x, self.target.x),
                lerp(self.start.y, self.target.y),
            ),
            false,
        )
    }
}

/// Output of an animation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationFrame {
    /// Intermediate position
    Step(Position),
    /// Terminal position; reported exactly once per completed animation
    Finished(Position),
}

/// Drives at most one [`AnimationSession`]
#[derive(Debug, Default)]
pub struct PositionAnimator {
    session: Option<AnimationSession>,
}

impl PositionAnimator {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Starts animating from `from` to `to`, replacing any running animation
    ///
    /// # Returns
    /// `Some(Finished(to))` when there is nothing to animate; the terminal
    /// frame is then delivered right away instead of from [`Self::tick`]
    pub fn animate(
        &mut self,
        from: Position,
        to: Position,
        duration_ms: u64,
        now_ms: u64,
    ) -> Option<AnimationFrame> {
        self.cancel();

        if from == to {
            return Some(AnimationFrame::Finished(to));
        }

        trace!("animator: {:?} -> {:?} over {}ms", from, to, duration_ms);
        self.session = Some(AnimationSession {
            start: from,
            target: to,
            start_time_ms: now_ms,
            duration_ms,
        });
        None
    }

    /// Advances the running animation to `now_ms`
    pub fn tick(&mut self, now_ms: u64) -> Option<AnimationFrame> {
        let session = self.session?;
        let (position, done) = session.sample(now_ms);

        if done {
            self.session = None;
            Some(AnimationFrame::Finished(position))
        } else {
            Some(AnimationFrame::Step(position))
        }
    }

    /// Stops the running animation without a terminal frame
    ///
    /// # Returns
    /// true if an animation was running
    pub fn cancel(&mut self) -> bool {
        self.session.take().is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.session.is_some()
    }

    /// Destination of the running animation
    pub fn target(&self) -> Option<Position> {
        self.session.map(|s| s.target)
    }

    pub fn session(&self) -> Option<&AnimationSession> {
        self.session.as_ref()
    }
}
