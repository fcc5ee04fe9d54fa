pub mod animator;

pub use animator::{AnimationFrame, AnimationSession, PositionAnimator, ease_in_out};
