//! Floating navigation dot engine
//!
//! Recognizes taps, long-presses and drags on a single touch stream and
//! keeps the dot where the user put it while keyboards, rotations and
//! stray moves try to push it around.

pub mod app;
pub mod config;
pub mod domain;
pub mod input;
pub mod platform;
pub mod ui;
