//! Domain logic and core data structures
//!
//! This module contains pure logic that is independent of any windowing
//! system: positions and geometry, rotation math and gesture vocabulary.

pub mod core;
pub mod geometry;
pub mod gesture;
