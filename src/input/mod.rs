pub mod gesture;

pub use gesture::{GestureConfig, GestureRecognizer, TouchPhase};
