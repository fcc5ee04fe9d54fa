//! Configuration for the dot
//!
//! [`OverlayConfig`] holds static tuning (sizes, timeouts, thresholds).
//! [`settings`] holds what the user changes at runtime and what gets
//! persisted between sessions.

pub mod overlay;
pub mod settings;

pub use overlay::OverlayConfig;
pub use settings::{MemorySettingsStore, OverlaySettings, SavedAnchor, SettingsError, SettingsStore};
