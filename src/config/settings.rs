//! Persisted user settings and the store that serves them
//!
//! Settings persist as flat key/value pairs (order-insensitive) or as a
//! JSON snapshot. Malformed values never fail a load; the affected field
//! falls back to its default and a warning is logged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::core::{Position, Rotation, ScreenGeometry};
use crate::domain::gesture::TapBehavior;

pub const KEY_ENABLED: &str = "overlay_enabled";
pub const KEY_COLOR: &str = "overlay_color";
pub const KEY_ALPHA: &str = "overlay_alpha";
pub const KEY_POSITION_X: &str = "position_x";
pub const KEY_POSITION_Y: &str = "position_y";
pub const KEY_POSITION_X_PERCENT: &str = "position_x_percent";
pub const KEY_POSITION_Y_PERCENT: &str = "position_y_percent";
pub const KEY_SCREEN_WIDTH: &str = "screen_width";
pub const KEY_SCREEN_HEIGHT: &str = "screen_height";
pub const KEY_ROTATION: &str = "rotation";
pub const KEY_RECENTS_TIMEOUT: &str = "recents_timeout";
pub const KEY_KEYBOARD_AVOIDANCE: &str = "keyboard_avoidance";
pub const KEY_TAP_BEHAVIOR: &str = "tap_behavior";
pub const KEY_SHOW_TOOLTIP: &str = "show_tooltip";
pub const KEY_HAPTIC_FEEDBACK: &str = "haptic_feedback";
pub const KEY_LOCK_POSITION: &str = "lock_position";
pub const KEY_THEME_MODE: &str = "theme_mode";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("Settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anchor position as saved, with the geometry it was saved against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedAnchor {
    pub x: i32,
    pub y: i32,
    pub x_percent: f32,
    pub y_percent: f32,
    pub screen_width: i32,
    pub screen_height: i32,
    pub rotation: i32,
}

impl SavedAnchor {
    /// Captures an anchor in absolute pixels and screen fractions
    pub fn capture(position: Position, geometry: &ScreenGeometry) -> Self {
        let (x_percent, y_percent) = geometry.to_fraction(position).unwrap_or((0.0, 0.0));
        Self {
            x: position.x,
            y: position.y,
            x_percent,
            y_percent,
            screen_width: geometry.width,
            screen_height: geometry.height,
            rotation: geometry.rotation.quadrant(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn geometry(&self) -> ScreenGeometry {
        ScreenGeometry::new(
            self.screen_width,
            self.screen_height,
            Rotation::from_quadrant(self.rotation),
        )
    }
}

/// Everything the user can configure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub enabled: bool,
    /// ARGB color of the dot
    pub color: u32,
    pub alpha: u8,
    /// None until the user has placed the dot once
    pub anchor: Option<SavedAnchor>,
    pub recents_timeout_ms: u64,
    pub keyboard_avoidance: bool,
    pub tap_behavior: TapBehavior,
    pub show_tooltip: bool,
    pub haptic_feedback: bool,
    pub lock_position: bool,
    pub theme_mode: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: 0xFF21_96F3,
            alpha: 255,
            anchor: None,
            recents_timeout_ms: 100,
            keyboard_avoidance: true,
            tap_behavior: TapBehavior::SafeHome,
            show_tooltip: true,
            haptic_feedback: true,
            lock_position: false,
            theme_mode: "SYSTEM".to_string(),
        }
    }
}

impl OverlaySettings {
    /// Flattens the settings into persisted key/value pairs
    pub fn to_key_values(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            map.insert(key.to_string(), value);
        };

        put(KEY_ENABLED, self.enabled.to_string());
        put(KEY_COLOR, self.color.to_string());
        put(KEY_ALPHA, self.alpha.to_string());
        put(KEY_RECENTS_TIMEOUT, self.recents_timeout_ms.to_string());
        put(KEY_KEYBOARD_AVOIDANCE, self.keyboard_avoidance.to_string());
        put(KEY_TAP_BEHAVIOR, self.tap_behavior.to_string());
        put(KEY_SHOW_TOOLTIP, self.show_tooltip.to_string());
        put(KEY_HAPTIC_FEEDBACK, self.haptic_feedback.to_string());
        put(KEY_LOCK_POSITION, self.lock_position.to_string());
        put(KEY_THEME_MODE, self.theme_mode.clone());

        if let Some(anchor) = &self.anchor {
            put(KEY_POSITION_X, anchor.x.to_string());
            put(KEY_POSITION_Y, anchor.y.to_string());
            put(KEY_POSITION_X_PERCENT, anchor.x_percent.to_string());
            put(KEY_POSITION_Y_PERCENT, anchor.y_percent.to_string());
            put(KEY_SCREEN_WIDTH, anchor.screen_width.to_string());
            put(KEY_SCREEN_HEIGHT, anchor.screen_height.to_string());
            put(KEY_ROTATION, anchor.rotation.to_string());
        }

        map
    }

    /// Rebuilds settings from persisted key/value pairs
    ///
    /// Unknown keys are ignored. A malformed value keeps the default for
    /// that field. The anchor is only restored when both pixel coordinates
    /// are present and valid.
    pub fn from_key_values(map: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();

        let anchor = match (
            lenient::<i32>(KEY_POSITION_X, get(map, KEY_POSITION_X)),
            lenient::<i32>(KEY_POSITION_Y, get(map, KEY_POSITION_Y)),
        ) {
            (Some(x), Some(y)) => Some(SavedAnchor {
                x,
                y,
                x_percent: lenient(KEY_POSITION_X_PERCENT, get(map, KEY_POSITION_X_PERCENT)).unwrap_or(0.0),
                y_percent: lenient(KEY_POSITION_Y_PERCENT, get(map, KEY_POSITION_Y_PERCENT)).unwrap_or(0.0),
                screen_width: lenient(KEY_SCREEN_WIDTH, get(map, KEY_SCREEN_WIDTH)).unwrap_or(0),
                screen_height: lenient(KEY_SCREEN_HEIGHT, get(map, KEY_SCREEN_HEIGHT)).unwrap_or(0),
                rotation: lenient(KEY_ROTATION, get(map, KEY_ROTATION)).unwrap_or(0),
            }),
            _ => None,
        };

        Self {
            enabled: lenient(KEY_ENABLED, get(map, KEY_ENABLED)).unwrap_or(defaults.enabled),
            color: lenient(KEY_COLOR, get(map, KEY_COLOR)).unwrap_or(defaults.color),
            alpha: lenient(KEY_ALPHA, get(map, KEY_ALPHA)).unwrap_or(defaults.alpha),
            anchor,
            recents_timeout_ms: lenient(KEY_RECENTS_TIMEOUT, get(map, KEY_RECENTS_TIMEOUT))
                .unwrap_or(defaults.recents_timeout_ms),
            keyboard_avoidance: lenient(KEY_KEYBOARD_AVOIDANCE, get(map, KEY_KEYBOARD_AVOIDANCE))
                .unwrap_or(defaults.keyboard_avoidance),
            tap_behavior: lenient(KEY_TAP_BEHAVIOR, get(map, KEY_TAP_BEHAVIOR)).unwrap_or(defaults.tap_behavior),
            show_tooltip: lenient(KEY_SHOW_TOOLTIP, get(map, KEY_SHOW_TOOLTIP)).unwrap_or(defaults.show_tooltip),
            haptic_feedback: lenient(KEY_HAPTIC_FEEDBACK, get(map, KEY_HAPTIC_FEEDBACK))
                .unwrap_or(defaults.haptic_feedback),
            lock_position: lenient(KEY_LOCK_POSITION, get(map, KEY_LOCK_POSITION)).unwrap_or(defaults.lock_position),
            theme_mode: get(map, KEY_THEME_MODE)
                .map(str::to_string)
                .unwrap_or(defaults.theme_mode),
        }
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, SettingsError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Parses one persisted value
pub fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn get<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    map.get(key).map(String::as_str)
}

fn lenient<T: FromStr>(key: &str, value: Option<&str>) -> Option<T> {
    let value = value?;
    match parse_value(key, value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("settings: {}, using default", e);
            None
        }
    }
}

/// Source of truth for [`OverlaySettings`]
///
/// Subscribers get the current value immediately on subscribe, then one
/// push per change.
pub trait SettingsStore {
    fn settings(&self) -> OverlaySettings;

    /// Applies `change`; subscribers are notified if anything changed
    fn update(&mut self, change: &mut dyn FnMut(&mut OverlaySettings));

    fn subscribe(&mut self) -> Receiver<OverlaySettings>;

    fn anchor(&self) -> Option<SavedAnchor> {
        self.settings().anchor
    }

    fn set_anchor(&mut self, anchor: SavedAnchor) {
        self.update(&mut |s| s.anchor = Some(anchor));
    }

    fn tap_behavior(&self) -> TapBehavior {
        self.settings().tap_behavior
    }

    fn keyboard_avoidance_enabled(&self) -> bool {
        self.settings().keyboard_avoidance
    }

    fn position_locked(&self) -> bool {
        self.settings().lock_position
    }
}

/// Settings held in memory, optionally seeded from persisted pairs
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: OverlaySettings,
    subscribers: Vec<Sender<OverlaySettings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            settings,
            subscribers: Vec::new(),
        }
    }

    pub fn from_key_values(map: &BTreeMap<String, String>) -> Self {
        Self::new(OverlaySettings::from_key_values(map))
    }

    fn notify(&mut self) {
        let snapshot = &self.settings;
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> OverlaySettings {
        self.settings.clone()
    }

    fn update(&mut self, change: &mut dyn FnMut(&mut OverlaySettings)) {
        let before = self.settings.clone();
        change(&mut self.settings);
        if self.settings != before {
            debug!("settings: changed, notifying {} subscriber(s)", self.subscribers.len());
            self.notify();
        }
    }

    fn subscribe(&mut self) -> Receiver<OverlaySettings> {
        let (tx, rx) = mpsc::channel();
        if tx.send(self.settings.clone()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }
}
