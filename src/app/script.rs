//! Headless replay of timed overlay events
//!
//! A script is a JSON document describing the screen, the starting
//! settings and a list of timestamped events. Replaying it drives an
//! [`OverlayController`] exactly as a host event loop would.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::controller::OverlayController;
use crate::config::OverlayConfig;
use crate::config::settings::{MemorySettingsStore, OverlaySettings, SavedAnchor, SettingsStore};
use crate::domain::core::{Position, Rotation, ScreenGeometry};
use crate::domain::geometry::SystemInsets;
use crate::domain::gesture::{Gesture, TapBehavior, TouchAction, TouchEvent};
use crate::platform::{NavigationDispatcher, RenderSink};

/// Time allowed after the last event for timers and animations to settle
pub const SETTLE_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Script is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Event {index} at {at_ms}ms comes before the previous event at {previous_ms}ms")]
    OutOfOrder {
        index: usize,
        at_ms: u64,
        previous_ms: u64,
    },
}

/// Screen size and rotation quadrant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptScreen {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub rotation: i32,
}

impl ScriptScreen {
    pub fn geometry(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.width, self.height, Rotation::from_quadrant(self.rotation))
    }
}

impl Default for ScriptScreen {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            rotation: 0,
        }
    }
}

/// One timestamped input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    Touch {
        action: TouchAction,
        x: f32,
        y: f32,
        at_ms: u64,
    },
    Keyboard {
        visible: bool,
        #[serde(default)]
        height: i32,
        at_ms: u64,
    },
    OrientationBegin {
        at_ms: u64,
    },
    Orientation {
        width: i32,
        height: i32,
        rotation: i32,
        at_ms: u64,
    },
    Insets {
        #[serde(default)]
        nav_bar_px: i32,
        #[serde(default)]
        status_bar_px: i32,
        at_ms: u64,
    },
    /// Lets time pass without input
    Advance {
        at_ms: u64,
    },
    Settings {
        tap_behavior: Option<TapBehavior>,
        lock_position: Option<bool>,
        keyboard_avoidance: Option<bool>,
        haptic_feedback: Option<bool>,
        at_ms: u64,
    },
    Reset {
        at_ms: u64,
    },
}

impl ScriptEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            ScriptEvent::Touch { at_ms, .. }
            | ScriptEvent::Keyboard { at_ms, .. }
            | ScriptEvent::OrientationBegin { at_ms }
            | ScriptEvent::Orientation { at_ms, .. }
            | ScriptEvent::Insets { at_ms, .. }
            | ScriptEvent::Advance { at_ms }
            | ScriptEvent::Settings { at_ms, .. }
            | ScriptEvent::Reset { at_ms } => *at_ms,
        }
    }

    /// Feeds this event into a controller
    ///
    /// # Returns
    /// Gestures recognized while handling the event
    pub fn apply<R, S, D>(&self, controller: &mut OverlayController<R, S, D>) -> Vec<Gesture>
    where
        R: RenderSink,
        S: SettingsStore,
        D: NavigationDispatcher,
    {
        debug!("script: {:?}", self);
        match self {
            ScriptEvent::Touch { action, x, y, at_ms } => controller.on_touch(TouchEvent {
                action: *action,
                x: *x,
                y: *y,
                timestamp_ms: *at_ms,
            }),
            ScriptEvent::Keyboard { visible, height, at_ms } => {
                controller.on_keyboard_changed(*visible, *height, *at_ms);
                Vec::new()
            }
            ScriptEvent::OrientationBegin { at_ms } => {
                controller.begin_orientation_change(*at_ms);
                Vec::new()
            }
            ScriptEvent::Orientation { width, height, rotation, at_ms } => {
                let geometry = ScreenGeometry::new(*width, *height, Rotation::from_quadrant(*rotation));
                controller.on_orientation_changed(geometry, *at_ms);
                Vec::new()
            }
            ScriptEvent::Insets { nav_bar_px, status_bar_px, at_ms } => {
                controller.on_insets_changed(SystemInsets::new(None, *nav_bar_px, *status_bar_px), *at_ms);
                Vec::new()
            }
            ScriptEvent::Advance { at_ms } => controller.advance(*at_ms),
            ScriptEvent::Settings {
                tap_behavior,
                lock_position,
                keyboard_avoidance,
                haptic_feedback,
                at_ms,
            } => {
                controller.update_settings(
                    |s| {
                        if let Some(behavior) = tap_behavior {
                            s.tap_behavior = *behavior;
                        }
                        if let Some(locked) = lock_position {
                            s.lock_position = *locked;
                        }
                        if let Some(enabled) = keyboard_avoidance {
                            s.keyboard_avoidance = *enabled;
                        }
                        if let Some(enabled) = haptic_feedback {
                            s.haptic_feedback = *enabled;
                        }
                    },
                    *at_ms,
                );
                Vec::new()
            }
            ScriptEvent::Reset { at_ms } => {
                controller.reset_position(*at_ms);
                Vec::new()
            }
        }
    }
}

/// A complete replay: starting state plus events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub screen: ScriptScreen,
    /// Pixels per dp; 1.0 when absent
    pub density: Option<f32>,
    pub settings: OverlaySettings,
    pub events: Vec<ScriptEvent>,
}

/// Where things ended up after a replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub anchor: Position,
    pub current: Position,
    pub geometry: ScreenGeometry,
    pub gestures: Vec<Gesture>,
    pub end_ms: u64,
    /// Settings as persisted at the end, anchor included
    pub settings: OverlaySettings,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let script: Script = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks that event times never go backwards
    pub fn validate(&self) -> Result<(), ScriptError> {
        let mut previous_ms = 0;
        for (index, event) in self.events.iter().enumerate() {
            let at_ms = event.at_ms();
            if at_ms < previous_ms {
                return Err(ScriptError::OutOfOrder {
                    index,
                    at_ms,
                    previous_ms,
                });
            }
            previous_ms = at_ms;
        }
        Ok(())
    }

    pub fn config(&self) -> OverlayConfig {
        let config = OverlayConfig::default().with_default_geometry(self.screen.geometry());
        match self.density {
            Some(density) => config.with_density(density),
            None => config,
        }
    }

    /// Replays every event through a fresh controller
    ///
    /// # Arguments
    /// * `render` - Render sink the controller draws through
    /// * `dispatcher` - Receives navigation actions
    pub fn run<R, D>(&self, render: R, dispatcher: D) -> Result<ReplayReport, ScriptError>
    where
        R: RenderSink,
        D: NavigationDispatcher,
    {
        self.validate()?;

        let start_ms = self.events.first().map_or(0, ScriptEvent::at_ms);
        let mut controller = OverlayController::new(
            self.config(),
            self.screen.geometry(),
            SystemInsets::default(),
            render,
            MemorySettingsStore::new(self.settings.clone()),
            dispatcher,
            start_ms,
        );

        let mut gestures = Vec::new();
        for event in &self.events {
            gestures.extend(event.apply(&mut controller));
        }

        let end_ms = self
            .events
            .last()
            .map_or(start_ms, ScriptEvent::at_ms)
            .saturating_add(SETTLE_MS);
        gestures.extend(controller.advance(end_ms));
        info!(
            "script: replayed {} event(s), {} gesture(s)",
            self.events.len(),
            gestures.len()
        );

        let reconciler = controller.reconciler();
        Ok(ReplayReport {
            anchor: reconciler.anchor(),
            current: reconciler.current(),
            geometry: reconciler.geometry(),
            gestures,
            end_ms,
            settings: reconciler.settings().settings(),
        })
    }

    /// Drag, keyboard open and close on a locked dot, rotation, double tap
    pub fn builtin() -> Self {
        let screen = ScriptScreen::default();
        let settings = OverlaySettings {
            enabled: true,
            tap_behavior: TapBehavior::Standard,
            anchor: Some(SavedAnchor::capture(Position::new(900, 1400), &screen.geometry())),
            ..OverlaySettings::default()
        };

        let touch = |action, x, y, at_ms| ScriptEvent::Touch { action, x, y, at_ms };
        let events = vec![
            touch(TouchAction::Down, 920.0, 1420.0, 0),
            touch(TouchAction::Move, 900.0, 1400.0, 40),
            touch(TouchAction::Move, 820.0, 1300.0, 80),
            touch(TouchAction::Up, 820.0, 1300.0, 120),
            ScriptEvent::Settings {
                tap_behavior: None,
                lock_position: Some(true),
                keyboard_avoidance: None,
                haptic_feedback: None,
                at_ms: 200,
            },
            ScriptEvent::Keyboard {
                visible: true,
                height: 700,
                at_ms: 1_000,
            },
            ScriptEvent::Advance { at_ms: 1_500 },
            ScriptEvent::Keyboard {
                visible: false,
                height: 0,
                at_ms: 2_000,
            },
            ScriptEvent::Advance { at_ms: 2_500 },
            ScriptEvent::OrientationBegin { at_ms: 3_000 },
            ScriptEvent::Orientation {
                width: 1920,
                height: 1080,
                rotation: 1,
                at_ms: 3_100,
            },
            touch(TouchAction::Down, 1300.0, 250.0, 4_000),
            touch(TouchAction::Up, 1300.0, 250.0, 4_040),
            touch(TouchAction::Down, 1300.0, 250.0, 4_150),
            touch(TouchAction::Up, 1300.0, 250.0, 4_190),
        ];

        Self {
            screen,
            density: None,
            settings,
            events,
        }
    }
}
