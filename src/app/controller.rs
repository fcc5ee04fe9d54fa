//! Application controller and coordination layer
//!
//! The controller is deliberately thin. It feeds touches to the gesture
//! recognizer, routes drag gestures to the reconciler and everything else to
//! the navigation dispatcher according to the configured tap behavior, and
//! keeps both in step with the settings store.

use std::sync::mpsc::Receiver;

use log::{debug, info, trace, warn};

use crate::app::reconciler::PositionReconciler;
use crate::app::state::WatchdogOutcome;
use crate::config::OverlayConfig;
use crate::config::settings::{OverlaySettings, SettingsStore};
use crate::domain::core::{Position, ScreenGeometry};
use crate::domain::geometry::SystemInsets;
use crate::domain::gesture::{Gesture, TouchEvent};
use crate::input::gesture::{GestureConfig, GestureRecognizer};
use crate::platform::{NavigationDispatcher, RenderSink};

/// Wires the recognizer, the reconciler and the dispatcher together
///
/// All inputs carry a millisecond timestamp. Before handling an input the
/// controller runs everything that came due up to that time, so timers
/// always fire in order with respect to events.
pub struct OverlayController<R: RenderSink, S: SettingsStore, D: NavigationDispatcher> {
    recognizer: GestureRecognizer,
    reconciler: PositionReconciler<R, S>,
    dispatcher: D,
    settings_rx: Receiver<OverlaySettings>,
    /// Last settings snapshot pushed by the store
    settings: OverlaySettings,
    next_watchdog_ms: u64,
}

impl<R: RenderSink, S: SettingsStore, D: NavigationDispatcher> OverlayController<R, S, D> {
    /// Creates the controller and shows the dot at its restored anchor
    ///
    /// # Arguments
    /// * `config` - Dimensions, timeouts and thresholds
    /// * `geometry` - Screen geometry at startup
    /// * `insets` - System bar insets at startup
    /// * `render` - Where the dot is drawn
    /// * `settings_store` - Persisted settings; also receives anchor commits
    /// * `dispatcher` - Performs navigation actions
    /// * `now_ms` - Current time on the caller's clock
    pub fn new(
        config: OverlayConfig,
        geometry: ScreenGeometry,
        insets: SystemInsets,
        render: R,
        mut settings_store: S,
        dispatcher: D,
        now_ms: u64,
    ) -> Self {
        let settings_rx = settings_store.subscribe();
        let settings = settings_store.settings();
        let recognizer = GestureRecognizer::new(GestureConfig::from_overlay(
            &config,
            settings.tap_behavior.requires_long_press_to_drag(),
        ));
        let reconciler = PositionReconciler::new(config, geometry, insets, render, settings_store);
        let next_watchdog_ms = now_ms.saturating_add(reconciler.config().watchdog_interval_ms);

        info!(
            "controller: started in {} mode, locked={}",
            settings.tap_behavior, settings.lock_position
        );

        let mut controller = Self {
            recognizer,
            reconciler,
            dispatcher,
            settings_rx,
            settings,
            next_watchdog_ms,
        };
        controller.sync_settings(now_ms);
        controller
    }

    pub fn reconciler(&self) -> &PositionReconciler<R, S> {
        &self.reconciler
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn anchor(&self) -> Position {
        self.reconciler.anchor()
    }

    pub fn current(&self) -> Position {
        self.reconciler.current()
    }

    /// Earliest time at which [`Self::advance`] has work to do
    ///
    /// Animation frames are not included; while
    /// `reconciler().is_animating()` the host should advance at frame rate.
    pub fn next_deadline(&self) -> u64 {
        [self.recognizer.next_deadline(), self.reconciler.next_deadline()]
            .into_iter()
            .flatten()
            .fold(self.next_watchdog_ms, u64::min)
    }

    /// Handles one raw touch event
    ///
    /// # Returns
    /// Every gesture recognized up to and including this event
    pub fn on_touch(&mut self, event: TouchEvent) -> Vec<Gesture> {
        let now_ms = event.timestamp_ms;
        let mut gestures = self.advance(now_ms);

        let emitted = self.recognizer.on_touch(event);
        for gesture in &emitted {
            self.handle_gesture(*gesture, now_ms);
        }

        gestures.extend(emitted);
        gestures
    }

    /// Runs timers, animation frames and the watchdog up to `now_ms`
    ///
    /// # Returns
    /// Gestures resolved by expiring recognizer timers
    pub fn advance(&mut self, now_ms: u64) -> Vec<Gesture> {
        self.sync_settings(now_ms);

        let gestures = self.recognizer.poll(now_ms);
        for gesture in &gestures {
            self.handle_gesture(*gesture, now_ms);
        }

        self.reconciler.tick(now_ms);

        if now_ms >= self.next_watchdog_ms {
            match self.reconciler.tick_watchdog(now_ms) {
                WatchdogOutcome::Corrected { drift_px } => {
                    debug!("controller: watchdog corrected {}px of drift", drift_px)
                }
                outcome => trace!("controller: watchdog {:?}", outcome),
            }
            self.next_watchdog_ms = now_ms
                .saturating_add(self.reconciler.config().watchdog_interval_ms);
        }

        gestures
    }

    pub fn on_keyboard_changed(&mut self, visible: bool, height_px: i32, now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.on_keyboard_changed(visible, height_px, now_ms);
    }

    pub fn begin_orientation_change(&mut self, now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.begin_orientation_change(now_ms);
    }

    pub fn on_orientation_changed(&mut self, geometry: ScreenGeometry, now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.on_orientation_changed(geometry, now_ms);
    }

    pub fn on_insets_changed(&mut self, insets: SystemInsets, now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.on_insets_changed(insets, now_ms);
    }

    /// Changes settings through the store and applies the result right away
    pub fn update_settings(&mut self, mut change: impl FnMut(&mut OverlaySettings), now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.settings_mut().update(&mut change);
        self.sync_settings(now_ms);
    }

    pub fn reset_position(&mut self, now_ms: u64) {
        self.advance(now_ms);
        self.reconciler.reset_anchor(now_ms);
    }

    /// Drops pending gestures and hides the dot
    pub fn shutdown(&mut self) {
        debug!("controller: shutting down");
        self.recognizer.cancel_pending_gestures();
        self.reconciler.set_visible(false);
    }

    fn sync_settings(&mut self, now_ms: u64) {
        let mut latest = None;
        while let Ok(settings) = self.settings_rx.try_recv() {
            latest = Some(settings);
        }
        let Some(next) = latest else {
            return;
        };

        let previous = std::mem::replace(&mut self.settings, next);
        let settings = &self.settings;

        if previous.tap_behavior != settings.tap_behavior {
            info!(
                "controller: tap behavior {} -> {}",
                previous.tap_behavior, settings.tap_behavior
            );
            self.recognizer
                .set_requires_long_press_to_drag(settings.tap_behavior.requires_long_press_to_drag());
        }

        if previous.lock_position != settings.lock_position
            || previous.keyboard_avoidance != settings.keyboard_avoidance
        {
            debug!(
                "controller: locked={} keyboard_avoidance={}",
                settings.lock_position, settings.keyboard_avoidance
            );
            self.reconciler.on_avoidance_settings_changed(now_ms);
        }
    }

    fn handle_gesture(&mut self, gesture: Gesture, now_ms: u64) {
        match gesture {
            Gesture::DragStart => {
                if self.settings.lock_position {
                    debug!("controller: position locked, drag ignored");
                    return;
                }
                self.haptic();
                self.reconciler.on_drag_start();
            }
            // Without a drag session the reconciler ignores these
            Gesture::DragMove { dx, dy } => self.reconciler.on_drag_move(dx, dy),
            Gesture::DragEnd => self.reconciler.on_drag_end(now_ms),
            other => self.perform(other),
        }
    }

    fn perform(&mut self, gesture: Gesture) {
        let mode = self.settings.tap_behavior;
        let Some(action) = mode.action_for(&gesture) else {
            debug!("controller: {:?} does nothing in {} mode", gesture, mode);
            return;
        };

        self.haptic();
        match self.dispatcher.perform_action(action) {
            Ok(()) => debug!("controller: {:?} -> {:?}", gesture, action),
            Err(e) => warn!("controller: {:?} -> {:?} failed: {}", gesture, action, e),
        }
    }

    fn haptic(&mut self) {
        if self.settings.haptic_feedback {
            self.reconciler.render_mut().haptic_tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{MemorySettingsStore, SavedAnchor};
    use crate::domain::core::Rotation;
    use crate::domain::gesture::{NavigationAction, TapBehavior};
    use crate::platform::memory::{MemoryDispatcher, MemoryRenderSink};

    type TestController = OverlayController<MemoryRenderSink, MemorySettingsStore, MemoryDispatcher>;

    fn portrait() -> ScreenGeometry {
        ScreenGeometry::new(1080, 1920, Rotation::Deg0)
    }

    fn controller(settings: OverlaySettings) -> (TestController, MemoryRenderSink, MemoryDispatcher) {
        let sink = MemoryRenderSink::new();
        let dispatcher = MemoryDispatcher::new();
        let controller = OverlayController::new(
            OverlayConfig::default(),
            portrait(),
            SystemInsets::default(),
            sink.clone(),
            MemorySettingsStore::new(settings),
            dispatcher.clone(),
            0,
        );
        (controller, sink, dispatcher)
    }

    fn mode(tap_behavior: TapBehavior) -> OverlaySettings {
        OverlaySettings {
            tap_behavior,
            anchor: Some(SavedAnchor::capture(Position::new(500, 800), &portrait())),
            ..OverlaySettings::default()
        }
    }

    fn tap(c: &mut TestController, at_ms: u64) {
        c.on_touch(TouchEvent::down(520.0, 820.0, at_ms));
        c.on_touch(TouchEvent::up(520.0, 820.0, at_ms + 50));
    }

    #[test]
    fn standard_single_tap_goes_home_after_window() {
        let (mut c, _, dispatcher) = controller(mode(TapBehavior::Standard));
        tap(&mut c, 0);
        assert_eq!(c.next_deadline(), 350);
        assert!(c.advance(349).is_empty());
        assert_eq!(c.advance(350), vec![Gesture::Tap]);
        assert_eq!(dispatcher.performed(), vec![NavigationAction::Home]);
    }

    #[test]
    fn navi_double_tap_switches_app() {
        let (mut c, _, dispatcher) = controller(mode(TapBehavior::Navi));
        tap(&mut c, 0);
        tap(&mut c, 150);
        c.advance(1_000);
        assert_eq!(dispatcher.performed(), vec![NavigationAction::Recents]);
    }

    #[test]
    fn quadruple_tap_opens_settings_in_every_mode() {
        for behavior in [TapBehavior::Standard, TapBehavior::Navi, TapBehavior::SafeHome] {
            let (mut c, _, dispatcher) = controller(mode(behavior));
            for i in 0..4 {
                tap(&mut c, i * 120);
            }
            c.advance(2_000);
            assert_eq!(dispatcher.performed(), vec![NavigationAction::OpenSettings]);
        }
    }

    #[test]
    fn standard_drag_moves_and_commits() {
        let (mut c, sink, dispatcher) = controller(mode(TapBehavior::Standard));
        c.on_touch(TouchEvent::down(520.0, 820.0, 0));
        c.on_touch(TouchEvent::moved(560.0, 820.0, 30));
        c.on_touch(TouchEvent::moved(560.0, 900.0, 60));
        c.on_touch(TouchEvent::up(560.0, 900.0, 90));
        assert_eq!(c.anchor(), Position::new(540, 880));
        assert_eq!(sink.position(), Position::new(540, 880));
        c.advance(1_000);
        assert!(dispatcher.performed().is_empty());
    }

    #[test]
    fn safe_home_needs_long_press_before_dragging() {
        let (mut c, _, dispatcher) = controller(mode(TapBehavior::SafeHome));

        // A quick swipe never moves the dot
        c.on_touch(TouchEvent::down(520.0, 820.0, 0));
        c.on_touch(TouchEvent::moved(470.0, 820.0, 100));
        c.on_touch(TouchEvent::up(470.0, 820.0, 150));
        c.advance(1_000);
        assert_eq!(c.anchor(), Position::new(500, 800));
        assert_eq!(dispatcher.performed(), vec![NavigationAction::Home]);

        c.on_touch(TouchEvent::down(520.0, 820.0, 2_000));
        assert!(c.advance(2_500).is_empty());
        c.on_touch(TouchEvent::moved(420.0, 820.0, 2_600));
        c.on_touch(TouchEvent::up(420.0, 820.0, 2_700));
        assert_eq!(c.anchor(), Position::new(400, 800));
        assert_eq!(dispatcher.performed().len(), 1);
    }

    #[test]
    fn locked_position_ignores_drags() {
        let mut settings = mode(TapBehavior::Standard);
        settings.lock_position = true;
        let (mut c, _, _) = controller(settings);
        c.on_touch(TouchEvent::down(520.0, 820.0, 0));
        c.on_touch(TouchEvent::moved(700.0, 820.0, 30));
        c.on_touch(TouchEvent::up(700.0, 820.0, 60));
        assert_eq!(c.anchor(), Position::new(500, 800));
        assert_eq!(c.current(), Position::new(500, 800));
        assert!(!c.reconciler().is_dragging());
    }

    #[test]
    fn tap_behavior_change_reconfigures_recognizer() {
        let (mut c, _, _) = controller(mode(TapBehavior::SafeHome));
        assert!(c.recognizer().config().requires_long_press_to_drag);
        c.update_settings(|s| s.tap_behavior = TapBehavior::Standard, 0);
        assert!(!c.recognizer().config().requires_long_press_to_drag);

        c.on_touch(TouchEvent::down(520.0, 820.0, 100));
        let gestures = c.on_touch(TouchEvent::moved(560.0, 820.0, 130));
        assert_eq!(gestures.first(), Some(&Gesture::DragStart));
    }

    #[test]
    fn locking_with_keyboard_open_applies_avoidance() {
        let (mut c, _, _) = controller(OverlaySettings {
            anchor: Some(SavedAnchor::capture(Position::new(900, 1400), &portrait())),
            ..OverlaySettings::default()
        });
        c.on_keyboard_changed(true, 700, 0);
        assert!(!c.reconciler().is_animating());

        c.update_settings(|s| s.lock_position = true, 10);
        c.advance(1_000);
        assert_eq!(c.current(), Position::new(900, 1100));
        assert_eq!(c.anchor(), Position::new(900, 1400));
    }

    #[test]
    fn dispatch_failure_is_absorbed() {
        let (mut c, _, dispatcher) = controller(mode(TapBehavior::Standard));
        dispatcher.set_available(false);
        tap(&mut c, 0);
        assert_eq!(c.advance(1_000), vec![Gesture::Tap]);
        assert!(dispatcher.performed().is_empty());
    }

    #[test]
    fn haptics_follow_setting() {
        let (mut c, sink, _) = controller(mode(TapBehavior::Standard));
        tap(&mut c, 0);
        c.advance(1_000);
        assert_eq!(sink.haptic_ticks(), 1);

        c.update_settings(|s| s.haptic_feedback = false, 1_000);
        tap(&mut c, 2_000);
        c.advance(3_000);
        assert_eq!(sink.haptic_ticks(), 1);
    }

    #[test]
    fn watchdog_runs_on_its_interval() {
        let (mut c, sink, _) = controller(mode(TapBehavior::Standard));
        sink.nudge(Position::new(560, 800));
        c.advance(499);
        assert_eq!(c.current(), Position::new(500, 800));

        c.advance(500);
        assert!(c.reconciler().is_animating());
        c.advance(1_000);
        assert_eq!(sink.position(), Position::new(500, 800));
        assert_eq!(c.next_deadline(), 1_500);
    }

    #[test]
    fn shutdown_hides_dot_and_drops_pending_taps() {
        let (mut c, sink, dispatcher) = controller(mode(TapBehavior::Standard));
        tap(&mut c, 0);
        c.shutdown();
        c.advance(1_000);
        assert!(!sink.is_visible());
        assert!(dispatcher.performed().is_empty());
    }
}
