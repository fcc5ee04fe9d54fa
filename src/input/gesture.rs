//! Gesture recognition for a single-pointer touch stream
//!
//! The recognizer is a small state machine fed with [`TouchEvent`]s.
//! Timers (long-press, multi-tap resolution) are deadlines on the caller's
//! millisecond clock; [`GestureRecognizer::poll`] fires the ones that are
//! due. Every `on_touch` call polls first, so a deadline that expired before
//! the event arrived is handled before the event itself.
//!
//! ## States
//! `Idle -> Pressed -> {LongPressArmed | Dragging} -> Idle`, plus a pending
//! multi-tap window that stays open across touches until it resolves.

use log::{debug, trace};

use crate::config::OverlayConfig;
use crate::domain::gesture::{Gesture, TouchAction, TouchEvent};

/// Recognizer tuning
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Dragging must be armed by a long-press first
    pub requires_long_press_to_drag: bool,
    pub touch_slop: f32,
    /// Path length under which a long-press drag still counts as a tap
    pub minimal_drag_threshold: f32,
    pub long_press_timeout_ms: u64,
    pub double_tap_timeout_ms: u64,
}

impl GestureConfig {
    pub fn from_overlay(config: &OverlayConfig, requires_long_press_to_drag: bool) -> Self {
        Self {
            requires_long_press_to_drag,
            touch_slop: config.touch_slop_px as f32,
            minimal_drag_threshold: config.minimal_drag_threshold_px(),
            long_press_timeout_ms: config.long_press_timeout_ms,
            double_tap_timeout_ms: config.double_tap_timeout_ms,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::from_overlay(&OverlayConfig::default(), false)
    }
}

/// Where the current touch is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Idle,
    Pressed,
    /// The long-press timer fired while the finger was still down
    LongPressArmed,
    Dragging,
}

/// Converts raw touches into semantic gestures
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    phase: TouchPhase,
    touch_start: (f32, f32),
    last: (f32, f32),
    is_long_press: bool,
    is_drag_armed: bool,
    has_moved: bool,
    click_count: u32,
    last_click_ms: Option<u64>,
    total_drag_distance: f32,
    long_press_deadline: Option<u64>,
    multi_tap_deadline: Option<u64>,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: TouchPhase::Idle,
            touch_start: (0.0, 0.0),
            last: (0.0, 0.0),
            is_long_press: false,
            is_drag_armed: false,
            has_moved: false,
            click_count: 0,
            last_click_ms: None,
            total_drag_distance: 0.0,
            long_press_deadline: None,
            multi_tap_deadline: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn phase(&self) -> TouchPhase {
        self.phase
    }

    /// Switches between immediate dragging and long-press-gated dragging
    ///
    /// Takes effect from the next touch-down.
    pub fn set_requires_long_press_to_drag(&mut self, required: bool) {
        if self.config.requires_long_press_to_drag != required {
            debug!("gesture: requires_long_press_to_drag={}", required);
        }
        self.config.requires_long_press_to_drag = required;
    }

    /// Earliest pending timer deadline, if any
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.long_press_deadline, self.multi_tap_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Handles one touch event
    ///
    /// # Returns
    /// Gestures emitted by expired timers followed by those caused by the event
    pub fn on_touch(&mut self, event: TouchEvent) -> Vec<Gesture> {
        let mut gestures = self.poll(event.timestamp_ms);

        match event.action {
            TouchAction::Down => self.handle_down(event),
            TouchAction::Move => self.handle_move(event, &mut gestures),
            TouchAction::Up => self.handle_up(event, &mut gestures),
        }

        gestures
    }

    /// Fires every timer due at or before `now_ms`, earliest first
    pub fn poll(&mut self, now_ms: u64) -> Vec<Gesture> {
        let mut gestures = Vec::new();

        loop {
            let long_press_due = self.long_press_deadline.filter(|d| *d <= now_ms);
            let multi_tap_due = self.multi_tap_deadline.filter(|d| *d <= now_ms);

            match (long_press_due, multi_tap_due) {
                (Some(lp), Some(mt)) if mt < lp => self.fire_multi_tap(&mut gestures),
                (Some(_), _) => self.fire_long_press(&mut gestures),
                (None, Some(_)) => self.fire_multi_tap(&mut gestures),
                (None, None) => break,
            }
        }

        gestures
    }

    /// Drops all timers and transient state (used on teardown)
    pub fn cancel_pending_gestures(&mut self) {
        self.long_press_deadline = None;
        self.multi_tap_deadline = None;
        self.click_count = 0;
        self.last_click_ms = None;
        self.reset_touch();
        self.phase = TouchPhase::Idle;
    }

    fn reset_touch(&mut self) {
        self.is_long_press = false;
        self.is_drag_armed = false;
        self.has_moved = false;
        self.total_drag_distance = 0.0;
    }

    fn handle_down(&mut self, event: TouchEvent) {
        if self.phase != TouchPhase::Idle {
            debug!("gesture: down while {:?}, restarting touch", self.phase);
        }

        self.reset_touch();
        self.touch_start = (event.x, event.y);
        self.last = self.touch_start;
        self.phase = TouchPhase::Pressed;
        self.long_press_deadline = Some(
            event
                .timestamp_ms
                .saturating_add(self.config.long_press_timeout_ms),
        );
    }

    fn handle_move(&mut self, event: TouchEvent, gestures: &mut Vec<Gesture>) {
        if self.phase == TouchPhase::Idle {
            trace!("gesture: move without down ignored");
            return;
        }

        if !self.has_moved {
            let slop = self.config.touch_slop;
            let exceeds_slop = (event.x - self.touch_start.0).abs() > slop
                || (event.y - self.touch_start.1).abs() > slop;

            if !exceeds_slop {
                return;
            }

            if self.config.requires_long_press_to_drag && !self.is_drag_armed {
                if self.long_press_deadline.take().is_some() {
                    debug!("gesture: moved before long-press, long-press cancelled");
                }
                return;
            }

            self.long_press_deadline = None;
            self.has_moved = true;
            self.phase = TouchPhase::Dragging;
            debug!("gesture: drag start");
            gestures.push(Gesture::DragStart);
        }

        let dx = event.x - self.last.0;
        let dy = event.y - self.last.1;
        self.total_drag_distance += (dx * dx + dy * dy).sqrt();
        self.last = (event.x, event.y);

        trace!("gesture: drag move ({}, {}) total={}", dx, dy, self.total_drag_distance);
        gestures.push(Gesture::DragMove { dx, dy });
    }

    fn handle_up(&mut self, event: TouchEvent, gestures: &mut Vec<Gesture>) {
        if self.phase == TouchPhase::Idle {
            trace!("gesture: duplicate up ignored");
            return;
        }

        self.long_press_deadline = None;
        let requires_long_press = self.config.requires_long_press_to_drag;

        if self.has_moved {
            if requires_long_press
                && self.is_long_press
                && self.total_drag_distance < self.config.minimal_drag_threshold
            {
                debug!(
                    "gesture: micro drag after long-press ({}px) treated as tap",
                    self.total_drag_distance
                );
                gestures.push(Gesture::Tap);
            } else {
                debug!("gesture: drag end after {}px", self.total_drag_distance);
                gestures.push(Gesture::DragEnd);
            }
        } else if self.is_long_press {
            // Without the drag gate LongPress already fired from the timer
            if requires_long_press {
                gestures.push(Gesture::Tap);
            }
        } else {
            self.register_click(event.timestamp_ms);
        }

        self.is_drag_armed = false;
        self.phase = TouchPhase::Idle;
    }

    fn register_click(&mut self, now_ms: u64) {
        let within_window = self
            .last_click_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.double_tap_timeout_ms);

        self.click_count = if within_window { self.click_count + 1 } else { 1 };
        self.last_click_ms = Some(now_ms);
        self.multi_tap_deadline = Some(now_ms.saturating_add(self.config.double_tap_timeout_ms));
        trace!("gesture: click #{}", self.click_count);
    }

    fn fire_long_press(&mut self, gestures: &mut Vec<Gesture>) {
        self.long_press_deadline = None;
        if self.phase == TouchPhase::Idle {
            return;
        }

        self.is_long_press = true;
        self.phase = TouchPhase::LongPressArmed;

        if self.config.requires_long_press_to_drag {
            // Wait for movement before announcing anything
            self.is_drag_armed = true;
            debug!("gesture: long-press armed dragging");
        } else {
            debug!("gesture: long press");
            gestures.push(Gesture::LongPress);
        }
    }

    fn fire_multi_tap(&mut self, gestures: &mut Vec<Gesture>) {
        self.multi_tap_deadline = None;
        if let Some(gesture) = Gesture::from_click_count(self.click_count) {
            debug!("gesture: {} click(s) resolved to {:?}", self.click_count, gesture);
            gestures.push(gesture);
        }
        self.click_count = 0;
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn recognizer(requires_long_press: bool) -> GestureRecognizer {
        GestureRecognizer::new(GestureConfig {
            requires_long_press_to_drag: requires_long_press,
            ..GestureConfig::default()
        })
    }

    /// Feeds events and collects everything emitted
    fn feed(recognizer: &mut GestureRecognizer, events: &[TouchEvent]) -> Vec<Gesture> {
        events.iter().flat_map(|e| recognizer.on_touch(*e)).collect()
    }

    fn taps(count: usize, start_ms: u64, gap_ms: u64) -> Vec<TouchEvent> {
        (0..count)
            .flat_map(|i| {
                let t = start_ms + i as u64 * gap_ms;
                [TouchEvent::down(50.0, 50.0, t), TouchEvent::up(50.0, 50.0, t + 40)]
            })
            .collect()
    }

    #[test]
    fn single_tap_resolves_after_window() {
        let mut r = recognizer(false);
        let emitted = feed(&mut r, &taps(1, 0, 0));
        assert!(emitted.is_empty());
        assert_eq!(r.next_deadline(), Some(340));
        assert!(r.poll(339).is_empty());
        assert_eq!(r.poll(340), vec![Gesture::Tap]);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn slow_taps_resolve_separately() {
        let mut r = recognizer(false);
        let mut emitted = feed(&mut r, &taps(2, 0, 400));
        emitted.extend(r.poll(10_000));
        assert_eq!(emitted, vec![Gesture::Tap, Gesture::Tap]);
    }

    #[test]
    fn small_moves_never_start_a_drag() {
        let mut r = recognizer(false);
        let mut emitted = feed(
            &mut r,
            &[
                TouchEvent::down(100.0, 100.0, 0),
                TouchEvent::moved(105.0, 103.0, 20),
                TouchEvent::moved(92.0, 108.0, 40),
                TouchEvent::up(100.0, 100.0, 60),
            ],
        );
        emitted.extend(r.poll(1_000));
        assert_eq!(emitted, vec![Gesture::Tap]);
    }

    #[test]
    fn crossing_slop_starts_exactly_one_drag() {
        let mut r = recognizer(false);
        let emitted = feed(
            &mut r,
            &[
                TouchEvent::down(100.0, 100.0, 0),
                TouchEvent::moved(110.0, 100.0, 20),
                TouchEvent::moved(120.0, 105.0, 40),
                TouchEvent::moved(125.0, 105.0, 60),
                TouchEvent::up(125.0, 105.0, 80),
            ],
        );
        assert_eq!(
            emitted,
            vec![
                Gesture::DragStart,
                Gesture::DragMove { dx: 10.0, dy: 0.0 },
                Gesture::DragMove { dx: 10.0, dy: 5.0 },
                Gesture::DragMove { dx: 5.0, dy: 0.0 },
                Gesture::DragEnd,
            ]
        );
        // Drag cancels the long-press
        assert!(r.poll(10_000).is_empty());
    }

    #[test]
    fn long_press_fires_immediately_without_drag_gate() {
        let mut r = recognizer(false);
        assert!(r.on_touch(TouchEvent::down(0.0, 0.0, 0)).is_empty());
        assert_eq!(r.poll(500), vec![Gesture::LongPress]);
        assert_eq!(r.phase(), TouchPhase::LongPressArmed);
        assert!(r.on_touch(TouchEvent::up(0.0, 0.0, 800)).is_empty());
        assert!(r.poll(10_000).is_empty());
    }

    #[test]
    fn gated_move_before_long_press_cancels_it_without_dragging() {
        let mut r = recognizer(true);
        let emitted = feed(
            &mut r,
            &[
                TouchEvent::down(100.0, 100.0, 0),
                TouchEvent::moved(130.0, 100.0, 100),
                TouchEvent::moved(160.0, 100.0, 600),
            ],
        );
        assert!(emitted.is_empty());
        assert_eq!(r.phase(), TouchPhase::Pressed);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn gated_long_press_then_drag() {
        let mut r = recognizer(true);
        assert!(r.on_touch(TouchEvent::down(100.0, 100.0, 0)).is_empty());
        // Timer fires silently and arms the drag
        assert!(r.poll(500).is_empty());
        let emitted = feed(
            &mut r,
            &[
                TouchEvent::moved(150.0, 100.0, 600),
                TouchEvent::moved(150.0, 140.0, 650),
                TouchEvent::up(150.0, 140.0, 700),
            ],
        );
        assert_eq!(
            emitted,
            vec![
                Gesture::DragStart,
                Gesture::DragMove { dx: 50.0, dy: 0.0 },
                Gesture::DragMove { dx: 0.0, dy: 40.0 },
                Gesture::DragEnd,
            ]
        );
    }

    #[test]
    fn gated_long_press_release_is_a_tap() {
        let mut r = recognizer(true);
        let emitted = feed(
            &mut r,
            &[TouchEvent::down(0.0, 0.0, 0), TouchEvent::up(0.0, 0.0, 700)],
        );
        assert_eq!(emitted, vec![Gesture::Tap]);
    }

    #[test]
    fn gated_micro_drag_is_a_tap() {
        let mut r = recognizer(true);
        let emitted = feed(
            &mut r,
            &[
                TouchEvent::down(0.0, 0.0, 0),
                TouchEvent::moved(9.0, 0.0, 600),
                TouchEvent::up(9.0, 0.0, 650),
            ],
        );
        assert_eq!(
            emitted,
            vec![
                Gesture::DragStart,
                Gesture::DragMove { dx: 9.0, dy: 0.0 },
                Gesture::Tap,
            ]
        );
    }

    #[test]
    fn zig_zag_path_length_counts_not_displacement() {
        let mut r = recognizer(true);
        let emitted = feed(
            &mut r,
            &[
                TouchEvent::down(0.0, 0.0, 0),
                TouchEvent::moved(10.0, 0.0, 600),
                TouchEvent::moved(0.0, 0.0, 620),
                TouchEvent::moved(10.0, 0.0, 640),
                TouchEvent::moved(0.0, 0.0, 660),
                TouchEvent::up(0.0, 0.0, 680),
            ],
        );
        assert_eq!(emitted.last(), Some(&Gesture::DragEnd));
    }

    #[test]
    fn duplicate_up_is_absorbed() {
        let mut r = recognizer(false);
        let mut emitted = feed(
            &mut r,
            &[
                TouchEvent::down(0.0, 0.0, 0),
                TouchEvent::up(0.0, 0.0, 30),
                TouchEvent::up(0.0, 0.0, 35),
            ],
        );
        emitted.extend(r.poll(1_000));
        assert_eq!(emitted, vec![Gesture::Tap]);
    }

    #[test]
    fn cancel_clears_pending_taps_and_timers() {
        let mut r = recognizer(false);
        feed(&mut r, &taps(2, 0, 100));
        r.on_touch(TouchEvent::down(0.0, 0.0, 250));
        r.cancel_pending_gestures();
        assert_eq!(r.next_deadline(), None);
        assert_eq!(r.phase(), TouchPhase::Idle);
        assert!(r.poll(10_000).is_empty());
    }

    #[test]
    fn mode_switch_applies_to_next_touch() {
        let mut r = recognizer(false);
        r.set_requires_long_press_to_drag(true);
        let emitted = feed(
            &mut r,
            &[TouchEvent::down(0.0, 0.0, 0), TouchEvent::moved(40.0, 0.0, 50)],
        );
        assert!(emitted.is_empty());
    }

    proptest! {
        #[test]
        fn tap_count_maps_to_one_gesture(count in 1usize..8, gap in 50u64..250) {
            let mut r = recognizer(false);
            let mut emitted = feed(&mut r, &taps(count, 0, gap));
            emitted.extend(r.poll(u64::MAX / 2));
            let expected = Gesture::from_click_count(count as u32).unwrap();
            prop_assert_eq!(emitted, vec![expected]);
        }
    }
}
