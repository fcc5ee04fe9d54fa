//! Anchor/current position reconciliation
//!
//! The reconciler keeps two coordinates for the dot. The *anchor* is where
//! the user wants it to rest; the *current* position is what is actually
//! rendered. Drags, keyboard avoidance, animations and the drift watchdog
//! all move `current`. Only three things ever move the anchor:
//! - a finished drag
//! - a rotation (the anchor is transformed into the new geometry)
//! - an explicit reset to the default position
//!
//! Everything runs on the caller's thread and clock. Render failures are
//! logged and retried from the watchdog; they never corrupt internal state.

use log::{debug, info, trace, warn};

use crate::app::state::{
    AnchorPosition, DragSession, KeyboardState, KeyboardTransition, OrientationChange,
    WatchdogOutcome, WatchdogSkip,
};
use crate::config::OverlayConfig;
use crate::config::settings::{SavedAnchor, SettingsStore};
use crate::domain::core::{Position, ScreenGeometry};
use crate::domain::geometry::{ConstrainBounds, GeometryTransform, SystemInsets};
use crate::platform::RenderSink;
use crate::ui::animator::{AnimationFrame, PositionAnimator};

/// Works out where a saved anchor belongs on the current screen
///
/// # Arguments
/// * `saved` - Persisted anchor, if the user ever placed the dot
/// * `geometry` - Geometry the dot is being restored into
/// * `config` - Provides the default anchor and the button size
///
/// # Returns
/// The unclamped anchor position for `geometry`
pub fn restore_anchor(
    saved: Option<&SavedAnchor>,
    geometry: &ScreenGeometry,
    config: &OverlayConfig,
) -> Position {
    let Some(saved) = saved else {
        return config.default_anchor_for(geometry);
    };

    let saved_geometry = saved.geometry();
    if !saved_geometry.is_known() {
        return saved.position();
    }

    if saved_geometry.rotation != geometry.rotation {
        return GeometryTransform::transform_top_left(
            saved.position(),
            &saved_geometry,
            geometry.rotation,
            config.half_button_px(),
        );
    }

    if saved_geometry.width != geometry.width || saved_geometry.height != geometry.height {
        return geometry.from_fraction(saved.x_percent, saved.y_percent);
    }

    saved.position()
}

/// Owns the anchor and current position and every trigger that moves them
pub struct PositionReconciler<R: RenderSink, S: SettingsStore> {
    config: OverlayConfig,
    geometry: ScreenGeometry,
    insets: SystemInsets,
    anchor: AnchorPosition,
    current: Position,
    keyboard: KeyboardState,
    drag: Option<DragSession>,
    orientation: Option<OrientationChange>,
    /// Keyboard work deferred by a drag or an orientation change
    pending_keyboard: bool,
    animator: PositionAnimator,
    /// The last render move failed; `current` has not reached the screen
    render_out_of_sync: bool,
    render: R,
    settings: S,
}

impl<R: RenderSink, S: SettingsStore> PositionReconciler<R, S> {
    /// Creates a reconciler and places the dot at its restored anchor
    ///
    /// An unknown (zero-sized) geometry falls back to the configured
    /// default geometry.
    pub fn new(
        config: OverlayConfig,
        geometry: ScreenGeometry,
        insets: SystemInsets,
        render: R,
        settings: S,
    ) -> Self {
        let config = config.sanitized();
        if !geometry.is_known() {
            warn!(
                "reconciler: unknown geometry {}x{}, using default {}x{}",
                geometry.width,
                geometry.height,
                config.default_geometry.width,
                config.default_geometry.height
            );
        }
        let geometry = geometry.or(config.default_geometry);
        let restored = restore_anchor(settings.anchor().as_ref(), &geometry, &config);

        let mut reconciler = Self {
            config,
            geometry,
            insets,
            anchor: AnchorPosition::new(restored, geometry),
            current: restored,
            keyboard: KeyboardState::default(),
            drag: None,
            orientation: None,
            pending_keyboard: false,
            animator: PositionAnimator::new(),
            render_out_of_sync: false,
            render,
            settings,
        };

        let anchor = reconciler.clamp(restored);
        reconciler.anchor.position = anchor;
        info!("reconciler: anchor restored at ({}, {})", anchor.x, anchor.y);
        reconciler.apply_current(anchor);
        reconciler.set_visible(true);
        reconciler
    }

    pub fn anchor(&self) -> Position {
        self.anchor.position
    }

    pub fn anchor_position(&self) -> AnchorPosition {
        self.anchor
    }

    pub fn current(&self) -> Position {
        self.current
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    pub fn insets(&self) -> SystemInsets {
        self.insets
    }

    pub fn keyboard(&self) -> KeyboardState {
        self.keyboard
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    pub fn orientation_change_in_progress(&self) -> bool {
        self.orientation.is_some()
    }

    pub fn needs_render_sync(&self) -> bool {
        self.render_out_of_sync
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    /// Bounds for the current geometry and insets, None if unknown
    pub fn bounds(&self) -> Option<ConstrainBounds> {
        ConstrainBounds::compute(&self.geometry, &self.insets, &self.config)
    }

    /// Keyboard avoidance is only applied to a locked dot
    pub fn avoidance_applies(&self) -> bool {
        self.settings.keyboard_avoidance_enabled() && self.settings.position_locked()
    }

    /// Lowest top-left Y that keeps the dot clear of a visible keyboard
    pub fn safe_zone_y(&self) -> Option<i32> {
        if !self.keyboard.visible {
            return None;
        }
        Some(
            (self.geometry.height - self.keyboard.height)
                - self.config.button_size_px()
                - self.config.layout_offset_px()
                - self.config.keyboard_margin_px(),
        )
    }

    /// Earliest time-based work pending, besides animation frames
    pub fn next_deadline(&self) -> Option<u64> {
        self.orientation
            .map(|change| change.deadline(self.config.orientation_timeout_ms))
    }

    pub fn on_drag_start(&mut self) {
        if self.animator.cancel() {
            debug!("reconciler: drag cancelled running animation");
        }
        if self.drag.is_some() {
            debug!("reconciler: drag restarted");
        }
        self.drag = Some(DragSession::new());
        debug!("reconciler: drag start at ({}, {})", self.current.x, self.current.y);
    }

    /// Moves the dot by one drag step
    ///
    /// # Arguments
    /// * `dx`, `dy` - Finger movement since the previous step
    pub fn on_drag_move(&mut self, dx: f32, dy: f32) {
        let Some(drag) = self.drag.as_mut() else {
            trace!("reconciler: drag move without drag session ignored");
            return;
        };
        let (step_x, step_y) = drag.step(dx, dy);
        let mut target = self.current.offset(step_x, step_y);

        if self.avoidance_applies() {
            if let Some(safe_y) = self.safe_zone_y() {
                target.y = target.y.min(safe_y);
            }
        }

        let target = self.clamp(target);
        if target != self.current {
            trace!("reconciler: drag to ({}, {})", target.x, target.y);
            self.apply_current(target);
        }
    }

    /// Commits the dragged position as the new anchor and persists it
    pub fn on_drag_end(&mut self, now_ms: u64) {
        if self.drag.take().is_none() {
            trace!("reconciler: drag end without drag session ignored");
            return;
        }

        self.anchor = AnchorPosition::new(self.current, self.geometry);
        self.persist_anchor();
        info!(
            "reconciler: anchor committed at ({}, {})",
            self.current.x, self.current.y
        );

        if self.pending_keyboard {
            self.reconcile_keyboard(now_ms);
        }
    }

    /// Handles a keyboard visibility notification
    ///
    /// A visible keyboard reporting 0px is assumed to cover the configured
    /// fraction of the screen. Duplicate notifications are absorbed.
    pub fn on_keyboard_changed(&mut self, visible: bool, height_px: i32, now_ms: u64) {
        let height = if visible && height_px <= 0 {
            let estimate = self.config.estimated_keyboard_height(self.geometry.height);
            debug!("reconciler: keyboard reported 0px, estimating {}px", estimate);
            estimate
        } else {
            height_px.max(0)
        };

        let transition = self.keyboard.apply(visible, height);
        if transition == KeyboardTransition::Unchanged {
            trace!("reconciler: duplicate keyboard notification");
            return;
        }

        debug!("reconciler: keyboard {:?} ({}px)", transition, height);
        self.reconcile_keyboard(now_ms);
    }

    /// Re-evaluates keyboard avoidance after the lock or avoidance toggles change
    pub fn on_avoidance_settings_changed(&mut self, now_ms: u64) {
        if self.keyboard.visible {
            self.reconcile_keyboard(now_ms);
        }
    }

    /// Marks a rotation as in progress and hides the dot until it lands
    pub fn begin_orientation_change(&mut self, now_ms: u64) {
        if self.orientation.is_some() {
            debug!("reconciler: orientation change restarted");
        }
        if self.animator.cancel() {
            debug!("reconciler: orientation change cancelled running animation");
            // Re-evaluated once the rotation lands or times out
            self.pending_keyboard = true;
        }
        self.orientation = Some(OrientationChange::new(now_ms));
        self.set_visible(false);
    }

    /// Applies the geometry delivered by a rotation or resize
    ///
    /// The anchor is transformed by its center so the dot stays on the same
    /// physical spot, clamped, and becomes the current position without
    /// animation. Works with or without a preceding
    /// [`Self::begin_orientation_change`].
    pub fn on_orientation_changed(&mut self, geometry: ScreenGeometry, now_ms: u64) {
        if !geometry.is_known() {
            warn!(
                "reconciler: orientation change reported {}x{}, keeping {}x{}",
                geometry.width, geometry.height, self.geometry.width, self.geometry.height
            );
        } else if geometry != self.geometry {
            self.apply_geometry(geometry);
        } else {
            debug!("reconciler: orientation unchanged");
        }

        self.finish_orientation_change(now_ms);
    }

    pub fn on_insets_changed(&mut self, insets: SystemInsets, now_ms: u64) {
        if insets == self.insets {
            return;
        }
        debug!("reconciler: insets {:?}", insets);
        self.insets = insets;

        let clamped = self.clamp(self.current);
        if clamped != self.current {
            self.apply_current(clamped);
        }
        if self.keyboard.visible {
            self.reconcile_keyboard(now_ms);
        }
    }

    /// Moves the anchor back to the default position
    pub fn reset_anchor(&mut self, now_ms: u64) {
        let anchor = self.clamp(self.config.default_anchor_for(&self.geometry));
        self.anchor = AnchorPosition::new(anchor, self.geometry);
        self.persist_anchor();
        info!("reconciler: anchor reset to ({}, {})", anchor.x, anchor.y);
        self.reconcile_keyboard(now_ms);
    }

    /// Advances time-based work: abandons a stale orientation change and
    /// renders the next animation frame
    pub fn tick(&mut self, now_ms: u64) -> Option<AnimationFrame> {
        self.expire_orientation_change(now_ms);
        self.tick_animation(now_ms)
    }

    pub fn tick_animation(&mut self, now_ms: u64) -> Option<AnimationFrame> {
        let frame = self.animator.tick(now_ms)?;
        self.apply_frame(frame);
        Some(frame)
    }

    /// Periodic consistency check
    ///
    /// Does nothing while a drag, an animation, a rotation or a visible
    /// keyboard legitimately displaces the dot. Otherwise it retries a failed
    /// render, adopts a position something else moved the overlay to, and
    /// animates back to the anchor when the drift exceeds the threshold.
    pub fn tick_watchdog(&mut self, now_ms: u64) -> WatchdogOutcome {
        self.expire_orientation_change(now_ms);

        if let Some(reason) = self.watchdog_blocker() {
            trace!("reconciler: watchdog skipped ({:?})", reason);
            return WatchdogOutcome::Skipped(reason);
        }

        if self.render_out_of_sync {
            debug!("reconciler: retrying render at ({}, {})", self.current.x, self.current.y);
            self.apply_current(self.current);
        } else {
            self.adopt_rendered_position();
        }

        let home = self.clamp(self.anchor.position);
        let drift = self.current.distance_to(&home);
        if drift > self.config.drift_threshold_px() {
            info!(
                "reconciler: drift of {:.1}px, returning to anchor ({}, {})",
                drift, home.x, home.y
            );
            self.animate_to(home, now_ms);
            WatchdogOutcome::Corrected {
                drift_px: drift.round() as u32,
            }
        } else {
            WatchdogOutcome::InSync
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if let Err(e) = self.render.set_visible(visible) {
            warn!("reconciler: {}", e);
        }
    }

    fn watchdog_blocker(&self) -> Option<WatchdogSkip> {
        if self.drag.is_some() {
            Some(WatchdogSkip::Dragging)
        } else if self.animator.is_animating() {
            Some(WatchdogSkip::Animating)
        } else if self.orientation.is_some() {
            Some(WatchdogSkip::OrientationChange)
        } else if self.keyboard.visible {
            Some(WatchdogSkip::KeyboardVisible)
        } else {
            None
        }
    }

    fn adopt_rendered_position(&mut self) {
        match self.render.overlay_position() {
            Ok(rendered) if rendered != self.current => {
                let adopted = self.clamp(rendered);
                debug!(
                    "reconciler: overlay found at ({}, {}), expected ({}, {})",
                    rendered.x, rendered.y, self.current.x, self.current.y
                );
                if adopted == rendered {
                    self.current = adopted;
                } else {
                    self.apply_current(adopted);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("reconciler: {}", e),
        }
    }

    fn apply_geometry(&mut self, geometry: ScreenGeometry) {
        let old = self.anchor;
        let moved = if geometry.rotation != old.geometry.rotation {
            GeometryTransform::transform_top_left(
                old.position,
                &old.geometry,
                geometry.rotation,
                self.config.half_button_px(),
            )
        } else {
            // Same rotation, new size (split screen, foldables)
            old.geometry
                .to_fraction(old.position)
                .map(|(fx, fy)| geometry.from_fraction(fx, fy))
                .unwrap_or(old.position)
        };

        if self.drag.take().is_some() {
            debug!("reconciler: drag dropped by geometry change");
        }
        self.animator.cancel();
        self.geometry = geometry;

        let anchor = self.clamp(moved);
        self.anchor = AnchorPosition::new(anchor, geometry);
        self.apply_current(anchor);
        self.persist_anchor();
        info!(
            "reconciler: geometry {}x{} {:?}, anchor ({}, {}) -> ({}, {})",
            geometry.width,
            geometry.height,
            geometry.rotation,
            old.position.x,
            old.position.y,
            anchor.x,
            anchor.y
        );
    }

    fn expire_orientation_change(&mut self, now_ms: u64) {
        let timeout = self.config.orientation_timeout_ms;
        let Some(change) = self.orientation else {
            return;
        };
        if change.is_timed_out(now_ms, timeout) {
            warn!(
                "reconciler: no geometry {}ms after orientation change began, abandoning it",
                now_ms.saturating_sub(change.started_at_ms)
            );
            self.finish_orientation_change(now_ms);
        }
    }

    fn finish_orientation_change(&mut self, now_ms: u64) {
        if self.orientation.take().is_some() {
            self.set_visible(true);
        }
        if self.pending_keyboard || self.keyboard.visible {
            self.reconcile_keyboard(now_ms);
        }
    }

    /// Where the dot should sit given the keyboard state
    fn keyboard_target(&self) -> Position {
        let anchor = self.anchor.position;
        match self.safe_zone_y() {
            Some(safe_y) if self.avoidance_applies() && anchor.y > safe_y => {
                Position::new(anchor.x, safe_y)
            }
            _ => anchor,
        }
    }

    fn reconcile_keyboard(&mut self, now_ms: u64) {
        if self.orientation.is_some() || self.drag.is_some() {
            debug!("reconciler: keyboard reconciliation deferred");
            self.pending_keyboard = true;
            return;
        }
        self.pending_keyboard = false;

        let target = self.keyboard_target();
        debug!("reconciler: keyboard target ({}, {})", target.x, target.y);
        self.animate_to(target, now_ms);
    }

    fn animate_to(&mut self, target: Position, now_ms: u64) {
        let target = self.clamp(target);
        let duration = self.config.animation_duration_ms;
        if let Some(frame) = self.animator.animate(self.current, target, duration, now_ms) {
            self.apply_frame(frame);
        }
    }

    fn apply_frame(&mut self, frame: AnimationFrame) {
        match frame {
            AnimationFrame::Step(position) => {
                let position = self.clamp(position);
                self.apply_current(position);
            }
            AnimationFrame::Finished(position) => {
                let position = self.clamp(position);
                if position != self.current || self.render_out_of_sync {
                    self.apply_current(position);
                }
                trace!("reconciler: animation finished at ({}, {})", position.x, position.y);
            }
        }
    }

    fn clamp(&self, position: Position) -> Position {
        match self.bounds() {
            Some(bounds) => bounds.clamp(position),
            None => position,
        }
    }

    fn apply_current(&mut self, position: Position) {
        self.current = position;
        match self.render.move_overlay_to(position) {
            Ok(()) => {
                if self.render_out_of_sync {
                    debug!("reconciler: render back in sync");
                }
                self.render_out_of_sync = false;
            }
            Err(e) => {
                if self.render_out_of_sync {
                    trace!("reconciler: {}", e);
                } else {
                    warn!("reconciler: {}; will retry", e);
                }
                self.render_out_of_sync = true;
            }
        }
    }

    fn persist_anchor(&mut self) {
        let saved = SavedAnchor::capture(self.anchor.position, &self.anchor.geometry);
        self.settings.set_anchor(saved);
    }
}
