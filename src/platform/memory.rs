//! In-memory collaborators
//!
//! Used by the headless driver and by tests. Each type hands out a cheap
//! clonable handle so the state stays observable after the collaborator
//! has been moved into the reconciler or controller.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use crate::domain::core::Position;
use crate::domain::gesture::NavigationAction;
use crate::platform::{DispatchError, NavigationDispatcher, RenderError, RenderSink};

#[derive(Debug, Default)]
pub struct RenderState {
    pub position: Position,
    pub visible: bool,
    /// Every position successfully applied, in order
    pub moves: Vec<Position>,
    pub haptic_ticks: u32,
    /// While set, moves fail and leave the position untouched
    pub fail_moves: bool,
}

/// Render sink that only records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderSink {
    state: Rc<RefCell<RenderState>>,
    log_moves: bool,
}

impl MemoryRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same sink, but every move is also logged at info level
    pub fn logging() -> Self {
        Self {
            log_moves: true,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Position {
        self.state.borrow().position
    }

    pub fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    pub fn moves(&self) -> Vec<Position> {
        self.state.borrow().moves.clone()
    }

    pub fn haptic_ticks(&self) -> u32 {
        self.state.borrow().haptic_ticks
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().fail_moves = failing;
    }

    /// Moves the overlay behind the reconciler's back
    pub fn nudge(&self, position: Position) {
        self.state.borrow_mut().position = position;
    }
}

impl RenderSink for MemoryRenderSink {
    fn move_overlay_to(&mut self, position: Position) -> Result<(), RenderError> {
        let mut state = self.state.borrow_mut();
        if state.fail_moves {
            return Err(RenderError::MoveFailed {
                x: position.x,
                y: position.y,
                reason: "sink configured to fail".to_string(),
            });
        }
        if self.log_moves {
            info!("render: overlay at ({}, {})", position.x, position.y);
        }
        state.position = position;
        state.moves.push(position);
        Ok(())
    }

    fn overlay_position(&self) -> Result<Position, RenderError> {
        Ok(self.state.borrow().position)
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), RenderError> {
        self.state.borrow_mut().visible = visible;
        Ok(())
    }

    fn haptic_tick(&mut self) {
        self.state.borrow_mut().haptic_ticks += 1;
    }
}

/// Dispatcher that records actions instead of performing them
#[derive(Debug, Clone)]
pub struct MemoryDispatcher {
    performed: Rc<RefCell<Vec<NavigationAction>>>,
    available: Rc<RefCell<bool>>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self {
            performed: Rc::new(RefCell::new(Vec::new())),
            available: Rc::new(RefCell::new(true)),
        }
    }

    pub fn performed(&self) -> Vec<NavigationAction> {
        self.performed.borrow().clone()
    }

    /// Simulates the accessibility service going away
    pub fn set_available(&self, available: bool) {
        *self.available.borrow_mut() = available;
    }
}

impl Default for MemoryDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationDispatcher for MemoryDispatcher {
    fn perform_action(&mut self, action: NavigationAction) -> Result<(), DispatchError> {
        if !*self.available.borrow() {
            return Err(DispatchError::ServiceUnavailable);
        }
        info!("navigation: {:?}", action);
        self.performed.borrow_mut().push(action);
        Ok(())
    }
}
