//! Drag gesture state machine: `Idle → Dragging → Idle`.
//!
//! Pointer-down over a node records the pointer's offset from the layer
//! anchor. Every pointer-move places the layer at `pointer - offset`, with no
//! bounds. Pointer-up, pointer-cancel and leaving the surface all end the
//! gesture and keep the last position; there is no revert.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use crate::layer::LayerId;
use crate::transform::Point;

/// Gesture state carried between pointer events.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A layer follows the pointer.
    Dragging {
        /// Layer being moved.
        id: LayerId,
        /// Pointer position minus the layer anchor at pointer-down.
        offset: Point,
    },
}

/// Event that ends a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEnd {
    PointerUp,
    PointerCancel,
    PointerLeave,
}

/// Tracks one drag gesture at a time.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Begin dragging `id`, whose anchor is currently at `anchor`.
    pub fn pointer_down(&mut self, id: LayerId, pointer: Point, anchor: Point) {
        tracing::trace!(%id, "drag started");
        self.state = DragState::Dragging { id, offset: pointer.sub(anchor) };
    }

    /// Where the dragged layer belongs for a pointer at `pointer`. `None` while idle.
    #[must_use]
    pub fn pointer_move(&self, pointer: Point) -> Option<(&LayerId, Point)> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { id, offset } => Some((id, pointer.sub(*offset))),
        }
    }

    /// End the gesture. Returns the layer that was being dragged, if any.
    pub fn end(&mut self, reason: DragEnd) -> Option<LayerId> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Dragging { id, .. } => {
                tracing::trace!(%id, ?reason, "drag ended");
                Some(id)
            }
        }
    }
}
