use std::collections::BTreeMap;

use crate::{core::Point, transform::TransformState};

pub type PointerId = u64;

/// One interaction's transient state. Created at pointer-down, destroyed when
/// the pointers release; never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GesturePhase {
    Idle,
    Dragging {
        /// Start pointer position minus the offset at drag start. Moves
        /// position the offset absolutely against this anchor, so repeated
        /// moves cannot drift.
        anchor: Point,
    },
    Pinching {
        start_distance: f64,
        start_scale: f64,
    },
}

/// Input-agnostic gesture state machine.
///
/// Platform event wiring adapts raw mouse/touch events to
/// `pointer_down`/`pointer_move`/`pointer_up`/`wheel` primitives; this
/// machine is the single owner of drag/pinch bookkeeping and mutates the
/// [`TransformState`] it is handed. Every handler is a no-op unless
/// `editable` is set.
#[derive(Debug)]
pub struct GestureMachine {
    phase: GesturePhase,
    pointers: BTreeMap<PointerId, Point>,
}

impl Default for GestureMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureMachine {
    pub fn new() -> Self {
        Self {
            phase: GesturePhase::Idle,
            pointers: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn clear(&mut self) {
        self.phase = GesturePhase::Idle;
        self.pointers.clear();
    }

    pub fn pointer_down(
        &mut self,
        id: PointerId,
        pos: Point,
        transform: &mut TransformState,
        editable: bool,
    ) {
        if !editable {
            return;
        }
        self.pointers.insert(id, pos);

        match self.pointers.len() {
            1 => {
                self.phase = GesturePhase::Dragging {
                    anchor: pos - transform.offset,
                };
            }
            2 => {
                // A second finger mid-drag cancels the drag and starts a
                // fresh pinch baseline.
                self.phase = GesturePhase::Pinching {
                    start_distance: self.pair_distance(),
                    start_scale: transform.scale,
                };
            }
            _ => {}
        }
    }

    pub fn pointer_move(
        &mut self,
        id: PointerId,
        pos: Point,
        transform: &mut TransformState,
        editable: bool,
    ) {
        if !editable || !self.pointers.contains_key(&id) {
            return;
        }
        self.pointers.insert(id, pos);

        match self.phase {
            GesturePhase::Dragging { anchor } if self.pointers.len() == 1 => {
                transform.set_offset(pos - anchor);
            }
            GesturePhase::Pinching {
                start_distance,
                start_scale,
            } if self.pointers.len() == 2 => {
                let distance = self.pair_distance();
                if start_distance > 0.0 {
                    transform.zoom_pinch(start_scale, distance / start_distance);
                }
            }
            _ => {}
        }
    }

    /// Any release ends the interaction outright. The surviving pointer of a
    /// pinch is not promoted to a drag anchor; it must go down again.
    pub fn pointer_up(&mut self, id: PointerId) {
        self.pointers.remove(&id);
        self.phase = GesturePhase::Idle;
    }

    pub fn pointer_cancel(&mut self, id: PointerId) {
        self.pointer_up(id);
    }

    /// Desktop wheel zoom, stateless and independent of the pointer phases.
    /// Positive `delta_y` (wheel towards the user) zooms out.
    pub fn wheel(&mut self, delta_y: f64, transform: &mut TransformState, editable: bool) {
        if !editable || delta_y == 0.0 {
            return;
        }
        let notches = if delta_y > 0.0 { -1.0 } else { 1.0 };
        transform.zoom_step(notches);
    }

    fn pair_distance(&self) -> f64 {
        let mut it = self.pointers.values();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => (*b - *a).hypot(),
            _ => 0.0,
        }
    }
}
