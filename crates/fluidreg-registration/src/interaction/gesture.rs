//! Viewport input to stroke events.
//!
//! A stroke may only start on a voxel with visible structure: the
//! normalised gradient magnitude of the current output under the cursor must
//! exceed the grab threshold. Presses elsewhere are rejected for the whole
//! drag.

use std::collections::HashSet;

use fluidreg_core::spatial::Point;

use super::event::{InteractionEvent, ViewportId};
use super::queue::InteractionQueue;

/// Interaction state of the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    /// Pointer outside every tracked viewport.
    Idle,
    /// Pointer inside a viewport, no button held.
    Interacting,
    /// A stroke is being drawn.
    Dragging {
        viewport: ViewportId,
        start_pixel: [f64; 2],
        start_world: Point<3>,
    },
    /// Button held after a press on a flat region.
    Rejected,
}

/// Turns enter/leave/press/release input into queued strokes.
#[derive(Debug)]
pub struct GestureTracker {
    state: GestureState,
    queue: InteractionQueue,
    grab_threshold: f32,
    last_hovered: f32,
    interactive: HashSet<ViewportId>,
}

impl GestureTracker {
    /// Tracker feeding `queue`. Every viewport accepts strokes.
    pub fn new(queue: InteractionQueue, grab_threshold: f32) -> Self {
        Self {
            state: GestureState::Idle,
            queue,
            grab_threshold,
            last_hovered: 0.0,
            interactive: HashSet::new(),
        }
    }

    /// Restrict strokes to the given viewports.
    pub fn with_interactive_viewports(mut self, viewports: impl IntoIterator<Item = ViewportId>) -> Self {
        self.interactive = viewports.into_iter().collect();
        self
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    fn accepts(&self, viewport: ViewportId) -> bool {
        self.interactive.is_empty() || self.interactive.contains(&viewport)
    }

    /// Pointer entered a viewport.
    pub fn enter(&mut self) {
        self.state = GestureState::Interacting;
    }

    /// Pointer left the viewport. Any stroke in progress is abandoned.
    pub fn leave(&mut self) {
        if let GestureState::Dragging { viewport, .. } = &self.state {
            tracing::debug!(viewport = viewport.0, "stroke abandoned on leave");
        }
        self.state = GestureState::Idle;
    }

    /// Record the structure strength under the hovering cursor.
    ///
    /// Returns whether a press here would start a stroke, for cursor feedback.
    pub fn hover(&mut self, viewport: ViewportId, grab_magnitude: f32) -> bool {
        if self.state == GestureState::Interacting {
            self.last_hovered = grab_magnitude;
        }
        self.accepts(viewport) && grab_magnitude > self.grab_threshold
    }

    /// Button pressed. Returns true when a stroke starts.
    pub fn press(&mut self, viewport: ViewportId, pixel: [f64; 2], world: Point<3>) -> bool {
        if self.state != GestureState::Interacting {
            return false;
        }
        if self.accepts(viewport) && self.last_hovered > self.grab_threshold {
            self.state = GestureState::Dragging {
                viewport,
                start_pixel: pixel,
                start_world: world,
            };
            true
        } else {
            tracing::debug!(viewport = viewport.0, magnitude = self.last_hovered, "press rejected on flat region");
            self.state = GestureState::Rejected;
            false
        }
    }

    /// Button released. A completed stroke is queued and returned.
    pub fn release(&mut self, pixel: [f64; 2], world: Point<3>) -> Option<InteractionEvent> {
        match std::mem::replace(&mut self.state, GestureState::Interacting) {
            GestureState::Dragging {
                viewport,
                start_pixel,
                start_world,
            } => {
                let event = InteractionEvent {
                    timestamp: self.queue.next_timestamp(),
                    viewport,
                    start_pixel,
                    end_pixel: pixel,
                    start_world,
                    end_world: world,
                };
                self.queue.push(event.clone());
                tracing::debug!(timestamp = event.timestamp, pixels = event.pixel_length(), "stroke queued");
                Some(event)
            }
            GestureState::Rejected | GestureState::Interacting => None,
            GestureState::Idle => {
                self.state = GestureState::Idle;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (GestureTracker, InteractionQueue) {
        let queue = InteractionQueue::default();
        (GestureTracker::new(queue.clone(), 0.01), queue)
    }

    #[test]
    fn test_full_stroke_emits_one_event() {
        let (mut g, queue) = tracker();
        g.enter();
        assert!(g.hover(ViewportId(3), 0.5));
        assert!(g.press(ViewportId(3), [1.0, 1.0], Point::new([0.0, 0.0, 0.0])));
        assert!(matches!(g.state(), GestureState::Dragging { .. }));

        let event = g.release([4.0, 5.0], Point::new([3.0, 4.0, 0.0])).unwrap();
        assert_eq!(event.viewport, ViewportId(3));
        assert_eq!(event.end_pixel, [4.0, 5.0]);
        assert_eq!(g.state(), &GestureState::Interacting);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_flat_region_press_is_rejected() {
        let (mut g, queue) = tracker();
        g.enter();
        assert!(!g.hover(ViewportId(0), 0.001));
        assert!(!g.press(ViewportId(0), [0.0, 0.0], Point::origin()));
        assert_eq!(g.state(), &GestureState::Rejected);
        assert!(g.release([2.0, 2.0], Point::origin()).is_none());
        assert_eq!(g.state(), &GestureState::Interacting);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_leave_abandons_stroke() {
        let (mut g, queue) = tracker();
        g.enter();
        g.hover(ViewportId(0), 1.0);
        g.press(ViewportId(0), [0.0, 0.0], Point::origin());
        g.leave();
        assert_eq!(g.state(), &GestureState::Idle);
        assert!(g.release([1.0, 1.0], Point::origin()).is_none());
        assert_eq!(g.state(), &GestureState::Idle);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_press_outside_interactive_viewports() {
        let queue = InteractionQueue::default();
        let mut g = GestureTracker::new(queue, 0.01).with_interactive_viewports([ViewportId(3)]);
        g.enter();
        g.hover(ViewportId(0), 1.0);
        assert!(!g.press(ViewportId(0), [0.0, 0.0], Point::origin()));
        assert_eq!(g.state(), &GestureState::Rejected);
    }

    #[test]
    fn test_press_while_idle_is_ignored() {
        let (mut g, _) = tracker();
        assert!(!g.press(ViewportId(0), [0.0, 0.0], Point::origin()));
        assert_eq!(g.state(), &GestureState::Idle);
    }
}
