use fluidreg_core::spatial::{Point, Vector};
use serde::{Deserialize, Serialize};

/// Identifies the view a stroke was drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportId(pub u32);

/// One completed drag stroke. Consumed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Creation order across all producers.
    pub timestamp: u64,
    pub viewport: ViewportId,
    pub start_pixel: [f64; 2],
    pub end_pixel: [f64; 2],
    pub start_world: Point<3>,
    pub end_world: Point<3>,
}

impl InteractionEvent {
    /// World-space drag vector, start to end.
    pub fn world_drag(&self) -> Vector<3> {
        self.end_world - self.start_world
    }

    /// Stroke length in pixels.
    pub fn pixel_length(&self) -> f64 {
        let dx = self.end_pixel[0] - self.start_pixel[0];
        let dy = self.end_pixel[1] - self.start_pixel[1];
        (dx * dx + dy * dy).sqrt()
    }
}
