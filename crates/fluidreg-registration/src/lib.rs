//! Interactive steered viscous-fluid deformable registration.
//!
//! A [`RegistrationEngine`] warps a moving volume onto a fixed one by
//! repeated fluid iterations, each optionally steered by one operator
//! stroke from the [`InteractionQueue`].

pub mod config;
pub mod engine;
pub mod error;
pub mod fluid;
pub mod interaction;
pub mod mapping;
pub mod metric;
pub mod progress;
pub mod session;
pub mod splat;

pub use config::FluidConfig;
pub use engine::{HostVolumeSink, IterationLoop, NullSink, OutputSink, RegistrationEngine, StepOutcome};
pub use error::{RegistrationError, Result};
pub use fluid::{fluid_update, FluidParams, StepReport};
pub use interaction::{BacklogPolicy, GestureState, GestureTracker, InteractionEvent, InteractionQueue, ViewportId};
pub use mapping::{AffineIndexMap, IndexMapper};
pub use progress::{ConsoleProgressCallback, EarlyStoppingCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use session::SessionContext;
