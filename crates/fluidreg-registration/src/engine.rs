//! Session lifecycle and the iteration scheduler.
//!
//! The engine owns the session behind a mutex. Every iteration body runs
//! with the lock held, so overlapping `step` calls are serialised no matter
//! who triggers them. [`IterationLoop`] drives `step` from a dedicated
//! thread, waiting the configured interval between iterations on a
//! cancellation channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use burn::tensor::backend::Backend;
use fluidreg_core::spatial::Point;
use fluidreg_core::{probe_device, HostVolume, VolumetricField};

use crate::config::FluidConfig;
use crate::error::{RegistrationError, Result};
use crate::fluid::{fluid_update, FluidParams, StepReport};
use crate::interaction::{GestureTracker, InteractionEvent, InteractionQueue};
use crate::mapping::{AffineIndexMap, IndexMapper};
use crate::progress::{ProgressInfo, ProgressTracker};
use crate::session::SessionContext;

/// External display collaborator.
pub trait OutputSink<B: Backend>: Send + Sync {
    /// Receive the current output estimate.
    fn publish(&self, output: &VolumetricField<B>) -> Result<()>;

    /// Ask the host to redraw, with the strokes still waiting to be applied.
    fn request_redraw(&self, _pending: &[InteractionEvent]) {}
}

/// Sink that discards every output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<B: Backend> OutputSink<B> for NullSink {
    fn publish(&self, _output: &VolumetricField<B>) -> Result<()> {
        Ok(())
    }
}

/// Sink that writes each output into a shared host volume.
#[derive(Debug, Clone)]
pub struct HostVolumeSink {
    target: Arc<Mutex<HostVolume>>,
}

impl HostVolumeSink {
    pub fn new(target: HostVolume) -> Self {
        Self {
            target: Arc::new(Mutex::new(target)),
        }
    }

    /// Copy of the last published volume.
    pub fn snapshot(&self) -> HostVolume {
        self.target.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<B: Backend> OutputSink<B> for HostVolumeSink {
    fn publish(&self, output: &VolumetricField<B>) -> Result<()> {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        output.emit(&mut target)?;
        Ok(())
    }
}

/// Result of one scheduled step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// The iteration's report, `None` when the iteration failed.
    pub report: Option<StepReport>,
    /// Whether another iteration should be scheduled.
    pub continue_running: bool,
}

/// Steered fluid registration engine.
pub struct RegistrationEngine<B: Backend> {
    config: FluidConfig,
    params: FluidParams,
    device: B::Device,
    queue: InteractionQueue,
    mapper: Mutex<Arc<dyn IndexMapper>>,
    sink: Arc<dyn OutputSink<B>>,
    progress: ProgressTracker,
    session: Mutex<Option<SessionContext<B>>>,
    running: AtomicBool,
}

impl<B: Backend> std::fmt::Debug for RegistrationEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationEngine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl<B: Backend> RegistrationEngine<B> {
    /// Create an idle engine.
    pub fn new(
        config: FluidConfig,
        device: B::Device,
        mapper: Arc<dyn IndexMapper>,
        sink: Arc<dyn OutputSink<B>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            params: FluidParams::from(&config),
            queue: InteractionQueue::new(config.backlog),
            config,
            device,
            mapper: Mutex::new(mapper),
            sink,
            progress: ProgressTracker::new(),
            session: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Attach progress callbacks.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Producer handle for operator strokes.
    pub fn queue(&self) -> InteractionQueue {
        self.queue.clone()
    }

    /// Gesture tracker feeding this engine's queue.
    pub fn gesture_tracker(&self) -> GestureTracker {
        GestureTracker::new(self.queue.clone(), self.config.grab_threshold)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mapper currently used for strokes and grab lookups.
    pub fn mapper(&self) -> Arc<dyn IndexMapper> {
        Arc::clone(&self.mapper.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the world to moving-index mapper. Takes effect at the next
    /// iteration boundary.
    pub fn set_mapper(&self, mapper: Arc<dyn IndexMapper>) {
        let _session = self.lock_session();
        *self.mapper.lock().unwrap_or_else(PoisonError::into_inner) = mapper;
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<SessionContext<B>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session. Fails while a session is running.
    pub fn start(&self, fixed: VolumetricField<B>, moving: VolumetricField<B>) -> Result<()> {
        self.start_with_mapper(fixed, moving, None)
    }

    fn start_with_mapper(
        &self,
        fixed: VolumetricField<B>,
        moving: VolumetricField<B>,
        mapper: Option<Arc<dyn IndexMapper>>,
    ) -> Result<()> {
        let mut guard = self.lock_session();
        if self.is_running() {
            return Err(RegistrationError::session_state("a session is already running"));
        }
        probe_device::<B>(&self.device).map_err(RegistrationError::from_field)?;

        let session = SessionContext::new(fixed, moving, self.config.normalize_inputs)?;
        self.sink.publish(session.output())?;
        tracing::info!(
            fixed = ?session.fixed().shape(),
            moving = ?session.moving().shape(),
            viscosity = self.params.viscosity,
            "registration session started"
        );

        if let Some(mapper) = mapper {
            *self.mapper.lock().unwrap_or_else(PoisonError::into_inner) = mapper;
        }
        *guard = Some(session);
        self.running.store(true, Ordering::SeqCst);
        self.progress.start();
        Ok(())
    }

    /// Ingest host volumes and start a session.
    ///
    /// Strokes are mapped through the moving volume's own index to world
    /// transform from then on.
    pub fn start_from_host(&self, fixed: &HostVolume, moving: &HostVolume) -> Result<()> {
        let mapper = AffineIndexMap::for_volume(moving)?;
        let fixed = VolumetricField::ingest(fixed, &self.device)?;
        let moving = VolumetricField::ingest(moving, &self.device)?;
        self.start_with_mapper(fixed, moving, Some(Arc::new(mapper)))
    }

    /// Swap in a new moving volume between iterations, together with its
    /// stroke mapping. The output is re-warped through the current deformation.
    pub fn set_moving_from_host(&self, moving: &HostVolume) -> Result<()> {
        let mapper = AffineIndexMap::for_volume(moving)?;
        let field = VolumetricField::ingest(moving, &self.device)?;
        let mut guard = self.lock_session();
        let session = guard
            .as_mut()
            .ok_or_else(|| RegistrationError::session_state("no session to update"))?;
        session.set_moving(field)?;
        *self.mapper.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(mapper);
        self.sink.publish(session.output())?;
        Ok(())
    }

    /// Run one iteration under the session lock.
    ///
    /// Iteration failures are logged and reported to the progress
    /// callbacks; the session keeps its previous state and the loop goes on.
    pub fn step(&self) -> Result<StepOutcome> {
        let mut guard = self.lock_session();
        if !self.is_running() {
            return Err(RegistrationError::session_state("no session is running"));
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| RegistrationError::session_state("no session is running"))?;

        let mapper = self.mapper();
        let result = fluid_update(session, &self.queue, mapper.as_ref(), &self.params);
        Ok(self.conclude(session, result))
    }

    /// Publish, redraw and report after an iteration body. The redraw is
    /// requested whether or not the iteration succeeded.
    fn conclude(&self, session: &SessionContext<B>, result: Result<StepReport>) -> StepOutcome {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "fluid iteration failed");
                self.sink.request_redraw(&self.queue.pending());
                self.progress.error(&e.to_string());
                return StepOutcome {
                    report: None,
                    continue_running: self.is_running(),
                };
            }
        };

        if report.updated {
            if let Err(e) = self.sink.publish(session.output()) {
                tracing::warn!(error = %e, "publishing output failed");
            }
        }
        self.sink.request_redraw(&self.queue.pending());

        let mut info = ProgressInfo::new(report.iteration, self.config.max_iterations, report.similarity, Default::default());
        info.fluid_delta = report.fluid_delta;
        info.max_velocity = report.max_velocity;
        info.impulse_applied = report.impulse.is_some();
        info.add_metric("mse", report.similarity / session.fixed().geometry().len() as f64);
        self.progress.update(info);

        let below_cap = self
            .config
            .max_iterations
            .map_or(true, |cap| report.iteration < cap);
        let continue_running = self.is_running() && below_cap && !self.progress.should_stop();
        if !continue_running && self.is_running() {
            tracing::info!(iteration = report.iteration, "iteration loop finished");
            self.running.store(false, Ordering::SeqCst);
            self.progress.complete();
        }

        StepOutcome {
            report: Some(report),
            continue_running,
        }
    }

    /// Stop the session and discard it. Waits for an in-flight iteration.
    /// Strokes still queued are dropped with the session.
    ///
    /// Returns false when no session existed.
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let session = {
            let mut guard = self.lock_session();
            self.queue.clear();
            guard.take()
        };
        if was_running {
            self.progress.complete();
        }
        if session.is_some() {
            tracing::info!("registration session stopped");
        }
        session.is_some()
    }

    /// Read access to the session, if one exists.
    pub fn with_session<R>(&self, f: impl FnOnce(&SessionContext<B>) -> R) -> Option<R> {
        self.lock_session().as_ref().map(f)
    }

    /// Mutable access to the session between iterations.
    pub fn with_session_mut<R>(&self, f: impl FnOnce(&mut SessionContext<B>) -> R) -> Option<R> {
        self.lock_session().as_mut().map(f)
    }

    /// Grab strength of the output at a world position.
    pub fn grab_magnitude(&self, world: &Point<3>) -> Result<f32> {
        let index = self.mapper().world_to_index(world)?;
        self.with_session(|s| s.grab_magnitude(&index))
            .unwrap_or(Ok(0.0))
    }
}

impl<B: Backend> RegistrationEngine<B> {
    /// Drive `step` from a dedicated thread until cancelled or finished.
    pub fn spawn(engine: &Arc<Self>) -> Result<IterationLoop> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let interval = engine.config.interval;
        let engine = Arc::clone(engine);

        let handle = thread::Builder::new()
            .name("fluidreg-iterations".into())
            .spawn(move || {
                let mut steps = 0usize;
                loop {
                    match engine.step() {
                        Ok(outcome) => {
                            steps += 1;
                            if !outcome.continue_running {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "iteration loop exiting");
                            break;
                        }
                    }
                    match cancelled.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                steps
            })
            .map_err(|e| RegistrationError::session_state(format!("cannot spawn iteration thread: {}", e)))?;

        Ok(IterationLoop {
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }
}

/// Handle to a running iteration thread.
///
/// Dropping the handle cancels the loop and waits for it.
#[derive(Debug)]
pub struct IterationLoop {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl IterationLoop {
    /// Cancel and join. The in-flight iteration completes first.
    ///
    /// Returns the number of steps the loop ran.
    pub fn stop(mut self) -> usize {
        self.shutdown()
    }

    /// Wait for the loop to end on its own.
    pub fn join(mut self) -> usize {
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    fn shutdown(&mut self) -> usize {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for IterationLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use burn_ndarray::NdArray;
    use fluidreg_core::FieldGeometry;
    use nalgebra::Matrix4;

    type B = NdArray<f32>;

    #[derive(Default)]
    struct RedrawCounter {
        redraws: AtomicUsize,
    }

    impl OutputSink<B> for RedrawCounter {
        fn publish(&self, _output: &VolumetricField<B>) -> Result<()> {
            Ok(())
        }

        fn request_redraw(&self, _pending: &[InteractionEvent]) {
            self.redraws.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ramp(scale: f32) -> VolumetricField<B> {
        let geometry = FieldGeometry::with_shape([4, 4, 4]).unwrap();
        let samples = (0..geometry.len()).map(|i| scale * i as f32).collect();
        VolumetricField::from_samples(samples, geometry, &Default::default()).unwrap()
    }

    #[test]
    fn test_failed_iteration_still_requests_redraw() {
        let sink = Arc::new(RedrawCounter::default());
        let mapper = Arc::new(AffineIndexMap::new(Matrix4::identity()));
        let engine = RegistrationEngine::<B>::new(FluidConfig::new(), Default::default(), mapper, sink.clone()).unwrap();
        engine.start(ramp(1.0), ramp(2.0)).unwrap();

        let guard = engine.lock_session();
        let session = guard.as_ref().unwrap();
        let outcome = engine.conclude(session, Err(RegistrationError::session_state("iteration failed")));
        drop(guard);

        assert!(outcome.report.is_none());
        assert!(outcome.continue_running);
        assert_eq!(sink.redraws.load(Ordering::SeqCst), 1);
        assert_eq!(engine.with_session(|s| s.iteration()), Some(0));
    }
}
