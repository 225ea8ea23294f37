//! Progress tracking and callbacks for the iteration loop.
//!
//! Callbacks observe every completed iteration and may ask the loop to stop
//! at the next iteration boundary.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress information for one fluid iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Iterations completed in this session.
    pub iteration: usize,
    /// Iteration cap, if any.
    pub total_iterations: Option<usize>,
    /// Sum of squared differences between fixed and output.
    pub similarity: f64,
    /// Step scale after the iteration.
    pub fluid_delta: f64,
    /// Largest velocity magnitude before scaling.
    pub max_velocity: f64,
    /// Whether an operator stroke was applied.
    pub impulse_applied: bool,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Estimated remaining time.
    pub estimated_remaining: Option<Duration>,
    /// Additional metrics.
    pub metrics: Vec<(String, f64)>,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(iteration: usize, total_iterations: Option<usize>, similarity: f64, elapsed: Duration) -> Self {
        Self {
            iteration,
            total_iterations,
            similarity,
            fluid_delta: 0.0,
            max_velocity: 0.0,
            impulse_applied: false,
            elapsed,
            estimated_remaining: None,
            metrics: Vec::new(),
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_iterations
            .map(|total| (self.iteration as f64 / total as f64) * 100.0)
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if let Some(total) = self.total_iterations {
            if self.iteration > 0 {
                let avg_time_per_iter = self.elapsed.as_secs_f64() / self.iteration as f64;
                let remaining_iters = total.saturating_sub(self.iteration);
                self.estimated_remaining = Some(Duration::from_secs_f64(avg_time_per_iter * remaining_iters as f64));
            }
        }
    }

    /// Add a custom metric.
    pub fn add_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.push((name.into(), value));
    }
}

/// Progress callback trait for monitoring a session.
pub trait ProgressCallback: Send + Sync {
    /// Called after each iteration.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when a session starts.
    fn on_start(&self) {}

    /// Called when a session stops.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when an iteration fails.
    fn on_error(&self, _error: &str) {}

    /// Ask the loop to stop after the current iteration.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (iterations).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.impulse_applied
            || info.iteration % self.log_interval == 0
            || info.total_iterations == Some(info.iteration)
        {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "Iter {}/{} | SSD: {:.6} | delta: {:.3e} | vmax: {:.3e}{} | Elapsed: {:.2}s | ETA: {}",
                info.iteration,
                info.total_iterations
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                info.similarity,
                info.fluid_delta,
                info.max_velocity,
                if info.impulse_applied { " | impulse" } else { "" },
                info.elapsed.as_secs_f64(),
                remaining
            );

            for (name, value) in &info.metrics {
                tracing::info!("  {}: {:.6}", name, value);
            }
        }
    }

    fn on_start(&self) {
        tracing::info!("Registration started");
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Registration stopped after {} iterations in {:.2}s with SSD {:.6}",
            info.iteration,
            info.elapsed.as_secs_f64(),
            info.similarity
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Iteration failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        lock(&self.history).clone()
    }

    /// Similarity values in iteration order.
    pub fn similarities(&self) -> Vec<f64> {
        lock(&self.history).iter().map(|info| info.similarity).collect()
    }

    /// Clear the history.
    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        lock(&self.history).push(info.clone());
    }
}

#[derive(Debug)]
struct EarlyStoppingState {
    counter: usize,
    best: f64,
    stop: bool,
}

impl Default for EarlyStoppingState {
    fn default() -> Self {
        Self {
            counter: 0,
            best: f64::INFINITY,
            stop: false,
        }
    }
}

/// Stops the loop when the similarity stops improving.
#[derive(Debug, Clone)]
pub struct EarlyStoppingCallback {
    /// Minimum improvement to continue.
    pub min_improvement: f64,
    /// Number of iterations to wait for improvement.
    pub patience: usize,
    /// Stop once the similarity drops to this value.
    pub min_similarity: Option<f64>,
    state: Arc<Mutex<EarlyStoppingState>>,
}

impl EarlyStoppingCallback {
    /// Create a new early stopping callback.
    pub fn new(min_improvement: f64, patience: usize) -> Self {
        Self {
            min_improvement,
            patience,
            min_similarity: None,
            state: Arc::new(Mutex::new(EarlyStoppingState::default())),
        }
    }

    /// Set minimum similarity threshold.
    pub fn with_min_similarity(mut self, value: f64) -> Self {
        self.min_similarity = Some(value);
        self
    }

    /// Reset early stopping state.
    pub fn reset(&self) {
        *lock(&self.state) = EarlyStoppingState::default();
    }
}

impl ProgressCallback for EarlyStoppingCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        let mut state = lock(&self.state);

        if let Some(min) = self.min_similarity {
            if info.similarity <= min {
                state.stop = true;
                tracing::info!("Early stopping: SSD {} reached threshold {}", info.similarity, min);
                return;
            }
        }

        // Strokes legitimately raise the similarity for a while
        if info.impulse_applied {
            state.counter = 0;
            state.best = info.similarity;
            return;
        }

        if state.best - info.similarity > self.min_improvement {
            state.best = info.similarity;
            state.counter = 0;
        } else {
            state.counter += 1;
        }

        if state.counter >= self.patience {
            state.stop = true;
            tracing::info!(
                "Early stopping: no improvement for {} iterations (best SSD: {:.6}, current: {:.6})",
                self.patience,
                state.best,
                info.similarity
            );
        }
    }

    fn on_start(&self) {
        self.reset();
    }

    fn should_stop(&self) -> bool {
        lock(&self.state).stop
    }
}

/// Fans progress out to several callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Arc<Mutex<Option<Instant>>>,
    last: Arc<Mutex<Option<ProgressInfo>>>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Start tracking.
    pub fn start(&self) {
        *lock(&self.start_time) = Some(Instant::now());
        *lock(&self.last) = None;
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    /// Time since `start`.
    pub fn elapsed(&self) -> Duration {
        lock(&self.start_time)
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Report a completed iteration.
    pub fn update(&self, mut info: ProgressInfo) {
        info.elapsed = self.elapsed();
        info.calculate_remaining();

        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
        *lock(&self.last) = Some(info);
    }

    /// Whether any callback asked to stop.
    pub fn should_stop(&self) -> bool {
        self.callbacks.iter().any(|c| c.should_stop())
    }

    /// Report the end of a session.
    pub fn complete(&self) {
        let info = lock(&self.last)
            .clone()
            .unwrap_or_else(|| ProgressInfo::new(0, None, 0.0, Duration::ZERO));
        let info = ProgressInfo {
            elapsed: self.elapsed(),
            ..info
        };
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
