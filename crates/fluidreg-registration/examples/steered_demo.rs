//! Steered fluid registration on synthetic volumes.
//!
//! Builds a fixed blob and a moving copy shifted along one axis, runs the
//! iteration loop on the CPU backend, injects one operator stroke halfway
//! through and logs the similarity after every iteration.
//!
//! Usage:
//!   cargo run --example steered_demo

use std::sync::Arc;
use std::time::Duration;

use burn_ndarray::NdArray;
use fluidreg_core::field::HostVolume;
use fluidreg_core::spatial::Point;
use fluidreg_registration::{
    AffineIndexMap, ConsoleProgressCallback, FluidConfig, HistoryCallback, HostVolumeSink, ProgressTracker,
    RegistrationEngine, ViewportId,
};

type Backend = NdArray<f32>;

const SIZE: usize = 24;

fn blob_volume(center: [f32; 3], radius: f32) -> HostVolume {
    let mut scalars = Vec::with_capacity(SIZE * SIZE * SIZE);
    for z in 0..SIZE {
        for y in 0..SIZE {
            for x in 0..SIZE {
                let d2 = (x as f32 - center[0]).powi(2) + (y as f32 - center[1]).powi(2) + (z as f32 - center[2]).powi(2);
                scalars.push(1000.0 * (-d2 / (2.0 * radius * radius)).exp());
            }
        }
    }
    HostVolume::new([SIZE; 3], scalars).with_spacing_origin([1.0; 3], [0.0; 3])
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let fixed = blob_volume([11.5, 11.5, 11.5], 4.0);
    let moving = blob_volume([13.0, 11.5, 11.5], 4.0);

    let config = FluidConfig::new()
        .with_interval(Duration::from_millis(50))
        .with_max_iterations(40);

    let history = Arc::new(HistoryCallback::new());
    let mut progress = ProgressTracker::new();
    progress.add_callback(Arc::new(ConsoleProgressCallback::new(5)));
    progress.add_callback(history.clone());

    let mapper = Arc::new(AffineIndexMap::for_volume(&moving)?);
    let sink = Arc::new(HostVolumeSink::new(HostVolume::new([SIZE; 3], Vec::new())));
    let engine = Arc::new(
        RegistrationEngine::<Backend>::new(config, Default::default(), mapper, sink.clone())?.with_progress(progress),
    );

    engine.start_from_host(&fixed, &moving)?;
    let iterations = RegistrationEngine::spawn(&engine)?;

    // Let the image force work for a while, then pull the blob edge by hand
    std::thread::sleep(Duration::from_millis(500));
    let start = Point::new([16.0, 11.5, 11.5]);
    let end = Point::new([14.5, 11.5, 11.5]);
    let mut gesture = engine.gesture_tracker();
    gesture.enter();
    let magnitude = engine.grab_magnitude(&start)?;
    if gesture.hover(ViewportId(3), magnitude) && gesture.press(ViewportId(3), [160.0, 115.0], start) {
        gesture.release([145.0, 115.0], end);
        tracing::info!(magnitude, "stroke queued");
    } else {
        tracing::warn!(magnitude, "stroke rejected: flat region");
    }
    gesture.leave();

    let steps = iterations.join();
    engine.stop();

    let similarities = history.similarities();
    if let (Some(first), Some(last)) = (similarities.first(), similarities.last()) {
        tracing::info!(steps, first, last, "finished");
    }
    let output = sink.snapshot();
    let peak = output.scalars.iter().cloned().fold(f32::MIN, f32::max);
    tracing::info!(peak, voxels = output.scalars.len(), "last published output");

    Ok(())
}
