pub mod aggregate;
pub mod cancel;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod scan;

#[cfg(test)]
mod fixtures;

pub use aggregate::WindowAggregator;
pub use cancel::CancelToken;
pub use pipeline::{skip_reason, BatchOrchestrator, MIN_TRACK_SECONDS};
pub use progress::{BatchEvent, BatchObserver};
pub use runner::{BatchRunner, RunHandle, RunnerError};
pub use scan::enumerate_tracks;
