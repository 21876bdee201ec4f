use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{error, info};

use dabtag_domain::{BatchConfig, BatchSummary, DomainError};

use crate::cancel::CancelToken;
use crate::pipeline::BatchOrchestrator;
use crate::progress::BatchEvent;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("a batch is already running")]
    AlreadyRunning,
    #[error("invalid batch configuration: {0}")]
    InvalidConfig(#[from] DomainError),
    #[error("source folder {0:?} is not a readable directory")]
    UnreadableFolder(PathBuf),
    #[error("failed to spawn batch worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("batch worker panicked")]
    WorkerPanicked,
}

/// Clears the single-flight flag when the worker exits, panics included.
struct ActiveRun(Arc<AtomicBool>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Starts batches on a worker thread, one at a time.
pub struct BatchRunner {
    orchestrator: Arc<BatchOrchestrator>,
    active: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(orchestrator: BatchOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn start(&self, config: BatchConfig) -> Result<RunHandle, RunnerError> {
        config.validate()?;
        if !config.source_folder.is_dir() {
            return Err(RunnerError::UnreadableFolder(config.source_folder.clone()));
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RunnerError::AlreadyRunning);
        }
        let active = ActiveRun(Arc::clone(&self.active));

        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let (mut events, receiver) = mpsc::channel();
        info!(folder = ?config.source_folder, "starting batch worker");
        let worker = thread::Builder::new()
            .name("dabtag-batch".into())
            .spawn(move || {
                let _active = active;
                orchestrator.run(&config, &mut events, &worker_cancel)
            })
            .map_err(RunnerError::Spawn)?;

        Ok(RunHandle {
            cancel,
            events: receiver,
            worker,
        })
    }
}

/// Control-side view of a running batch.
pub struct RunHandle {
    cancel: CancelToken,
    events: Receiver<BatchEvent>,
    worker: JoinHandle<BatchSummary>,
}

impl RunHandle {
    /// Asks the worker to stop before its next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Event stream; iteration ends once the worker is done.
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn wait(self) -> Result<BatchSummary, RunnerError> {
        self.worker.join().map_err(|_| {
            error!("batch worker panicked");
            RunnerError::WorkerPanicked
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{music_dir, FakeInference, FakeProbe, RecordingWriter};
    use dabtag_audio::{InferenceError, TagInference, WindowSpec};
    use dabtag_domain::{BatchStatus, OutputMode, RawScoreMatrix};
    use std::path::Path;
    use std::sync::Mutex;

    /// Holds every inference call until the test releases it.
    struct GatedInference {
        entered: Mutex<mpsc::Sender<()>>,
        gate: Mutex<Receiver<()>>,
        inner: FakeInference,
    }

    /// Returns the inference, the release side of its gate, and a receiver
    /// that fires each time a call reaches the gate.
    fn gated(inner: FakeInference) -> (GatedInference, mpsc::Sender<()>, Receiver<()>) {
        let (release, gate) = mpsc::channel();
        let (entered_tx, entered) = mpsc::channel();
        let inference = GatedInference {
            entered: Mutex::new(entered_tx),
            gate: Mutex::new(gate),
            inner,
        };
        (inference, release, entered)
    }

    impl TagInference for GatedInference {
        fn infer(&self, path: &Path, window: &WindowSpec) -> Result<RawScoreMatrix, InferenceError> {
            let _ = self.entered.lock().unwrap().send(());
            self.gate
                .lock()
                .unwrap()
                .recv()
                .map_err(|err| InferenceError::Other(err.to_string()))?;
            self.inner.infer(path, window)
        }
    }

    fn runner_with(inference: Arc<dyn TagInference>) -> BatchRunner {
        BatchRunner::new(
            BatchOrchestrator::new(inference)
                .with_probe(Arc::new(FakeProbe::new(30.0).with("short.mp3", 1.0)))
                .with_genre_writer(Arc::new(RecordingWriter::default())),
        )
    }

    #[test]
    fn runs_batch_on_worker_and_streams_events() {
        let dir = music_dir(&["a.mp3", "b.mp3", "short.mp3"]);
        let runner = runner_with(Arc::new(FakeInference::new(5)));
        let handle = runner
            .start(BatchConfig::new(dir.path(), OutputMode::TagAndReport))
            .unwrap();

        let events: Vec<BatchEvent> = handle.events().iter().collect();
        let summary = handle.wait().unwrap();

        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.skipped(), 1);
        assert!(summary.report_path.is_some());
        let done: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                BatchEvent::Progress { done, .. } => Some(*done),
                _ => None,
            })
            .collect();
        assert_eq!(done, vec![1, 2, 3]);
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Log(line)) if line.starts_with("All done tagging!")
        ));
        assert!(!runner.is_running());
    }

    #[test]
    fn rejects_second_start_while_running() {
        let dir = music_dir(&["a.mp3"]);
        let (inference, release, _entered) = gated(FakeInference::new(4));
        let runner = runner_with(Arc::new(inference));

        let first = runner
            .start(BatchConfig::new(dir.path(), OutputMode::ReportOnly))
            .unwrap();
        assert!(runner.is_running());
        let second = runner.start(BatchConfig::new(dir.path(), OutputMode::ReportOnly));
        assert!(matches!(second, Err(RunnerError::AlreadyRunning)));

        release.send(()).unwrap();
        let summary = first.wait().unwrap();
        assert_eq!(summary.succeeded(), 1);
        assert!(!runner.is_running());

        release.send(()).unwrap();
        let third = runner
            .start(BatchConfig::new(dir.path(), OutputMode::ReportOnly))
            .unwrap();
        assert_eq!(third.wait().unwrap().succeeded(), 1);
    }

    #[test]
    fn cancel_from_control_side_stops_batch() {
        let dir = music_dir(&["a.mp3", "b.mp3", "c.mp3"]);
        let (inference, release, entered) = gated(FakeInference::new(4));
        let runner = runner_with(Arc::new(inference));
        let handle = runner
            .start(BatchConfig::new(dir.path(), OutputMode::TagAndReport))
            .unwrap();

        // stop is pressed while the first file is held inside inference
        entered.recv().unwrap();
        handle.cancel();
        release.send(()).unwrap();
        let summary = handle.wait().unwrap();

        assert_eq!(summary.status, BatchStatus::Stopped);
        assert_eq!(summary.results.len(), 1);
        assert!(summary.results[0].is_success());
        assert!(summary.report_path.is_none());
        assert!(!dir.path().join("suno_tags.xlsx").exists());
        assert!(!runner.is_running());
    }

    fn write_wav(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..8_000 * seconds {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn tags_real_wav_files_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("long.wav"), 6);
        write_wav(&dir.path().join("blip.wav"), 1);
        let runner = BatchRunner::new(BatchOrchestrator::new(Arc::new(
            FakeInference::new(5).with(
                "long.wav",
                crate::fixtures::Script::Scores(vec![
                    vec![0.1, 0.9, 0.3, 0.0, 0.5],
                    vec![0.2, 0.6, 0.3, 0.1, 0.4],
                ]),
            ),
        )));

        let summary = runner
            .start(BatchConfig::new(dir.path(), OutputMode::TagAndReport))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(
            dabtag_audio::read_genre(&dir.path().join("long.wav")).unwrap(),
            Some("tag1, tag4, tag2".to_string())
        );
        let rows = dabtag_domain::read_report(summary.report_path.as_ref().unwrap()).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.file_name == "long.wav"));
        approx::assert_abs_diff_eq!(rows[0].score, 0.75, epsilon = 1e-4);
    }

    #[test]
    fn start_validates_config_and_folder() {
        let runner = runner_with(Arc::new(FakeInference::new(4)));
        let dir = music_dir(&[]);

        let bad_window =
            BatchConfig::new(dir.path(), OutputMode::TagOnly).with_window(-1.0, 0.5);
        assert!(matches!(
            runner.start(bad_window),
            Err(RunnerError::InvalidConfig(_))
        ));

        let missing = BatchConfig::new(dir.path().join("missing"), OutputMode::TagOnly);
        assert!(matches!(
            runner.start(missing),
            Err(RunnerError::UnreadableFolder(_))
        ));
        assert!(!runner.is_running());
    }
}
