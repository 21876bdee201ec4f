use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use dabtag_audio::{
    DurationProbe, GenreWriter, LoftyGenreWriter, SymphoniaProbe, TagInference, WindowSpec,
};
use dabtag_domain::{
    BatchConfig, BatchSummary, DomainError, FailureReason, RankedTagList, ReportExporter,
    SkipReason, TrackCandidate, TrackResult, XlsxReportExporter, TOP_TAGS,
};

use crate::aggregate::WindowAggregator;
use crate::cancel::CancelToken;
use crate::progress::{estimate_remaining, format_clock, format_eta, format_hms, BatchObserver};
use crate::scan::enumerate_tracks;

/// Tracks shorter than this are never sent to the model.
pub const MIN_TRACK_SECONDS: f64 = 3.0;

pub fn skip_reason(duration: f64, window_seconds: f64) -> Option<SkipReason> {
    if duration < MIN_TRACK_SECONDS {
        Some(SkipReason::TooShort { duration })
    } else if duration < window_seconds {
        Some(SkipReason::ShorterThanWindow {
            duration,
            window: window_seconds,
        })
    } else {
        None
    }
}

fn failure_from_aggregate(err: DomainError) -> FailureReason {
    match err {
        DomainError::ShapeMismatch { tags, width } => FailureReason::ShapeMismatch { tags, width },
        other => FailureReason::Inference(other.to_string()),
    }
}

fn ranked_lines(tags: &RankedTagList) -> String {
    tags.iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if index < TOP_TAGS { '*' } else { '-' };
            format!("{marker} {} ({:.2})", entry.tag, entry.score)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drives inference, aggregation and the output sinks over one folder.
pub struct BatchOrchestrator {
    inference: Arc<dyn TagInference>,
    probe: Arc<dyn DurationProbe>,
    genre_writer: Arc<dyn GenreWriter>,
    exporter: Arc<dyn ReportExporter>,
    aggregator: WindowAggregator,
}

impl BatchOrchestrator {
    pub fn new(inference: Arc<dyn TagInference>) -> Self {
        Self {
            inference,
            probe: Arc::new(SymphoniaProbe),
            genre_writer: Arc::new(LoftyGenreWriter),
            exporter: Arc::new(XlsxReportExporter::default()),
            aggregator: WindowAggregator,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_genre_writer(mut self, genre_writer: Arc<dyn GenreWriter>) -> Self {
        self.genre_writer = genre_writer;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn ReportExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Runs the batch to completion or until `cancel` is observed between files.
    #[instrument(skip_all, fields(folder = %config.source_folder.display(), mode = ?config.mode))]
    pub fn run(
        &self,
        config: &BatchConfig,
        observer: &mut dyn BatchObserver,
        cancel: &CancelToken,
    ) -> BatchSummary {
        let started = Instant::now();
        let tracks = enumerate_tracks(config);
        let total = tracks.len();
        let window = WindowSpec::from_config(config);
        info!(total, "starting batch");

        let mut results = Vec::with_capacity(total);
        for (index, track) in tracks.iter().enumerate() {
            if cancel.is_cancelled() {
                return stopped(started, total, results, observer);
            }

            observer.on_log(&format!(
                "[{}/{}] Tagging: {}",
                index + 1,
                total,
                track.file_name()
            ));
            results.push(self.process_track(track, config, &window, observer, cancel));

            let done = index + 1;
            let remaining = estimate_remaining(started.elapsed(), done, total);
            observer.on_progress(done, total, &format_eta(remaining));
        }

        // a stop seen during the last file still ends the run as stopped
        if cancel.is_cancelled() {
            return stopped(started, total, results, observer);
        }

        let report_path = if config.mode.writes_report() {
            self.export_report(config, &results, observer)
        } else {
            None
        };

        let elapsed = started.elapsed();
        observer.on_log(&format!("All done tagging! Total time: {}", format_hms(elapsed)));
        let summary = BatchSummary::completed(total, results, elapsed, report_path);
        info!(
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "batch finished"
        );
        summary
    }

    fn process_track(
        &self,
        track: &TrackCandidate,
        config: &BatchConfig,
        window: &WindowSpec,
        observer: &mut dyn BatchObserver,
        cancel: &CancelToken,
    ) -> TrackResult {
        let file_name = track.file_name();
        let duration = match self.probe.duration(track.path()) {
            Ok(duration) => duration,
            Err(err) => {
                return failed(track, FailureReason::Unreadable(format!("{err:#}")), observer)
            }
        };

        if let Some(reason) = skip_reason(duration, config.window_seconds) {
            debug!(file = %file_name, %reason, "skipping track");
            observer.on_log(&format!("Skipping {file_name}: {reason}"));
            return TrackResult::skipped(track, reason);
        }

        observer.on_log(&format!(
            "Using input window: {}s with {}% overlap",
            window.length_seconds,
            config.overlap_percent()
        ));
        let track_started = Instant::now();
        let matrix = match self.inference.infer(track.path(), window) {
            Ok(matrix) => matrix,
            Err(err) => return failed(track, FailureReason::from(err), observer),
        };
        let windows = matrix.num_windows();
        observer.on_log(&format!(
            "Time spent tagging this track: {:.2}s",
            track_started.elapsed().as_secs_f64()
        ));
        observer.on_log(&format!(
            "Processed with {windows} overlapping windows of {:.1}s each (track length: {duration:.1}s)",
            window.length_seconds
        ));

        // Cosmetic per-window ticks; the aggregate is computed once below.
        for tick in 1..=windows {
            if cancel.is_cancelled() {
                break;
            }
            observer.on_track_progress(tick, windows);
        }

        let tags = match self.aggregator.aggregate(&matrix, config.top_tags_only) {
            Ok(tags) => tags,
            Err(err) => return failed(track, failure_from_aggregate(err), observer),
        };
        observer.on_log(&ranked_lines(&tags));

        let result = TrackResult::success(track, tags);
        if !config.mode.writes_metadata() {
            return result;
        }
        let genres = result.tags.tag_names(TOP_TAGS);
        match self.genre_writer.write_genre(track.path(), &genres) {
            Ok(genre) => {
                observer.on_log(&format!("Genre updated: {genre}"));
                result
            }
            Err(err) => {
                warn!(file = %file_name, %err, "genre write failed");
                observer.on_log(&format!("Error writing genre to {file_name}: {err}"));
                result.with_genre_error(FailureReason::MetadataWrite(err.to_string()))
            }
        }
    }

    fn export_report(
        &self,
        config: &BatchConfig,
        results: &[TrackResult],
        observer: &mut dyn BatchObserver,
    ) -> Option<PathBuf> {
        let tagged: Vec<&TrackResult> = results.iter().filter(|result| result.is_success()).collect();
        if tagged.is_empty() {
            observer.on_log("No tagged tracks, report not written");
            return None;
        }
        match self.exporter.export(config.report_folder(), &tagged) {
            Ok(path) => {
                observer.on_log(&format!("Report saved to {}", path.display()));
                Some(path)
            }
            Err(err) => {
                error!(%err, "report export failed");
                observer.on_log(&format!("Failed to export report: {err}"));
                None
            }
        }
    }
}

fn stopped(
    started: Instant,
    total: usize,
    results: Vec<TrackResult>,
    observer: &mut dyn BatchObserver,
) -> BatchSummary {
    let elapsed = started.elapsed();
    observer.on_log(&format!(
        "Stopped. Total time spent: {}",
        format_clock(elapsed)
    ));
    info!(processed = results.len(), total, "batch stopped");
    BatchSummary::stopped(total, results, elapsed)
}

fn failed(
    track: &TrackCandidate,
    reason: FailureReason,
    observer: &mut dyn BatchObserver,
) -> TrackResult {
    let file_name = track.file_name();
    warn!(file = %file_name, %reason, "track failed");
    observer.on_log(&format!("Error tagging {file_name}: {reason}"));
    TrackResult::failed(track, reason)
}
