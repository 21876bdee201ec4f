use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dabtag_audio::CommandInference;
use dabtag_domain::{BatchConfig, OutputMode, DEFAULT_MODEL, DEFAULT_WINDOW_SECONDS};
use dabtag_pipeline::{BatchEvent, BatchOrchestrator, BatchRunner};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Tag,
    Report,
    Both,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Tag => OutputMode::TagOnly,
            ModeArg::Report => OutputMode::ReportOnly,
            ModeArg::Both => OutputMode::TagAndReport,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Tag a folder of tracks with their top genres", long_about = None)]
struct Cli {
    /// Folder with the audio files to tag
    #[arg(required_unless_present = "config")]
    folder: Option<PathBuf>,
    /// JSON batch configuration; replaces the folder and tuning flags
    #[arg(long, conflicts_with = "folder")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "both")]
    mode: ModeArg,
    /// Model input window in seconds
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECONDS)]
    window: f64,
    /// Window overlap, 0-99
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..100))]
    overlap_percent: u8,
    /// Keep only the top three tags per track
    #[arg(long)]
    top_only: bool,
    /// Where suno_tags.xlsx is written; defaults to the source folder
    #[arg(long)]
    report_dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    /// Descend into subfolders
    #[arg(long)]
    recursive: bool,
    /// Tagger executable that prints window scores as JSON
    #[arg(long, default_value = "musicnn-tagger")]
    inference: PathBuf,
    /// Extra argument passed to the tagger before the generated ones
    #[arg(long = "inference-arg", allow_hyphen_values = true)]
    inference_args: Vec<String>,
    /// Print the batch summary as JSON when done
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn batch_config(&self) -> anyhow::Result<BatchConfig> {
        if let Some(path) = &self.config {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            return BatchConfig::from_json(&data)
                .with_context(|| format!("parsing config {}", path.display()));
        }
        let folder = self
            .folder
            .clone()
            .context("a source folder or --config is required")?;
        let mut config = BatchConfig::new(folder, self.mode.into())
            .with_window(self.window, f64::from(self.overlap_percent) / 100.0)
            .with_top_tags_only(self.top_only)
            .with_model(self.model.clone())
            .with_recursive(self.recursive);
        if let Some(dir) = &self.report_dir {
            config = config.with_report_folder(dir.clone());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.batch_config()?;
    let inference =
        CommandInference::new(cli.inference.clone()).with_args(cli.inference_args.clone());
    let runner = BatchRunner::new(BatchOrchestrator::new(Arc::new(inference)));
    let handle = runner.start(config)?;

    let cancel = handle.cancel_token();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("stop") => {
                    cancel.cancel();
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    let stdout = io::stdout();
    let stderr = io::stderr();
    for event in handle.events() {
        match event {
            BatchEvent::Log(line) => {
                writeln!(stdout.lock(), "{line}")?;
            }
            BatchEvent::Progress { done, total, eta } => {
                writeln!(stderr.lock(), "{done}/{total} {eta}")?;
            }
            BatchEvent::TrackProgress { .. } => {}
        }
    }

    let summary = handle.wait()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
