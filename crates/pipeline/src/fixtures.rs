//! Scripted collaborators for exercising the orchestrator without a model.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use tempfile::TempDir;

use dabtag_audio::{
    join_genres, DurationProbe, GenreWriter, InferenceError, MetadataError, TagInference,
    WindowSpec,
};
use dabtag_domain::RawScoreMatrix;

use crate::cancel::CancelToken;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Folder of empty files; durations come from [`FakeProbe`].
pub fn music_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    dir
}

pub enum Script {
    Scores(Vec<Vec<f32>>),
    Fail(String),
    WrongWidth,
}

pub struct FakeInference {
    tags: Vec<String>,
    scripts: HashMap<String, Script>,
    cancel_during: Option<(String, CancelToken)>,
    calls: Mutex<Vec<String>>,
}

impl FakeInference {
    pub fn new(tag_count: usize) -> Self {
        Self {
            tags: (0..tag_count).map(|i| format!("tag{i}")).collect(),
            scripts: HashMap::new(),
            cancel_during: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn cancel_during(mut self, name: &str, token: CancelToken) -> Self {
        self.cancel_during = Some((name.to_string(), token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn default_rows(&self) -> Vec<Vec<f32>> {
        let count = self.tags.len() as f32;
        (0..3)
            .map(|window| {
                (0..self.tags.len())
                    .map(|tag| (tag as f32 + window as f32) / (count + 3.0))
                    .collect()
            })
            .collect()
    }
}

impl TagInference for FakeInference {
    fn infer(&self, path: &Path, _window: &WindowSpec) -> Result<RawScoreMatrix, InferenceError> {
        let name = file_name(path);
        self.calls.lock().unwrap().push(name.clone());
        if let Some((target, token)) = &self.cancel_during {
            if *target == name {
                token.cancel();
            }
        }
        match self.scripts.get(&name) {
            Some(Script::Scores(rows)) => Ok(RawScoreMatrix::from_rows(rows.clone(), self.tags.clone())?),
            Some(Script::Fail(message)) => Err(InferenceError::Other(message.clone())),
            Some(Script::WrongWidth) => Ok(RawScoreMatrix::new(
                Array2::zeros((2, self.tags.len() - 1)),
                self.tags.clone(),
            )),
            None => Ok(RawScoreMatrix::from_rows(self.default_rows(), self.tags.clone())?),
        }
    }
}

pub struct FakeProbe {
    default_seconds: f64,
    durations: HashMap<String, f64>,
    unreadable: HashSet<String>,
}

impl FakeProbe {
    pub fn new(default_seconds: f64) -> Self {
        Self {
            default_seconds,
            durations: HashMap::new(),
            unreadable: HashSet::new(),
        }
    }

    pub fn with(mut self, name: &str, seconds: f64) -> Self {
        self.durations.insert(name.to_string(), seconds);
        self
    }

    pub fn unreadable(mut self, name: &str) -> Self {
        self.unreadable.insert(name.to_string());
        self
    }
}

impl DurationProbe for FakeProbe {
    fn duration(&self, path: &Path) -> anyhow::Result<f64> {
        let name = file_name(path);
        if self.unreadable.contains(&name) {
            anyhow::bail!("unsupported format");
        }
        Ok(self
            .durations
            .get(&name)
            .copied()
            .unwrap_or(self.default_seconds))
    }
}

#[derive(Default)]
pub struct RecordingWriter {
    failing: bool,
    attempts: Mutex<usize>,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingWriter {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl GenreWriter for RecordingWriter {
    fn write_genre(&self, path: &Path, genres: &[String]) -> Result<String, MetadataError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing {
            return Err(MetadataError::NoTagBlock(path.to_path_buf()));
        }
        let genre = join_genres(genres);
        self.writes
            .lock()
            .unwrap()
            .push((file_name(path), genre.clone()));
        Ok(genre)
    }
}
