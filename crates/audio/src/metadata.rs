use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read tags from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
    #[error("{0:?} has no writable tag block")]
    NoTagBlock(PathBuf),
    #[error("failed to save tags to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
}

pub fn join_genres(genres: &[String]) -> String {
    genres.join(", ")
}

pub trait GenreWriter: Send + Sync {
    /// Replaces the genre field with the joined tags and returns the stored string.
    fn write_genre(&self, path: &Path, genres: &[String]) -> Result<String, MetadataError>;
}

pub struct LoftyGenreWriter;

impl GenreWriter for LoftyGenreWriter {
    #[instrument(skip(self))]
    fn write_genre(&self, path: &Path, genres: &[String]) -> Result<String, MetadataError> {
        let mut tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|source| MetadataError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            debug!(?tag_type, "creating missing tag block");
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let genre = join_genres(genres);
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| MetadataError::NoTagBlock(path.to_path_buf()))?;
        tag.set_genre(genre.clone());

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|source| MetadataError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(genre)
    }
}

pub fn read_genre(path: &Path) -> Result<Option<String>, MetadataError> {
    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(tagged_file
        .primary_tag()
        .and_then(|tag| tag.genre().map(|genre| genre.into_owned())))
}
