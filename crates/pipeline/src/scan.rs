use tracing::{debug, warn};
use walkdir::WalkDir;

use dabtag_domain::{BatchConfig, TrackCandidate};

/// Lists audio files under the source folder in directory order.
pub fn enumerate_tracks(config: &BatchConfig) -> Vec<TrackCandidate> {
    let max_depth = if config.recursive { usize::MAX } else { 1 };
    let tracks: Vec<TrackCandidate> = WalkDir::new(&config.source_folder)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && config.accepts(entry.path()))
        .map(|entry| TrackCandidate::new(entry.into_path()))
        .collect();
    debug!(count = tracks.len(), folder = ?config.source_folder, "enumerated tracks");
    tracks
}
