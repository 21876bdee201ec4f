pub mod inference;
pub mod metadata;
pub mod probe;

pub use inference::{CommandInference, InferenceError, TagInference, WindowSpec};
pub use metadata::{join_genres, read_genre, GenreWriter, LoftyGenreWriter, MetadataError};
pub use probe::{DurationProbe, SymphoniaProbe};
