use std::path::Path;

/// Produces a fixed-length, unit-normalized content vector for a file.
///
/// Returning `None` means the file is not embeddable (unsupported, corrupted,
/// or the producer failed). That never aborts collection; the file is simply
/// left out of duplicate detection.
pub trait Embedder {
    fn embed(&self, path: &Path) -> Option<Vec<f32>>;
}

/// Embedder for hosts without an embedding model. Vectors produced elsewhere
/// can still be brought in through the JSON Lines import.
pub struct NoEmbedder;

impl Embedder for NoEmbedder {
    fn embed(&self, _path: &Path) -> Option<Vec<f32>> {
        None
    }
}
