use crate::storage::models::{DuplicatePeer, FileRecord};
use ahash::AHashMap;
use tracing::{debug, warn};

/// Cosine similarity between two vectors, clamped to `[-1, 1]`.
/// Zero-magnitude or mismatched vectors have similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Per-path near-duplicate peers for one catalog snapshot.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    peers: AHashMap<String, Vec<DuplicatePeer>>,
    embedded_files: usize,
    edge_count: usize,
}

impl DuplicateIndex {
    /// Peers of `path` in discovery order. Empty for files that had no
    /// usable embedding or no peer above the threshold.
    pub fn peers_for(&self, path: &str) -> &[DuplicatePeer] {
        self.peers.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of files that took part in the comparison.
    pub fn embedded_files(&self) -> usize {
        self.embedded_files
    }

    /// Number of unordered pairs above the threshold.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Compare every embedded file against every other one.
    ///
    /// Each unordered pair is scored once and recorded on both sides, so both
    /// directions carry the identical value. A file's peers come out in
    /// catalog order.
    pub fn detect(&self, files: &[FileRecord]) -> DuplicateIndex {
        let mut paths: Vec<&str> = Vec::new();
        let mut vectors: Vec<&[f32]> = Vec::new();
        let mut dimension: Option<usize> = None;

        for file in files {
            let Some(embedding) = file.embedding.as_deref() else {
                continue;
            };
            match dimension {
                None => dimension = Some(embedding.len()),
                Some(dim) if dim != embedding.len() => {
                    warn!(
                        "Excluding {} from duplicate detection: embedding has {} dimensions, expected {}",
                        file.path,
                        embedding.len(),
                        dim
                    );
                    continue;
                }
                Some(_) => {}
            }
            paths.push(&file.path);
            vectors.push(embedding);
        }

        let mut index = DuplicateIndex {
            peers: paths.iter().map(|p| (p.to_string(), Vec::new())).collect(),
            embedded_files: paths.len(),
            edge_count: 0,
        };

        if vectors.len() < 2 {
            debug!(
                "{} embedded file(s), nothing to compare",
                vectors.len()
            );
            return index;
        }

        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                let similarity = cosine_similarity(vectors[i], vectors[j]);
                if similarity > self.threshold {
                    push_peer(&mut index.peers, paths[i], paths[j], similarity);
                    push_peer(&mut index.peers, paths[j], paths[i], similarity);
                    index.edge_count += 1;
                }
            }
        }

        debug!(
            "Compared {} embedded files, {} duplicate pairs above {:.2}",
            index.embedded_files, index.edge_count, self.threshold
        );
        index
    }
}

fn push_peer(
    peers: &mut AHashMap<String, Vec<DuplicatePeer>>,
    owner: &str,
    peer: &str,
    similarity: f64,
) {
    if let Some(list) = peers.get_mut(owner) {
        list.push(DuplicatePeer {
            path: peer.to_string(),
            similarity,
        });
    }
}
