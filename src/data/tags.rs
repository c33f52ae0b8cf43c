// ============================================================
// Layer 4 — Tag Vectorizer (Feature Builder)
// ============================================================
// Turns each song's comma-delimited tag string into a dense
// TF-IDF vector over the vocabulary observed in this catalog
// snapshot. Rows are L2-normalized, then a fixed set of genre
// dimensions is doubled.
//
// Order of operations matters: normalize FIRST, boost SECOND.
// Boosted rows intentionally leave the unit sphere so that two
// songs sharing a genre tag sit closer in cosine space than two
// songs sharing only a niche tag. Boosting before normalizing
// would wash that signal back out.
//
// Vocabulary order is sorted, so the same catalog snapshot
// always produces bit-identical vectors.

use std::collections::{BTreeSet, HashMap};

use crate::data::catalog::Catalog;

/// Tag tokens treated as genres; their vocabulary dimension is
/// multiplied by 2.0 after row normalization.
pub const GENRE_KEYWORDS: [&str; 8] = [
    "rock", "pop", "hip_hop", "jazz", "metal", "classical", "electronic", "indie",
];

const GENRE_BOOST: f32 = 2.0;

/// Fitted vocabulary + inverse document frequencies for one
/// catalog snapshot.
pub struct TagVectorizer {
    vocab:    Vec<String>,
    index:    HashMap<String, usize>,
    idf:      Vec<f32>,
}

/// Per-item tag vectors, aligned with catalog indices: row 0 is
/// the all-zero padding row, row i is the song at catalog index i.
pub struct TagMatrix {
    rows: Vec<Vec<f32>>,
    dim:  usize,
}

/// Split a tag string into normalized tokens: comma-separated,
/// trimmed, lower-cased, empties dropped.
pub fn tokenize(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Cosine similarity with an additive epsilon guard: zero
/// vectors resolve to 0.0, never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + 1e-8)
}

impl TagVectorizer {
    /// Fit the vocabulary and document frequencies on a catalog
    /// snapshot.
    pub fn fit(catalog: &Catalog) -> Self {
        // Sorted set → deterministic dimension order
        let mut vocab_set = BTreeSet::new();
        for song in catalog.songs() {
            for token in tokenize(&song.tags) {
                vocab_set.insert(token);
            }
        }
        let vocab: Vec<String> = vocab_set.into_iter().collect();
        let index: HashMap<String, usize> = vocab
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        // Document frequency per token
        let mut df = vec![0usize; vocab.len()];
        for song in catalog.songs() {
            let mut seen = BTreeSet::new();
            for token in tokenize(&song.tags) {
                if seen.insert(token.clone()) {
                    df[index[&token]] += 1;
                }
            }
        }

        // Smoothed inverse document frequency:
        //   idf(t) = ln((1 + n) / (1 + df(t))) + 1
        let n = catalog.num_items() as f32;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        Self { vocab, index, idf }
    }

    /// Width of the tag vectors (vocabulary size V).
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Build the per-item tag matrix for a catalog: TF-IDF rows,
    /// L2-normalized, genre dimensions doubled post-normalization.
    /// Songs with no tags get the zero row.
    pub fn transform(&self, catalog: &Catalog) -> TagMatrix {
        let dim = self.vocab.len();
        let genre_dims: Vec<usize> = GENRE_KEYWORDS
            .iter()
            .filter_map(|g| self.index.get(*g).copied())
            .collect();

        // Row 0 is the padding row and stays zero
        let mut rows = Vec::with_capacity(catalog.num_items() + 1);
        rows.push(vec![0.0; dim]);

        for song in catalog.songs() {
            let mut row = vec![0.0f32; dim];
            for token in tokenize(&song.tags) {
                if let Some(&i) = self.index.get(&token) {
                    row[i] += self.idf[i];
                }
            }

            // L2 normalize; all-zero rows stay zero
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in row.iter_mut() {
                    *x /= norm;
                }
            }

            // Genre boost AFTER normalization
            for &g in &genre_dims {
                row[g] *= GENRE_BOOST;
            }

            rows.push(row);
        }

        TagMatrix { rows, dim }
    }
}

impl TagMatrix {
    /// Vector width V.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows, padding row included (N + 1).
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Tag vector at a catalog index (0 = padding row).
    pub fn row(&self, index: u32) -> &[f32] {
        &self.rows[index as usize]
    }

    /// All rows in index order.
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::song::Song;

    fn build(songs: Vec<Song>) -> (Catalog, TagVectorizer, TagMatrix) {
        let catalog = Catalog::from_songs(songs).unwrap();
        let vectorizer = TagVectorizer::fit(&catalog);
        let matrix = vectorizer.transform(&catalog);
        (catalog, vectorizer, matrix)
    }

    #[test]
    fn test_tokenize_trims_lowercases_and_drops_empties() {
        let tokens = tokenize(" Rock , pop ,,ROCK ");
        assert_eq!(tokens, vec!["rock", "pop", "rock"]);
    }

    #[test]
    fn test_rows_are_unit_norm_before_boosting() {
        // Only non-genre tokens, so boosting never touches them
        let (_, _, matrix) = build(vec![
            Song::new("A", "mellow, acoustic"),
            Song::new("B", "acoustic, lofi, chill"),
        ]);
        for row in &matrix.rows()[1..] {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "row norm was {norm}");
        }
    }

    #[test]
    fn test_genre_dimensions_double_after_normalization() {
        // "rock" and "jazz" are both genres but their weights
        // differ: rock appears in both documents (idf 1.0) while
        // jazz appears in one (idf ln(3/2) + 1). The row is
        // normalized on those weights, then both genre
        // dimensions are doubled.
        let (catalog, _, matrix) = build(vec![
            Song::new("A", "rock, jazz"),
            Song::new("B", "rock"),
        ]);
        let idf_rock = 1.0f32;
        let idf_jazz = (3.0f32 / 2.0).ln() + 1.0;
        let norm = (idf_rock * idf_rock + idf_jazz * idf_jazz).sqrt();

        let idx = catalog.index_of("A").unwrap();
        let row = matrix.row(idx);
        let mut nonzero: Vec<f32> = row.iter().copied().filter(|x| *x != 0.0).collect();
        nonzero.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut expected = vec![2.0 * idf_rock / norm, 2.0 * idf_jazz / norm];
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert_eq!(nonzero.len(), 2);
        for (value, want) in nonzero.iter().zip(&expected) {
            assert!((value - want).abs() < 1e-5, "got {value}, want {want}");
        }

        // A single-genre song normalizes to 1.0 and boosts to 2.0
        let idx_b = catalog.index_of("B").unwrap();
        let row_b = matrix.row(idx_b);
        let max = row_b.iter().cloned().fold(0.0f32, f32::max);
        assert!((max - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_tags_give_zero_vector() {
        let (catalog, _, matrix) = build(vec![
            Song::new("A", ""),
            Song::new("B", "rock"),
        ]);
        let idx = catalog.index_of("A").unwrap();
        assert!(matrix.row(idx).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_padding_row_is_zero() {
        let (_, _, matrix) = build(vec![Song::new("A", "rock")]);
        assert!(matrix.row(0).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_idempotent_on_identical_catalog() {
        let songs = vec![
            Song::new("A", "rock, indie"),
            Song::new("B", "jazz, fusion"),
            Song::new("C", ""),
        ];
        let catalog = Catalog::from_songs(songs.clone()).unwrap();
        let first = TagVectorizer::fit(&catalog).transform(&catalog);

        let catalog2 = Catalog::from_songs(songs).unwrap();
        let second = TagVectorizer::fit(&catalog2).transform(&catalog2);

        assert_eq!(first.num_rows(), second.num_rows());
        for (a, b) in first.rows().iter().zip(second.rows()) {
            for (x, y) in a.iter().zip(b) {
                // bit-identical, not just approximately equal
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn test_cosine_of_zero_vectors_is_zero_not_nan() {
        let zero = vec![0.0f32; 4];
        let sim = cosine_similarity(&zero, &zero);
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_of_identical_rows_is_near_one() {
        let v = vec![0.6f32, 0.8, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }
}
