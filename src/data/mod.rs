// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from flat files to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   songs.csv / activity.csv
//       │
//       ▼
//   CsvSongSource / CsvActivitySource  → typed rows
//       │
//       ▼
//   Catalog            → contiguous 1..N item index (0 = padding)
//       │
//       ▼
//   TagVectorizer      → TF-IDF content fingerprints per song
//       │
//       ▼
//   SampleBuilder      → (history, positive, negative) triples
//       │                 and held-out evaluation pairs
//       ▼
//   SampleDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   SeqBatcher         → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Each module is responsible for exactly one step.

/// Loads songs and activity events from CSV files
pub mod loader;

/// Contiguous item index over the catalog snapshot
pub mod catalog;

/// TF-IDF tag vectors with genre-dimension boosting
pub mod tags;

/// Training/evaluation sample types + Burn Dataset impl
pub mod dataset;

/// Builds samples from per-user activity sequences
pub mod samples;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
