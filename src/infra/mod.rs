// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Snapshot persistence and training metrics output.

pub mod checkpoint;
pub mod metrics;
