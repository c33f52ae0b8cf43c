// ============================================================
// Layer 2 — Application (Use Cases)
// ============================================================
// Orchestration only: each use case wires domain sources, the
// data pipeline, the ML engine and infrastructure together.
// No tensor math lives here.

pub mod evaluate_use_case;
pub mod recommend_use_case;
pub mod service;
pub mod train_use_case;
