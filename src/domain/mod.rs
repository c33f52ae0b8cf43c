// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the recommender.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO ML-specific code
//   - Only plain Rust structs, enums, and traits

// A catalog item (song) with its content tags
pub mod song;

// Activity events and the closed set of activity kinds
pub mod activity;

// Core abstractions (traits) that other layers implement
pub mod traits;
