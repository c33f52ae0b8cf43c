// ============================================================
// Layer 5 — ML Engine
// ============================================================
// Model definition, training loop, serving-path recommender and
// offline evaluator. Training runs on the autodiff NdArray
// backend; serving and evaluation use the plain NdArray backend,
// where dropout is a no-op and inference is deterministic.

pub mod evaluator;
pub mod model;
pub mod recommender;
pub mod trainer;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

pub type TrainBackend = Autodiff<NdArray>;
pub type InferBackend = NdArray;

pub fn device() -> NdArrayDevice {
    NdArrayDevice::default()
}
