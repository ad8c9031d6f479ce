//! Client-side model of a match

pub mod predictor;

pub use predictor::{ClientPredictor, Frame, PredictorConfig};
