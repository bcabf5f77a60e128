//! Satisfaction prediction — pretrained classifier artifacts
//!
//! Provides a `SatisfactionModel` trait with implementations for:
//! - **forest** — a random forest serialized as JSON (`forest::ForestModel`)
//! - **onnx** — an ONNX classifier run through ONNX Runtime (`onnx_model::OnnxModel`)
//!
//! Models are trained elsewhere. This crate only loads an artifact and asks
//! it for a label.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ModelBackend, ModelConfig};
use crate::dataset::{COL_AGENT, COL_DURATION, COL_SPEED, COL_TOPIC};
use crate::encoder::LabelEncoder;

/// Column order every artifact is trained on.
pub const FEATURE_COLUMNS: [&str; 4] = [COL_AGENT, COL_TOPIC, COL_SPEED, COL_DURATION];

// ============================================================================
// SatisfactionModel trait
// ============================================================================

/// A loaded classifier that maps encoded session features to a rating.
pub trait SatisfactionModel: Send + Sync {
    /// Predict one rating per input row.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, ModelError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact not found at {path}")]
    NotFound { path: String },

    #[error("Model artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("Input schema mismatch: model expects {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("ONNX inference error: {0}")]
    OnnxInference(String),

    #[error("IO error reading model: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Input rows
// ============================================================================

/// One encoded prediction input, in [`FEATURE_COLUMNS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub agent: u32,
    pub topic: u32,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
}

impl FeatureRow {
    /// Encode raw category strings with the fitted encoders.
    pub fn encode(
        agents: &LabelEncoder,
        topics: &LabelEncoder,
        agent: &str,
        topic: &str,
        speed_of_answer: u32,
        avg_talk_duration: f64,
    ) -> crate::Result<Self> {
        Ok(Self {
            agent: agents.transform(agent)?,
            topic: topics.transform(topic)?,
            speed_of_answer,
            avg_talk_duration,
        })
    }

    /// Feature values at `f32` precision, the width tree models compare
    /// against their thresholds and the ONNX input tensor carries.
    pub fn values(&self) -> [f32; 4] {
        [
            self.agent as f32,
            self.topic as f32,
            self.speed_of_answer as f32,
            self.avg_talk_duration as f32,
        ]
    }
}

// ============================================================================
// Backend factory
// ============================================================================

/// Load the artifact described by `config`.
pub fn load_model(config: &ModelConfig) -> Result<Box<dyn SatisfactionModel>, ModelError> {
    let path = PathBuf::from(&config.path);
    match config.backend {
        ModelBackend::Forest => Ok(Box::new(crate::forest::ForestModel::from_file(&path)?)),
        ModelBackend::Onnx => Ok(Box::new(crate::onnx_model::OnnxModel::new(
            &path,
            &config.onnx_input_name,
        )?)),
    }
}

/// Runs predictions against the configured artifact.
///
/// The artifact is read from disk on every call; replacing the file takes
/// effect on the next prediction without a restart.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: ModelConfig,
}

impl Predictor {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Predict the rating for a single row. Returns a length-1 vector.
    pub fn predict(&self, row: &FeatureRow) -> Result<Vec<i64>, ModelError> {
        let model = load_model(&self.config)?;
        let prediction = model.predict(std::slice::from_ref(row))?;
        tracing::debug!(
            "{} model predicted {:?} for {:?}",
            model.name(),
            prediction,
            row
        );
        Ok(prediction)
    }
}

// ============================================================================
// TESTS
// ============================================================================
