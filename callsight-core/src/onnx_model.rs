//! ONNX classifier backend — local inference for models exported from scikit-learn
//!
//! Expects a classifier with one float input of shape `[N, 4]` (columns in
//! `FEATURE_COLUMNS` order) whose first output is the int64 label tensor, as
//! produced by `skl2onnx` for a `RandomForestClassifier`.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;

use crate::model::{FeatureRow, ModelError, SatisfactionModel, FEATURE_COLUMNS};

pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxModel {
    /// Load an ONNX classifier.
    ///
    /// Returns `ModelError::NotFound` if the file is missing.
    pub fn new(model_path: &Path, input_name: &str) -> Result<Self, ModelError> {
        if !model_path.exists() {
            return Err(ModelError::NotFound {
                path: model_path.display().to_string(),
            });
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| ModelError::Corrupt(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            input_name: input_name.to_string(),
        })
    }
}

impl SatisfactionModel for OnnxModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, ModelError> {
        let width = FEATURE_COLUMNS.len();
        let data: Vec<f32> = rows
            .iter()
            .flat_map(|r| r.values())
            .collect();
        let shape = vec![rows.len() as i64, width as i64];

        let input = Tensor::from_array((shape, data))
            .map_err(|e| ModelError::OnnxInference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::OnnxInference(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs! { self.input_name.as_str() => input })
            .map_err(|e| ModelError::SchemaMismatch {
                expected: format!("'{}' float tensor [N, {width}]", self.input_name),
                actual: e.to_string(),
            })?;

        let (_, labels) = outputs[0]
            .try_extract_tensor::<i64>()
            .map_err(|e| ModelError::SchemaMismatch {
                expected: "int64 label output".to_string(),
                actual: e.to_string(),
            })?;

        if labels.len() != rows.len() {
            return Err(ModelError::SchemaMismatch {
                expected: format!("{} labels", rows.len()),
                actual: format!("{} labels", labels.len()),
            });
        }

        Ok(labels.to_vec())
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
