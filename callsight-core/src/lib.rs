pub mod config;
pub mod dataset;
pub mod duration;
pub mod encoder;
pub mod error;
pub mod forest;
pub mod model;
pub mod onnx_model;
pub mod session;
pub mod stats;

pub use config::{CallsightConfig, ModelBackend, ModelConfig, ReportEmbed};
pub use dataset::{load_dataset, Dataset, SessionRecord, SessionTable};
pub use encoder::LabelEncoder;
pub use error::{CallsightError, Result};
pub use forest::ForestModel;
pub use model::{load_model, FeatureRow, ModelError, Predictor, SatisfactionModel, FEATURE_COLUMNS};
pub use onnx_model::OnnxModel;
pub use session::{append_session, NewSession};
pub use stats::{summarize, SatisfactionSummary};
