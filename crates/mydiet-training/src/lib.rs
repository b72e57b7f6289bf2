//! MyDiet Training
//!
//! Types and client seams shared by everything that talks about model training:
//! - Training-run metrics (`MetricsRecord`, `MetricValue`)
//! - Uploaded dataset files (`UploadedFile`)
//! - The external trainer service (`Trainer`, `HttpTrainer`)

pub mod error;
pub mod http;
pub mod metrics;
pub mod trainer;
pub mod upload;

pub use error::{MetricsError, TrainerError, TrainerResult};
pub use http::{HttpTrainer, RETRAIN_PATH, UPLOAD_FIELD, UPLOAD_PATH};
pub use metrics::{MetricValue, MetricsMap, MetricsRecord, NewMetricsRecord};
pub use trainer::Trainer;
pub use upload::UploadedFile;
