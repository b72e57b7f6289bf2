use crate::error::TrainerResult;
use crate::upload::UploadedFile;
use async_trait::async_trait;
use serde_json::Value;

/// The external service that ingests datasets and retrains the models.
///
/// Responses are opaque JSON owned by the trainer and are handed back unchanged.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    /// Forwards a dataset file to the trainer.
    async fn upload_dataset(&self, file: UploadedFile) -> TrainerResult<Value>;

    /// Asks the trainer to start a retraining run.
    async fn retrain(&self) -> TrainerResult<Value>;
}
