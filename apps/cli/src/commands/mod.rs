//! Command implementations for the MyDiet CLI.

pub mod metrics;
pub mod serve;
pub mod trainer;

pub use metrics::MetricsCommand;
pub use trainer::TrainerArgs;
