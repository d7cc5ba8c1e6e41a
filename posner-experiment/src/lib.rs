pub mod aggregator;
pub mod config;
pub mod plan;
pub mod recorder;
pub mod report;
pub mod session;
pub mod state;
pub mod trial;
pub use aggregator::{
    ConditionAccumulator, ConditionMeans, ConditionSummary, ResultAggregator, SessionSummary,
};
pub use config::{ExperimentConfig, Messages};
pub use plan::TrialPlan;
pub use recorder::SessionRecorder;
pub use report::ConsoleReporter;
pub use session::Session;
pub use state::TrialExecutor;
pub use trial::{Trial, TrialDurations, TrialTimestamps};
