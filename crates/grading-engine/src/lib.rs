pub mod aggregation;
pub mod cohort_lock;
pub mod config;
pub mod error;
pub mod events;
pub mod gradebook;
pub mod memory;
pub mod orchestrator;
pub mod ranking;
pub mod workflow;

pub use aggregation::ResultAggregationEngine;
pub use cohort_lock::{CohortGuard, CohortLocks};
pub use config::{GenerationConfig, GradebookConfig, GradingConfig};
pub use error::{GradingError, Result};
pub use events::{EventBroadcaster, EventStream, GradingEvent};
pub use gradebook::Gradebook;
pub use memory::{InMemoryEnrollment, InMemoryGradebookStore};
pub use orchestrator::{
    ClassGenerationSummary, CohortReport, ResultGenerationOrchestrator, StudentGenerationReport,
};
pub use ranking::ClassRankingEngine;
pub use workflow::{ApprovalOutcome, GradeSubmissionService, Regeneration};
