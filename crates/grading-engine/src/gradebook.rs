use std::sync::Arc;

use gradebook_core::domain::{EnrollmentProvider, ResultStore, SubmissionStore};
use tracing::info;

use crate::{
    EventBroadcaster, EventStream, GradeSubmissionService, GradebookConfig, Result,
    ResultAggregationEngine, ResultGenerationOrchestrator,
};

/// 组装成绩流水线的各个组件，对外暴露成绩单服务与成绩生成入口。
pub struct Gradebook {
    submissions: GradeSubmissionService,
    results: Arc<ResultGenerationOrchestrator>,
    event_broadcaster: Arc<EventBroadcaster>,
}

impl Gradebook {
    pub fn new(
        config: GradebookConfig,
        submission_store: Arc<dyn SubmissionStore>,
        result_store: Arc<dyn ResultStore>,
        enrollment: Arc<dyn EnrollmentProvider>,
    ) -> Result<Self> {
        info!(
            bands = config.grading.bands.len(),
            max_parallel = config.generation.max_parallel,
            regenerate_on_approval = config.generation.regenerate_on_approval,
            "initializing gradebook"
        );

        config.validate()?;
        let validator = Arc::new(config.grading.validator()?);
        let event_broadcaster = Arc::new(EventBroadcaster::new(config.generation.event_buffer_size));

        let aggregation = Arc::new(ResultAggregationEngine::new(
            submission_store.clone(),
            result_store.clone(),
            Arc::new(validator.scale().clone()),
        ));
        let results = Arc::new(ResultGenerationOrchestrator::new(
            aggregation,
            result_store,
            enrollment,
            config.generation.clone(),
            event_broadcaster.clone(),
        ));
        let submissions = GradeSubmissionService::new(
            submission_store,
            validator,
            results.clone(),
            event_broadcaster.clone(),
            config.generation.regenerate_on_approval,
        );

        Ok(Self {
            submissions,
            results,
            event_broadcaster,
        })
    }

    pub fn submissions(&self) -> &GradeSubmissionService {
        &self.submissions
    }

    pub fn results(&self) -> &ResultGenerationOrchestrator {
        &self.results
    }

    pub fn subscribe_events(&self) -> EventStream {
        self.event_broadcaster.subscribe()
    }
}
