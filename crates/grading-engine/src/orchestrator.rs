use std::collections::HashSet;
use std::sync::Arc;

use gradebook_core::domain::{
    AcademicSessionId, ClassId, ClassStatistics, CohortKey, EnrollmentProvider, ResultStore,
    StudentId, StudentResult, TermId,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::bounded;
use crate::{
    ClassRankingEngine, CohortLocks, EventBroadcaster, GenerationConfig, GradingError,
    GradingEvent, Result, ResultAggregationEngine,
};

#[derive(Debug, Clone)]
pub struct StudentGenerationReport {
    pub result: StudentResult,
    pub statistics: ClassStatistics,
}

#[derive(Debug, Clone)]
pub struct ClassGenerationSummary {
    pub cohort: CohortKey,
    pub succeeded: usize,
    pub failed: Vec<StudentId>,
    /// 因取消而未调度的学生。非空时本次排名只是部分重算。
    pub unscheduled: Vec<StudentId>,
    pub results: Vec<StudentResult>,
    pub statistics: ClassStatistics,
}

impl ClassGenerationSummary {
    pub fn is_partial(&self) -> bool {
        !self.unscheduled.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CohortReport {
    pub results: Vec<StudentResult>,
    pub statistics: Option<ClassStatistics>,
}

type AggregationOutcome = (StudentId, Result<StudentResult>);

#[derive(Default)]
struct BatchProgress {
    succeeded: Vec<StudentId>,
    failed: Vec<StudentId>,
    fatal: Option<GradingError>,
}

impl BatchProgress {
    fn settle(
        &mut self,
        joined: std::result::Result<AggregationOutcome, JoinError>,
        events: &EventBroadcaster,
    ) {
        match joined {
            Ok((student_id, Ok(result))) => {
                events.emit(GradingEvent::ResultGenerated {
                    result_id: result.id,
                    student_id,
                    cohort: result.cohort,
                });
                self.succeeded.push(student_id);
            }
            Ok((student_id, Err(err))) if err.is_per_student() => {
                warn!(student_id = %student_id, error = %err, "student skipped in class generation");
                self.failed.push(student_id);
            }
            Ok((student_id, Err(err))) => {
                error!(student_id = %student_id, error = %err, "class generation aborted");
                if self.fatal.is_none() {
                    self.fatal = Some(err);
                }
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                error!(error = %join_err, "aggregation task panicked");
                if self.fatal.is_none() {
                    self.fatal = Some(GradingError::Internal(join_err.to_string()));
                }
            }
        }
    }
}

/// 成绩生成入口：聚合单个学生或整个班级，并在同一把班级锁内重算排名。
pub struct ResultGenerationOrchestrator {
    aggregation: Arc<ResultAggregationEngine>,
    ranking: ClassRankingEngine,
    results: Arc<dyn ResultStore>,
    enrollment: Arc<dyn EnrollmentProvider>,
    locks: CohortLocks,
    config: GenerationConfig,
    events: Arc<EventBroadcaster>,
}

impl ResultGenerationOrchestrator {
    pub fn new(
        aggregation: Arc<ResultAggregationEngine>,
        results: Arc<dyn ResultStore>,
        enrollment: Arc<dyn EnrollmentProvider>,
        config: GenerationConfig,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            aggregation,
            ranking: ClassRankingEngine::new(results.clone(), config.store_timeout()),
            results,
            enrollment,
            locks: CohortLocks::new(),
            config,
            events,
        }
    }

    pub fn locks(&self) -> &CohortLocks {
        &self.locks
    }

    /// 为单个学生重新生成成绩，然后重算其所在班级的全部名次。
    #[tracing::instrument(skip(self))]
    pub async fn generate_for_student(
        &self,
        student_id: StudentId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Result<StudentGenerationReport> {
        let class_id = bounded(
            self.config.store_timeout(),
            "resolve current class",
            self.enrollment.current_class(student_id, term_id, session_id),
        )
        .await?
        .ok_or_else(|| {
            GradingError::NotFound(format!(
                "student {student_id} is not enrolled in term {term_id} of session {session_id}"
            ))
        })?;
        let cohort = CohortKey::new(class_id, term_id, session_id);

        let _guard = self.locks.acquire(cohort, self.config.lock_timeout()).await?;

        let timeout = self.config.aggregation_timeout();
        let result = tokio::time::timeout(timeout, self.aggregation.aggregate(student_id, cohort))
            .await
            .map_err(|_| aggregation_timeout(student_id, timeout))??;
        self.events.emit(GradingEvent::ResultGenerated {
            result_id: result.id,
            student_id,
            cohort,
        });

        let ranking = self.ranking.rank(cohort).await?;
        self.emit_ranked(&ranking.statistics);

        let position = ranking.position_of(student_id);
        Ok(StudentGenerationReport {
            result: StudentResult { position, ..result },
            statistics: ranking.statistics,
        })
    }

    pub async fn generate_for_class(
        &self,
        class_id: ClassId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Result<ClassGenerationSummary> {
        self.generate_for_class_with_cancel(class_id, term_id, session_id, CancellationToken::new())
            .await
    }

    /// 整班生成。学生之间并发聚合（受 `max_parallel` 限制），全部结束后只排名一次。
    ///
    /// 单个学生数据不足只记入 `failed`；其他错误终止整批并返回该错误，返回前会对已提交的结果重新排名。
    /// 取消后不再调度新的学生，已在执行的聚合会等待完成，随后对现有结果做一次部分排名。
    #[tracing::instrument(skip(self, cancel))]
    pub async fn generate_for_class_with_cancel(
        &self,
        class_id: ClassId,
        term_id: TermId,
        session_id: AcademicSessionId,
        cancel: CancellationToken,
    ) -> Result<ClassGenerationSummary> {
        let cohort = CohortKey::new(class_id, term_id, session_id);
        let _guard = self.locks.acquire(cohort, self.config.lock_timeout()).await?;

        let mut seen = HashSet::new();
        let students: Vec<StudentId> = bounded(
            self.config.store_timeout(),
            "list enrolled students",
            self.enrollment.list_enrolled_students(cohort),
        )
        .await?
        .into_iter()
        .filter(|student_id| seen.insert(*student_id))
        .collect();

        info!(
            cohort = %cohort,
            students = students.len(),
            max_parallel = self.config.max_parallel,
            "starting class generation"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let timeout = self.config.aggregation_timeout();
        let mut join_set: JoinSet<AggregationOutcome> = JoinSet::new();
        let mut progress = BatchProgress::default();
        let mut unscheduled = Vec::new();

        for student_id in students {
            while let Some(joined) = join_set.try_join_next() {
                progress.settle(joined, &self.events);
            }
            if progress.fatal.is_some() {
                break;
            }

            let permit = match self.acquire_permit(&semaphore, &cancel).await? {
                Some(permit) => permit,
                None => {
                    unscheduled.push(student_id);
                    continue;
                }
            };

            let aggregation = self.aggregation.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let outcome =
                    match tokio::time::timeout(timeout, aggregation.aggregate(student_id, cohort))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(aggregation_timeout(student_id, timeout)),
                    };
                (student_id, outcome)
            });
        }

        if progress.fatal.is_some() {
            join_set.abort_all();
        }
        while let Some(joined) = join_set.join_next().await {
            let was_fatal = progress.fatal.is_some();
            progress.settle(joined, &self.events);
            if !was_fatal && progress.fatal.is_some() {
                join_set.abort_all();
            }
        }
        if let Some(err) = progress.fatal {
            self.rerank_after_abort(cohort).await;
            return Err(err);
        }

        if !unscheduled.is_empty() {
            warn!(
                cohort = %cohort,
                unscheduled = unscheduled.len(),
                "class generation cancelled, ranking current results as a partial pass"
            );
        }

        let ranking = self.ranking.rank(cohort).await?;
        self.emit_ranked(&ranking.statistics);
        let results = bounded(
            self.config.store_timeout(),
            "list cohort results",
            self.results.list_cohort_results(cohort),
        )
        .await?;

        progress.failed.sort();
        let summary = ClassGenerationSummary {
            cohort,
            succeeded: progress.succeeded.len(),
            failed: progress.failed,
            unscheduled,
            results,
            statistics: ranking.statistics,
        };

        self.events.emit(GradingEvent::ClassGenerationCompleted {
            cohort,
            succeeded: summary.succeeded,
            failed: summary.failed.clone(),
            partial: summary.is_partial(),
        });
        info!(
            cohort = %cohort,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            partial = summary.is_partial(),
            "class generation completed"
        );

        Ok(summary)
    }

    /// 读取某个学生在班级中的当前成绩。
    pub async fn result_for(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<StudentResult> {
        bounded(
            self.config.store_timeout(),
            "find result",
            self.results.find_result(student_id, cohort),
        )
        .await?
        .ok_or_else(|| {
            GradingError::NotFound(format!("no result for student {student_id} in {cohort}"))
        })
    }

    /// 读取班级的全部成绩与最近一次排名统计。
    pub async fn cohort_report(&self, cohort: CohortKey) -> Result<CohortReport> {
        let timeout = self.config.store_timeout();
        let results = bounded(
            timeout,
            "list cohort results",
            self.results.list_cohort_results(cohort),
        )
        .await?;
        let statistics = bounded(
            timeout,
            "find cohort statistics",
            self.results.find_statistics(cohort),
        )
        .await?;
        Ok(CohortReport {
            results,
            statistics,
        })
    }

    async fn acquire_permit(
        &self,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Result<Option<OwnedSemaphorePermit>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            permit = semaphore.clone().acquire_owned() => permit
                .map(Some)
                .map_err(|err| GradingError::Internal(err.to_string())),
        }
    }

    /// 整批中止后，在仍持有班级锁时对已写入的结果重新排名。
    /// 重新排名本身失败只记录日志，调用方拿到的仍是最初的错误。
    async fn rerank_after_abort(&self, cohort: CohortKey) {
        match self.ranking.rank(cohort).await {
            Ok(ranking) => {
                warn!(cohort = %cohort, "class generation aborted, committed results re-ranked");
                self.emit_ranked(&ranking.statistics);
            }
            Err(err) => {
                error!(cohort = %cohort, error = %err, "re-ranking after aborted class generation failed");
            }
        }
    }

    fn emit_ranked(&self, statistics: &ClassStatistics) {
        self.events.emit(GradingEvent::CohortRanked {
            cohort: statistics.cohort,
            total_students: statistics.total_students,
            ranked_students: statistics.ranked_students,
        });
    }
}

fn aggregation_timeout(student_id: StudentId, timeout: std::time::Duration) -> GradingError {
    GradingError::Timeout(format!(
        "aggregation for student {student_id} exceeded {timeout:?}"
    ))
}
