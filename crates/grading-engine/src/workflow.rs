use std::sync::Arc;

use chrono::Utc;
use gradebook_core::domain::{
    DomainError, GradeSubmission, RejectionReason, ScoreValidator, StoreError, SubjectGradeInput,
    SubmissionId, SubmissionKey, SubmissionStatus, SubmissionStore, SubmissionTransition, UserId,
};
use tracing::{info, warn};

use crate::{
    ClassGenerationSummary, EventBroadcaster, GradingError, GradingEvent, Result,
    ResultGenerationOrchestrator,
};

/// 审批通过后触发的整班重新生成的结果。
#[derive(Debug)]
pub enum Regeneration {
    /// 配置关闭了审批后自动生成。
    Disabled,
    Completed(ClassGenerationSummary),
    /// 审批已经生效，但重新生成失败，可稍后手动重试。
    Failed(String),
}

#[derive(Debug)]
pub struct ApprovalOutcome {
    pub submission: GradeSubmission,
    pub regeneration: Regeneration,
}

/// 成绩单生命周期服务：草稿、录入、提交、审批、驳回。
pub struct GradeSubmissionService {
    store: Arc<dyn SubmissionStore>,
    validator: Arc<ScoreValidator>,
    orchestrator: Arc<ResultGenerationOrchestrator>,
    events: Arc<EventBroadcaster>,
    regenerate_on_approval: bool,
}

impl GradeSubmissionService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        validator: Arc<ScoreValidator>,
        orchestrator: Arc<ResultGenerationOrchestrator>,
        events: Arc<EventBroadcaster>,
        regenerate_on_approval: bool,
    ) -> Self {
        Self {
            store,
            validator,
            orchestrator,
            events,
            regenerate_on_approval,
        }
    }

    /// 为 (班级, 科目, 学期, 学年) 创建空草稿。该槽位已有未驳回的成绩单时返回 `Conflict`。
    #[tracing::instrument(skip(self))]
    pub async fn create_draft(&self, teacher_id: UserId, key: SubmissionKey) -> Result<GradeSubmission> {
        let submission = GradeSubmission::new_draft(key, teacher_id, Utc::now());
        self.insert_draft(submission).await
    }

    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn upsert_grades(
        &self,
        submission_id: SubmissionId,
        rows: Vec<SubjectGradeInput>,
    ) -> Result<GradeSubmission> {
        let mut submission = self.get(submission_id).await?;
        let expected = submission.status();
        submission.upsert_grades(rows, &self.validator)?;
        self.persist(&submission, expected, SubmissionTransition::UpsertGrades)
            .await?;
        Ok(submission)
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, submission_id: SubmissionId) -> Result<GradeSubmission> {
        let mut submission = self.get(submission_id).await?;
        let expected = submission.status();
        submission.submit(Utc::now())?;
        self.persist(&submission, expected, SubmissionTransition::Submit)
            .await?;

        info!(submission_id = %submission_id, "grade sheet submitted");
        self.events
            .emit(GradingEvent::SubmissionSubmitted { submission_id });
        Ok(submission)
    }

    /// 审批通过。状态变更落库之后才会触发整班成绩重新生成。
    #[tracing::instrument(skip(self))]
    pub async fn approve(
        &self,
        submission_id: SubmissionId,
        reviewer_id: UserId,
    ) -> Result<ApprovalOutcome> {
        let mut submission = self.get(submission_id).await?;
        let expected = submission.status();
        submission.approve(reviewer_id, Utc::now())?;
        self.persist(&submission, expected, SubmissionTransition::Approve)
            .await?;

        let key = submission.key();
        info!(submission_id = %submission_id, reviewer_id = %reviewer_id, "grade sheet approved");
        self.events.emit(GradingEvent::SubmissionApproved {
            submission_id,
            key,
            reviewer_id,
        });

        let regeneration = if self.regenerate_on_approval {
            match self
                .orchestrator
                .generate_for_class(key.class_id, key.term_id, key.session_id)
                .await
            {
                Ok(summary) => Regeneration::Completed(summary),
                Err(err) => {
                    warn!(
                        submission_id = %submission_id,
                        error = %err,
                        "result regeneration after approval failed"
                    );
                    Regeneration::Failed(err.to_string())
                }
            }
        } else {
            Regeneration::Disabled
        };

        Ok(ApprovalOutcome {
            submission,
            regeneration,
        })
    }

    /// 驳回。不会触碰任何已生成的成绩结果。
    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        submission_id: SubmissionId,
        reviewer_id: UserId,
        reason: &str,
    ) -> Result<GradeSubmission> {
        let reason = RejectionReason::new(reason)?;
        let mut submission = self.get(submission_id).await?;
        let expected = submission.status();
        submission.reject(reviewer_id, reason.clone(), Utc::now())?;
        self.persist(&submission, expected, SubmissionTransition::Reject)
            .await?;

        info!(submission_id = %submission_id, reviewer_id = %reviewer_id, "grade sheet rejected");
        self.events.emit(GradingEvent::SubmissionRejected {
            submission_id,
            reviewer_id,
            reason: reason.as_str().to_string(),
        });
        Ok(submission)
    }

    /// 基于已驳回的成绩单开启新草稿，原成绩单保留用于审计。
    #[tracing::instrument(skip(self))]
    pub async fn reopen(
        &self,
        submission_id: SubmissionId,
        teacher_id: UserId,
    ) -> Result<GradeSubmission> {
        let rejected = self.get(submission_id).await?;
        let draft = rejected.reopen(teacher_id, &self.validator, Utc::now())?;
        self.insert_draft(draft).await
    }

    pub async fn get(&self, submission_id: SubmissionId) -> Result<GradeSubmission> {
        self.store
            .find_submission(submission_id)
            .await?
            .ok_or_else(|| GradingError::NotFound(format!("submission {submission_id}")))
    }

    async fn insert_draft(&self, submission: GradeSubmission) -> Result<GradeSubmission> {
        let key = submission.key();
        match self.store.insert_draft(&submission).await {
            Ok(()) => {}
            Err(StoreError::ActiveSubmissionExists(existing)) => {
                return Err(GradingError::Conflict { key, existing });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            submission_id = %submission.id(),
            teacher_id = %submission.teacher_id(),
            key = %key,
            "grade sheet draft created"
        );
        self.events.emit(GradingEvent::SubmissionCreated {
            submission_id: submission.id(),
            key,
            teacher_id: submission.teacher_id(),
        });
        Ok(submission)
    }

    /// 若并发写入已先行改变状态，本次写入按“从新状态发起的非法迁移”处理。
    async fn persist(
        &self,
        submission: &GradeSubmission,
        expected: SubmissionStatus,
        attempted: SubmissionTransition,
    ) -> Result<()> {
        match self.store.save_submission(submission, expected).await {
            Ok(()) => Ok(()),
            Err(StoreError::StaleSubmission { found, .. }) => {
                Err(GradingError::InvalidState(DomainError::InvalidTransition {
                    current: found,
                    attempted,
                }))
            }
            Err(err) => Err(err.into()),
        }
    }
}
