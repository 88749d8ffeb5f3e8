use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{
    AcademicSessionId, ApprovedSubjectGrade, ClassId, ClassStatistics, CohortKey, CohortRanking,
    ComputedResult, GradeSubmission, StudentId, StudentResult, SubmissionId, SubmissionStatus,
    TermId,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store timeout")]
    Timeout,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store failed: {0}")]
    Failed(String),
    #[error("submission {0} already occupies this grade sheet slot")]
    ActiveSubmissionExists(SubmissionId),
    #[error("submission {id} changed concurrently: expected {expected}, found {found}")]
    StaleSubmission {
        id: SubmissionId,
        expected: SubmissionStatus,
        found: SubmissionStatus,
    },
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Inserts a new draft unless a non-rejected submission holds the same key.
    /// The check and the insert are one atomic step.
    async fn insert_draft(&self, submission: &GradeSubmission) -> Result<(), StoreError>;

    async fn find_submission(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<GradeSubmission>, StoreError>;

    /// Writes status, review fields and the full grade row set atomically, provided
    /// the stored status still equals `expected`.
    async fn save_submission(
        &self,
        submission: &GradeSubmission,
        expected: SubmissionStatus,
    ) -> Result<(), StoreError>;

    /// Rows for `student_id` from every approved submission in the cohort.
    async fn approved_grades(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Vec<ApprovedSubjectGrade>, StoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Upserts the result for (student, cohort) keeping its id, and swaps its
    /// subject lines in the same transaction.
    async fn replace_result(
        &self,
        computed: ComputedResult,
        generated_at: DateTime<Utc>,
    ) -> Result<StudentResult, StoreError>;

    async fn find_result(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Option<StudentResult>, StoreError>;

    async fn list_cohort_results(&self, cohort: CohortKey) -> Result<Vec<StudentResult>, StoreError>;

    /// Writes every position and the cohort statistics, all or nothing.
    async fn save_ranking(&self, ranking: &CohortRanking) -> Result<(), StoreError>;

    async fn find_statistics(
        &self,
        cohort: CohortKey,
    ) -> Result<Option<ClassStatistics>, StoreError>;
}

#[async_trait]
pub trait EnrollmentProvider: Send + Sync {
    async fn list_enrolled_students(&self, cohort: CohortKey) -> Result<Vec<StudentId>, StoreError>;

    async fn current_class(
        &self,
        student_id: StudentId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Result<Option<ClassId>, StoreError>;
}
