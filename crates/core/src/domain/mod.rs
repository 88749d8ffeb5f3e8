mod error;
mod ids;
mod ranking;
mod result;
mod score;
mod store;
mod submission;
mod submission_status;

pub use error::{DomainError, ErrorKind};
pub use ids::{
    AcademicSessionId, ClassId, CohortKey, ResultId, StudentId, SubjectId, SubmissionId,
    SubmissionKey, TermId, UserId,
};
pub use ranking::{ClassStatistics, CohortRanking, RankedEntry, rank_results};
pub use result::{
    ApprovedSubjectGrade, ComputedResult, ResultSubjectLine, StudentResult, aggregate_subjects,
    round_score,
};
pub use score::{
    GradeBand, GradeLetter, GradeScale, ScoreBounds, ScoreComponent, ScoreValidator,
    ScoredSubject,
};
pub use store::{EnrollmentProvider, ResultStore, StoreError, SubmissionStore};
pub use submission::{
    GradeSubmission, GradeSubmissionParts, RejectionReason, SubjectGrade, SubjectGradeInput,
};
pub use submission_status::{SubmissionStatus, SubmissionTransition};
