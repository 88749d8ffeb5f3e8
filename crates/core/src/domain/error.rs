use rust_decimal::Decimal;
use thiserror::Error;

use super::{ScoreComponent, StudentId, SubmissionStatus, SubmissionTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidState,
    InsufficientData,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {component} score: {value}. score must be in [0, {max}]")]
    ScoreOutOfRange {
        component: ScoreComponent,
        value: Decimal,
        max: Decimal,
    },
    #[error("invalid {component} score: {value}. at most {max} decimal places are allowed", max = super::ScoreValidator::MAX_DECIMAL_PLACES)]
    TooManyDecimalPlaces {
        component: ScoreComponent,
        value: Decimal,
    },
    #[error("comment is too long: {0} characters, at most {max} allowed", max = super::SubjectGrade::COMMENT_MAX_LEN)]
    CommentTooLong(usize),
    #[error("student {0} appears more than once in the same grade sheet")]
    DuplicateStudentRow(StudentId),
    #[error("rejection reason must not be empty")]
    EmptyRejectionReason,
    #[error("rejection reason is too long: {0} characters, at most {max} allowed", max = super::RejectionReason::MAX_LEN)]
    RejectionReasonTooLong(usize),
    #[error("invalid grade scale: {0}")]
    InvalidGradeScale(String),
    #[error("grade sheet has no row with both scores present")]
    NothingToSubmit,
    #[error("cannot {attempted} a submission in {current} state")]
    InvalidTransition {
        current: SubmissionStatus,
        attempted: SubmissionTransition,
    },
    #[error("student {0} has no gradable approved subjects")]
    InsufficientData(StudentId),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } => ErrorKind::InvalidState,
            Self::InsufficientData(_) => ErrorKind::InsufficientData,
            Self::ScoreOutOfRange { .. }
            | Self::TooManyDecimalPlaces { .. }
            | Self::CommentTooLong(_)
            | Self::DuplicateStudentRow(_)
            | Self::EmptyRejectionReason
            | Self::RejectionReasonTooLong(_)
            | Self::InvalidGradeScale(_)
            | Self::NothingToSubmit => ErrorKind::Validation,
        }
    }
}
