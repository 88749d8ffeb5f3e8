use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionTransition {
    UpsertGrades,
    Submit,
    Approve,
    Reject,
    Reopen,
}

impl SubmissionStatus {
    /// Transition table. Anything not listed is illegal.
    ///
    /// `Reopen` leaves the rejected sheet untouched for audit; the returned
    /// state is the one the replacement sheet starts in.
    pub fn apply(self, transition: SubmissionTransition) -> Result<Self, DomainError> {
        use SubmissionStatus::*;
        use SubmissionTransition::*;

        match (self, transition) {
            (Draft, UpsertGrades) => Ok(Draft),
            (Draft, Submit) => Ok(Submitted),
            (Submitted, Approve) => Ok(Approved),
            (Submitted, Reject) => Ok(Rejected),
            (Rejected, Reopen) => Ok(Draft),
            (current, attempted) => Err(DomainError::InvalidTransition { current, attempted }),
        }
    }

    /// Non-rejected submissions occupy their (class, subject, term, session) slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => f.write_str("draft"),
            Self::Submitted => f.write_str("submitted"),
            Self::Approved => f.write_str("approved"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

impl fmt::Display for SubmissionTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpsertGrades => f.write_str("upsert grades on"),
            Self::Submit => f.write_str("submit"),
            Self::Approve => f.write_str("approve"),
            Self::Reject => f.write_str("reject"),
            Self::Reopen => f.write_str("reopen"),
        }
    }
}
