use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{
    DomainError, GradeLetter, ScoreValidator, StudentId, SubmissionId, SubmissionKey,
    SubmissionStatus, SubmissionTransition, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGradeInput {
    pub student_id: StudentId,
    pub ca_score: Option<Decimal>,
    pub exam_score: Option<Decimal>,
    pub comment: Option<String>,
}

impl SubjectGradeInput {
    pub fn new(student_id: StudentId, ca_score: Option<Decimal>, exam_score: Option<Decimal>) -> Self {
        Self {
            student_id,
            ca_score,
            exam_score,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// One student's scores for the subject of the owning submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGrade {
    pub student_id: StudentId,
    pub ca_score: Option<Decimal>,
    pub exam_score: Option<Decimal>,
    pub total_score: Option<Decimal>,
    pub grade_letter: Option<GradeLetter>,
    pub comment: Option<String>,
}

impl SubjectGrade {
    pub const COMMENT_MAX_LEN: usize = 200;

    pub fn score(input: SubjectGradeInput, validator: &ScoreValidator) -> Result<Self, DomainError> {
        let comment = match input.comment {
            Some(comment) => {
                let trimmed = comment.trim();
                let len = trimmed.chars().count();
                if len > Self::COMMENT_MAX_LEN {
                    return Err(DomainError::CommentTooLong(len));
                }
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            None => None,
        };

        let scored = validator.score_for(input.ca_score, input.exam_score)?;

        Ok(Self {
            student_id: input.student_id,
            ca_score: scored.ca_score,
            exam_score: scored.exam_score,
            total_score: scored.total_score,
            grade_letter: scored.grade_letter,
            comment,
        })
    }

    pub fn is_gradable(&self) -> bool {
        self.total_score.is_some()
    }

    fn as_input(&self) -> SubjectGradeInput {
        SubjectGradeInput {
            student_id: self.student_id,
            ca_score: self.ca_score,
            exam_score: self.exam_score,
            comment: self.comment.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason(String);

impl RejectionReason {
    pub const MAX_LEN: usize = 255;

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(DomainError::EmptyRejectionReason);
        }

        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(DomainError::RejectionReasonTooLong(len));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw fields of a persisted submission, used by stores to rebuild one.
#[derive(Debug, Clone)]
pub struct GradeSubmissionParts {
    pub id: SubmissionId,
    pub key: SubmissionKey,
    pub teacher_id: UserId,
    pub status: SubmissionStatus,
    pub grades: Vec<SubjectGrade>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub rejection_reason: Option<RejectionReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeSubmission {
    id: SubmissionId,
    key: SubmissionKey,
    teacher_id: UserId,
    status: SubmissionStatus,
    grades: Vec<SubjectGrade>,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<UserId>,
    rejection_reason: Option<RejectionReason>,
}

impl GradeSubmission {
    pub fn new_draft(key: SubmissionKey, teacher_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::new(),
            key,
            teacher_id,
            status: SubmissionStatus::Draft,
            grades: Vec::new(),
            created_at: now,
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        }
    }

    pub fn from_parts(parts: GradeSubmissionParts) -> Self {
        Self {
            id: parts.id,
            key: parts.key,
            teacher_id: parts.teacher_id,
            status: parts.status,
            grades: parts.grades,
            created_at: parts.created_at,
            submitted_at: parts.submitted_at,
            reviewed_at: parts.reviewed_at,
            reviewed_by: parts.reviewed_by,
            rejection_reason: parts.rejection_reason,
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn key(&self) -> SubmissionKey {
        self.key
    }

    pub fn teacher_id(&self) -> UserId {
        self.teacher_id
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn grades(&self) -> &[SubjectGrade] {
        &self.grades
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    pub fn rejection_reason(&self) -> Option<&RejectionReason> {
        self.rejection_reason.as_ref()
    }

    /// Validates every row before touching the sheet, so a bad row leaves it unchanged.
    pub fn upsert_grades(
        &mut self,
        rows: Vec<SubjectGradeInput>,
        validator: &ScoreValidator,
    ) -> Result<(), DomainError> {
        self.status.apply(SubmissionTransition::UpsertGrades)?;

        let mut seen = HashSet::with_capacity(rows.len());
        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.student_id) {
                return Err(DomainError::DuplicateStudentRow(row.student_id));
            }
            scored.push(SubjectGrade::score(row, validator)?);
        }

        for grade in scored {
            match self
                .grades
                .iter_mut()
                .find(|existing| existing.student_id == grade.student_id)
            {
                Some(existing) => *existing = grade,
                None => self.grades.push(grade),
            }
        }

        Ok(())
    }

    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let next = self.status.apply(SubmissionTransition::Submit)?;
        if !self.grades.iter().any(SubjectGrade::is_gradable) {
            return Err(DomainError::NothingToSubmit);
        }

        self.status = next;
        self.submitted_at = Some(now);
        Ok(())
    }

    pub fn approve(&mut self, reviewer: UserId, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status = self.status.apply(SubmissionTransition::Approve)?;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        Ok(())
    }

    pub fn reject(
        &mut self,
        reviewer: UserId,
        reason: RejectionReason,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.status = self.status.apply(SubmissionTransition::Reject)?;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Starts a fresh draft for the same slot, seeded with this sheet's rows.
    pub fn reopen(
        &self,
        teacher_id: UserId,
        validator: &ScoreValidator,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.status.apply(SubmissionTransition::Reopen)?;

        let mut draft = Self::new_draft(self.key, teacher_id, now);
        let rows = self.grades.iter().map(SubjectGrade::as_input).collect();
        draft.upsert_grades(rows, validator)?;
        Ok(draft)
    }
}
