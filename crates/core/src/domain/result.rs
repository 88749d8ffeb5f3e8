use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{
    CohortKey, DomainError, GradeLetter, GradeScale, ResultId, StudentId, SubjectId,
    SubmissionId,
};

/// Rounds to two decimal places, halves away from zero.
pub fn round_score(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A student's row from an approved grade sheet, found by business key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedSubjectGrade {
    pub submission_id: SubmissionId,
    pub subject_id: SubjectId,
    pub ca_score: Option<Decimal>,
    pub exam_score: Option<Decimal>,
    pub total_score: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubjectLine {
    pub subject_id: SubjectId,
    pub ca_score: Decimal,
    pub exam_score: Decimal,
    pub total_score: Decimal,
    pub grade_letter: GradeLetter,
    pub remark: String,
}

/// Output of aggregation, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedResult {
    pub student_id: StudentId,
    pub cohort: CohortKey,
    pub total_score: Decimal,
    pub average_score: Decimal,
    pub grade_letter: GradeLetter,
    pub remark: String,
    pub subject_count: u32,
    pub lines: Vec<ResultSubjectLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentResult {
    pub id: ResultId,
    pub student_id: StudentId,
    pub cohort: CohortKey,
    pub total_score: Decimal,
    pub average_score: Option<Decimal>,
    pub grade_letter: Option<GradeLetter>,
    pub remark: Option<String>,
    pub position: Option<u32>,
    pub subject_count: u32,
    pub lines: Vec<ResultSubjectLine>,
    pub generated_at: DateTime<Utc>,
}

impl StudentResult {
    /// Builds the stored form of `computed`, reusing `id` and `position` when a
    /// row already exists for the same student and cohort.
    pub fn from_computed(
        id: ResultId,
        computed: ComputedResult,
        position: Option<u32>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id: computed.student_id,
            cohort: computed.cohort,
            total_score: computed.total_score,
            average_score: Some(computed.average_score),
            grade_letter: Some(computed.grade_letter),
            remark: Some(computed.remark),
            position,
            subject_count: computed.subject_count,
            lines: computed.lines,
            generated_at,
        }
    }
}

/// Sums every gradable approved subject for one student. Subjects without an
/// approved sheet never reach this function, so they are excluded rather than zeroed.
pub fn aggregate_subjects(
    student_id: StudentId,
    cohort: CohortKey,
    grades: &[ApprovedSubjectGrade],
    scale: &GradeScale,
) -> Result<ComputedResult, DomainError> {
    let mut lines: Vec<ResultSubjectLine> = grades
        .iter()
        .filter_map(|grade| {
            let (ca, exam, total) = (grade.ca_score?, grade.exam_score?, grade.total_score?);
            let band = scale.band_for(total);
            Some(ResultSubjectLine {
                subject_id: grade.subject_id,
                ca_score: ca,
                exam_score: exam,
                total_score: total,
                grade_letter: band.letter.clone(),
                remark: band.remark.clone(),
            })
        })
        .collect();

    if lines.is_empty() {
        return Err(DomainError::InsufficientData(student_id));
    }

    lines.sort_by_key(|line| line.subject_id);

    let subject_count = u32::try_from(lines.len()).unwrap_or(u32::MAX);
    let total_score: Decimal = lines.iter().map(|line| line.total_score).sum();
    let average_score = round_score(total_score / Decimal::from(subject_count));
    let band = scale.band_for(average_score);

    Ok(ComputedResult {
        student_id,
        cohort,
        total_score,
        average_score,
        grade_letter: band.letter.clone(),
        remark: band.remark.clone(),
        subject_count,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AcademicSessionId, ClassId, TermId};
    use rust_decimal_macros::dec;

    fn cohort() -> CohortKey {
        CohortKey::new(ClassId::new(), TermId::new(), AcademicSessionId::new())
    }

    fn approved(ca: Option<Decimal>, exam: Option<Decimal>) -> ApprovedSubjectGrade {
        ApprovedSubjectGrade {
            submission_id: SubmissionId::new(),
            subject_id: SubjectId::new(),
            ca_score: ca,
            exam_score: exam,
            total_score: ca.zip(exam).map(|(ca, exam)| ca + exam),
        }
    }

    #[test]
    fn two_subjects_aggregate_to_total_and_average() {
        let grades = [
            approved(Some(dec!(25)), Some(dec!(60))),
            approved(Some(dec!(20)), Some(dec!(50))),
        ];

        let result = aggregate_subjects(StudentId::new(), cohort(), &grades, &GradeScale::default())
            .expect("aggregation should succeed");

        assert_eq!(result.total_score, dec!(155));
        assert_eq!(result.average_score, dec!(77.5));
        assert_eq!(result.subject_count, 2);
        assert_eq!(result.grade_letter.as_str(), "A");
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn average_is_rounded_half_up_to_two_places() {
        let grades = [
            approved(Some(dec!(25)), Some(dec!(60))),
            approved(Some(dec!(20)), Some(dec!(50))),
            approved(Some(dec!(10)), Some(dec!(20))),
        ];

        let result = aggregate_subjects(StudentId::new(), cohort(), &grades, &GradeScale::default())
            .expect("aggregation should succeed");

        assert_eq!(result.total_score, dec!(185));
        assert_eq!(result.average_score, dec!(61.67));
        assert_eq!(result.subject_count, 3);
        assert_eq!(result.grade_letter.as_str(), "B");
    }

    #[test]
    fn round_score_breaks_ties_upward() {
        assert_eq!(round_score(dec!(61.665)), dec!(61.67));
        assert_eq!(round_score(dec!(61.664)), dec!(61.66));
        assert_eq!(round_score(dec!(50.005)), dec!(50.01));
    }

    #[test]
    fn partial_rows_are_excluded_from_count_and_total() {
        let grades = [
            approved(Some(dec!(25)), Some(dec!(60))),
            approved(Some(dec!(20)), None),
        ];

        let result = aggregate_subjects(StudentId::new(), cohort(), &grades, &GradeScale::default())
            .expect("aggregation should succeed");

        assert_eq!(result.subject_count, 1);
        assert_eq!(result.total_score, dec!(85));
        assert_eq!(result.average_score, dec!(85));
    }

    #[test]
    fn no_gradable_subject_is_insufficient_data() {
        let student = StudentId::new();
        let grades = [approved(None, Some(dec!(40)))];

        let err = aggregate_subjects(student, cohort(), &grades, &GradeScale::default())
            .expect_err("no gradable subject should fail");
        assert_eq!(err, DomainError::InsufficientData(student));

        let err = aggregate_subjects(student, cohort(), &[], &GradeScale::default())
            .expect_err("empty input should fail");
        assert_eq!(err, DomainError::InsufficientData(student));
    }

    #[test]
    fn aggregation_is_order_independent() {
        let student = StudentId::new();
        let cohort = cohort();
        let mut grades = vec![
            approved(Some(dec!(25)), Some(dec!(60))),
            approved(Some(dec!(20)), Some(dec!(50))),
            approved(Some(dec!(7.5)), Some(dec!(33))),
        ];

        let first = aggregate_subjects(student, cohort, &grades, &GradeScale::default())
            .expect("aggregation should succeed");
        grades.reverse();
        let second = aggregate_subjects(student, cohort, &grades, &GradeScale::default())
            .expect("aggregation should succeed");

        assert_eq!(first, second);
    }
}
