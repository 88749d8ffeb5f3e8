use super::{from_db_time, map_db_err, parse_id, to_db_time};
use crate::entity::{grade_submission, subject_grade};
use async_trait::async_trait;
use chrono::Utc;
use gradebook_core::domain::{
    ApprovedSubjectGrade, CohortKey, GradeLetter, GradeSubmission, GradeSubmissionParts,
    RejectionReason, StoreError, StudentId, SubjectGrade, SubjectId, SubmissionId, SubmissionKey,
    SubmissionStatus, SubmissionStore,
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::Expr,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct SeaOrmSubmissionRepository {
    db: DatabaseConnection,
    // Serializes the slot check and insert of new drafts within this process.
    insert_guard: Arc<Mutex<()>>,
}

impl SeaOrmSubmissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            insert_guard: Arc::new(Mutex::new(())),
        }
    }

    fn map_status(code: i16) -> Result<SubmissionStatus, StoreError> {
        match code {
            0 => Ok(SubmissionStatus::Draft),
            1 => Ok(SubmissionStatus::Submitted),
            2 => Ok(SubmissionStatus::Approved),
            3 => Ok(SubmissionStatus::Rejected),
            _ => Err(StoreError::Corrupt(format!(
                "invalid grade_submission.status code from database: {code}"
            ))),
        }
    }

    fn map_status_code(status: SubmissionStatus) -> i16 {
        match status {
            SubmissionStatus::Draft => 0,
            SubmissionStatus::Submitted => 1,
            SubmissionStatus::Approved => 2,
            SubmissionStatus::Rejected => 3,
        }
    }

    fn map_key(model: &grade_submission::Model) -> Result<SubmissionKey, StoreError> {
        Ok(SubmissionKey::new(
            parse_id("grade_submission.class_id", &model.class_id)?,
            parse_id("grade_submission.subject_id", &model.subject_id)?,
            parse_id("grade_submission.term_id", &model.term_id)?,
            parse_id("grade_submission.session_id", &model.session_id)?,
        ))
    }

    fn map_grade(model: subject_grade::Model) -> Result<SubjectGrade, StoreError> {
        Ok(SubjectGrade {
            student_id: parse_id("subject_grade.student_id", &model.student_id)?,
            ca_score: model.ca_score,
            exam_score: model.exam_score,
            total_score: model.total_score,
            grade_letter: model.grade_letter.map(GradeLetter::new),
            comment: model.comment,
        })
    }

    fn map_model(
        model: grade_submission::Model,
        grades: Vec<subject_grade::Model>,
    ) -> Result<GradeSubmission, StoreError> {
        let key = Self::map_key(&model)?;
        let rejection_reason = model
            .rejection_reason
            .map(RejectionReason::new)
            .transpose()
            .map_err(|e| {
                StoreError::Corrupt(format!(
                    "invalid grade_submission.rejection_reason for '{}': {e}",
                    model.id
                ))
            })?;
        let reviewed_by = model
            .reviewed_by
            .as_deref()
            .map(|value| parse_id("grade_submission.reviewed_by", value))
            .transpose()?;

        Ok(GradeSubmission::from_parts(GradeSubmissionParts {
            id: parse_id("grade_submission.id", &model.id)?,
            key,
            teacher_id: parse_id("grade_submission.teacher_id", &model.teacher_id)?,
            status: Self::map_status(model.status)?,
            grades: grades
                .into_iter()
                .map(Self::map_grade)
                .collect::<Result<_, _>>()?,
            created_at: from_db_time(model.created_at),
            submitted_at: model.submitted_at.map(from_db_time),
            reviewed_at: model.reviewed_at.map(from_db_time),
            reviewed_by,
            rejection_reason,
        }))
    }

    fn grade_rows(submission: &GradeSubmission) -> Vec<subject_grade::ActiveModel> {
        let submission_id = submission.id().to_string();
        submission
            .grades()
            .iter()
            .map(|grade| subject_grade::ActiveModel {
                submission_id: Set(submission_id.clone()),
                student_id: Set(grade.student_id.to_string()),
                ca_score: Set(grade.ca_score),
                exam_score: Set(grade.exam_score),
                total_score: Set(grade.total_score),
                grade_letter: Set(grade.grade_letter.as_ref().map(|l| l.as_str().to_string())),
                comment: Set(grade.comment.clone()),
            })
            .collect()
    }

    async fn replace_grades<C: ConnectionTrait>(
        conn: &C,
        submission: &GradeSubmission,
    ) -> Result<(), StoreError> {
        subject_grade::Entity::delete_many()
            .filter(subject_grade::Column::SubmissionId.eq(submission.id().to_string()))
            .exec(conn)
            .await
            .map_err(map_db_err)?;

        let rows = Self::grade_rows(submission);
        if !rows.is_empty() {
            subject_grade::Entity::insert_many(rows)
                .exec(conn)
                .await
                .map_err(map_db_err)?;
        }
        Ok(())
    }

    async fn load_grades<C: ConnectionTrait>(
        conn: &C,
        submission_id: &str,
    ) -> Result<Vec<subject_grade::Model>, StoreError> {
        subject_grade::Entity::find()
            .filter(subject_grade::Column::SubmissionId.eq(submission_id))
            .order_by_asc(subject_grade::Column::StudentId)
            .all(conn)
            .await
            .map_err(map_db_err)
    }
}

#[async_trait]
impl SubmissionStore for SeaOrmSubmissionRepository {
    async fn insert_draft(&self, submission: &GradeSubmission) -> Result<(), StoreError> {
        let _guard = self.insert_guard.lock().await;
        let key = submission.key();
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let existing = grade_submission::Entity::find()
            .filter(grade_submission::Column::ClassId.eq(key.class_id.to_string()))
            .filter(grade_submission::Column::SubjectId.eq(key.subject_id.to_string()))
            .filter(grade_submission::Column::TermId.eq(key.term_id.to_string()))
            .filter(grade_submission::Column::SessionId.eq(key.session_id.to_string()))
            .filter(
                grade_submission::Column::Status
                    .ne(Self::map_status_code(SubmissionStatus::Rejected)),
            )
            .one(&txn)
            .await
            .map_err(map_db_err)?;

        if let Some(existing) = existing {
            return Err(StoreError::ActiveSubmissionExists(parse_id(
                "grade_submission.id",
                &existing.id,
            )?));
        }

        let active_model = grade_submission::ActiveModel {
            id: Set(submission.id().to_string()),
            teacher_id: Set(submission.teacher_id().to_string()),
            class_id: Set(key.class_id.to_string()),
            subject_id: Set(key.subject_id.to_string()),
            term_id: Set(key.term_id.to_string()),
            session_id: Set(key.session_id.to_string()),
            status: Set(Self::map_status_code(submission.status())),
            created_at: Set(to_db_time(submission.created_at())),
            submitted_at: Set(submission.submitted_at().map(to_db_time)),
            reviewed_at: Set(submission.reviewed_at().map(to_db_time)),
            reviewed_by: Set(submission.reviewed_by().map(|id| id.to_string())),
            rejection_reason: Set(submission
                .rejection_reason()
                .map(|reason| reason.as_str().to_string())),
            updated_at: Set(to_db_time(Utc::now())),
        };

        grade_submission::Entity::insert(active_model)
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        Self::replace_grades(&txn, submission).await?;

        txn.commit().await.map_err(map_db_err)
    }

    async fn find_submission(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<GradeSubmission>, StoreError> {
        let id = submission_id.to_string();
        let Some(model) = grade_submission::Entity::find_by_id(id.clone())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let grades = Self::load_grades(&self.db, &id).await?;
        Self::map_model(model, grades).map(Some)
    }

    async fn save_submission(
        &self,
        submission: &GradeSubmission,
        expected: SubmissionStatus,
    ) -> Result<(), StoreError> {
        let id = submission.id().to_string();
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let updated = grade_submission::Entity::update_many()
            .col_expr(
                grade_submission::Column::Status,
                Expr::value(Self::map_status_code(submission.status())),
            )
            .col_expr(
                grade_submission::Column::SubmittedAt,
                Expr::value(submission.submitted_at().map(to_db_time)),
            )
            .col_expr(
                grade_submission::Column::ReviewedAt,
                Expr::value(submission.reviewed_at().map(to_db_time)),
            )
            .col_expr(
                grade_submission::Column::ReviewedBy,
                Expr::value(submission.reviewed_by().map(|id| id.to_string())),
            )
            .col_expr(
                grade_submission::Column::RejectionReason,
                Expr::value(
                    submission
                        .rejection_reason()
                        .map(|reason| reason.as_str().to_string()),
                ),
            )
            .col_expr(
                grade_submission::Column::UpdatedAt,
                Expr::value(to_db_time(Utc::now())),
            )
            .filter(grade_submission::Column::Id.eq(id.clone()))
            .filter(grade_submission::Column::Status.eq(Self::map_status_code(expected)))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        if updated.rows_affected == 0 {
            let current = grade_submission::Entity::find_by_id(id.clone())
                .one(&txn)
                .await
                .map_err(map_db_err)?;
            return match current {
                Some(current) => Err(StoreError::StaleSubmission {
                    id: submission.id(),
                    expected,
                    found: Self::map_status(current.status)?,
                }),
                None => Err(StoreError::Failed(format!("submission {id} not found"))),
            };
        }

        Self::replace_grades(&txn, submission).await?;
        txn.commit().await.map_err(map_db_err)
    }

    async fn approved_grades(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Vec<ApprovedSubjectGrade>, StoreError> {
        let approved = grade_submission::Entity::find()
            .filter(grade_submission::Column::ClassId.eq(cohort.class_id.to_string()))
            .filter(grade_submission::Column::TermId.eq(cohort.term_id.to_string()))
            .filter(grade_submission::Column::SessionId.eq(cohort.session_id.to_string()))
            .filter(
                grade_submission::Column::Status
                    .eq(Self::map_status_code(SubmissionStatus::Approved)),
            )
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        if approved.is_empty() {
            return Ok(Vec::new());
        }

        let mut subjects = HashMap::with_capacity(approved.len());
        for model in &approved {
            let submission_id: SubmissionId = parse_id("grade_submission.id", &model.id)?;
            let subject_id: SubjectId = parse_id("grade_submission.subject_id", &model.subject_id)?;
            subjects.insert(model.id.clone(), (submission_id, subject_id));
        }

        let rows = subject_grade::Entity::find()
            .filter(
                subject_grade::Column::SubmissionId
                    .is_in(approved.iter().map(|model| model.id.clone())),
            )
            .filter(subject_grade::Column::StudentId.eq(student_id.to_string()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        rows.into_iter()
            .map(|row| {
                let (submission_id, subject_id) =
                    subjects.get(&row.submission_id).copied().ok_or_else(|| {
                        StoreError::Corrupt(format!(
                            "subject_grade row references unknown submission '{}'",
                            row.submission_id
                        ))
                    })?;
                Ok(ApprovedSubjectGrade {
                    submission_id,
                    subject_id,
                    ca_score: row.ca_score,
                    exam_score: row.exam_score,
                    total_score: row.total_score,
                })
            })
            .collect()
    }
}
