use super::{map_db_err, parse_id};
use crate::entity::class_enrollment;
use async_trait::async_trait;
use gradebook_core::domain::{
    AcademicSessionId, ClassId, CohortKey, EnrollmentProvider, StoreError, StudentId, TermId,
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};

/// Reads class membership from the `class_enrollment` table.
#[derive(Clone)]
pub struct SeaOrmEnrollmentRepository {
    db: DatabaseConnection,
}

impl SeaOrmEnrollmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds a student to a cohort. Enrolling twice is a no-op.
    pub async fn enroll(&self, cohort: CohortKey, student_id: StudentId) -> Result<(), StoreError> {
        let active_model = class_enrollment::ActiveModel {
            class_id: Set(cohort.class_id.to_string()),
            term_id: Set(cohort.term_id.to_string()),
            session_id: Set(cohort.session_id.to_string()),
            student_id: Set(student_id.to_string()),
        };

        class_enrollment::Entity::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    class_enrollment::Column::ClassId,
                    class_enrollment::Column::TermId,
                    class_enrollment::Column::SessionId,
                    class_enrollment::Column::StudentId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

#[async_trait]
impl EnrollmentProvider for SeaOrmEnrollmentRepository {
    async fn list_enrolled_students(&self, cohort: CohortKey) -> Result<Vec<StudentId>, StoreError> {
        let models = class_enrollment::Entity::find()
            .filter(class_enrollment::Column::ClassId.eq(cohort.class_id.to_string()))
            .filter(class_enrollment::Column::TermId.eq(cohort.term_id.to_string()))
            .filter(class_enrollment::Column::SessionId.eq(cohort.session_id.to_string()))
            .order_by_asc(class_enrollment::Column::StudentId)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        models
            .into_iter()
            .map(|model| parse_id("class_enrollment.student_id", &model.student_id))
            .collect()
    }

    async fn current_class(
        &self,
        student_id: StudentId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Result<Option<ClassId>, StoreError> {
        let model = class_enrollment::Entity::find()
            .filter(class_enrollment::Column::StudentId.eq(student_id.to_string()))
            .filter(class_enrollment::Column::TermId.eq(term_id.to_string()))
            .filter(class_enrollment::Column::SessionId.eq(session_id.to_string()))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        model
            .map(|model| parse_id("class_enrollment.class_id", &model.class_id))
            .transpose()
    }
}
