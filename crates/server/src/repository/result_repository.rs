use super::{from_count, from_db_time, map_db_err, parse_id, to_count, to_db_time};
use crate::entity::{cohort_statistics, result_subject_line, student_result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gradebook_core::domain::{
    ClassStatistics, CohortKey, CohortRanking, ComputedResult, GradeLetter, ResultId,
    ResultStore, ResultSubjectLine, StoreError, StudentId, StudentResult,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait, sea_query::Expr,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct SeaOrmResultRepository {
    db: DatabaseConnection,
}

impl SeaOrmResultRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_line(model: result_subject_line::Model) -> Result<ResultSubjectLine, StoreError> {
        Ok(ResultSubjectLine {
            subject_id: parse_id("result_subject_line.subject_id", &model.subject_id)?,
            ca_score: model.ca_score,
            exam_score: model.exam_score,
            total_score: model.total_score,
            grade_letter: GradeLetter::new(model.grade_letter),
            remark: model.remark,
        })
    }

    fn map_model(
        model: student_result::Model,
        lines: Vec<result_subject_line::Model>,
    ) -> Result<StudentResult, StoreError> {
        let mut lines = lines
            .into_iter()
            .map(Self::map_line)
            .collect::<Result<Vec<_>, _>>()?;
        lines.sort_by_key(|line| line.subject_id);

        Ok(StudentResult {
            id: parse_id("student_result.id", &model.id)?,
            student_id: parse_id("student_result.student_id", &model.student_id)?,
            cohort: CohortKey::new(
                parse_id("student_result.class_id", &model.class_id)?,
                parse_id("student_result.term_id", &model.term_id)?,
                parse_id("student_result.session_id", &model.session_id)?,
            ),
            total_score: model.total_score,
            average_score: model.average_score,
            grade_letter: model.grade_letter.map(GradeLetter::new),
            remark: model.remark,
            position: model
                .position
                .map(|position| to_count("student_result.position", position))
                .transpose()?,
            subject_count: to_count("student_result.subject_count", model.subject_count)?,
            lines,
            generated_at: from_db_time(model.generated_at),
        })
    }

    fn map_statistics(model: cohort_statistics::Model) -> Result<ClassStatistics, StoreError> {
        Ok(ClassStatistics {
            cohort: CohortKey::new(
                parse_id("cohort_statistics.class_id", &model.class_id)?,
                parse_id("cohort_statistics.term_id", &model.term_id)?,
                parse_id("cohort_statistics.session_id", &model.session_id)?,
            ),
            highest_score: model.highest_score,
            lowest_score: model.lowest_score,
            class_average: model.class_average,
            total_students: to_count("cohort_statistics.total_students", model.total_students)?,
            ranked_students: to_count("cohort_statistics.ranked_students", model.ranked_students)?,
            computed_at: from_db_time(model.computed_at),
        })
    }

    fn line_rows(result_id: &str, lines: &[ResultSubjectLine]) -> Vec<result_subject_line::ActiveModel> {
        lines
            .iter()
            .map(|line| result_subject_line::ActiveModel {
                result_id: Set(result_id.to_string()),
                subject_id: Set(line.subject_id.to_string()),
                ca_score: Set(line.ca_score),
                exam_score: Set(line.exam_score),
                total_score: Set(line.total_score),
                grade_letter: Set(line.grade_letter.as_str().to_string()),
                remark: Set(line.remark.clone()),
            })
            .collect()
    }

    async fn find_model<C: ConnectionTrait>(
        conn: &C,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Option<student_result::Model>, StoreError> {
        student_result::Entity::find()
            .filter(student_result::Column::StudentId.eq(student_id.to_string()))
            .filter(student_result::Column::ClassId.eq(cohort.class_id.to_string()))
            .filter(student_result::Column::TermId.eq(cohort.term_id.to_string()))
            .filter(student_result::Column::SessionId.eq(cohort.session_id.to_string()))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    async fn load_lines<C: ConnectionTrait>(
        conn: &C,
        result_ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<result_subject_line::Model>>, StoreError> {
        let mut grouped: HashMap<String, Vec<result_subject_line::Model>> = HashMap::new();
        if result_ids.is_empty() {
            return Ok(grouped);
        }

        let lines = result_subject_line::Entity::find()
            .filter(result_subject_line::Column::ResultId.is_in(result_ids))
            .all(conn)
            .await
            .map_err(map_db_err)?;
        for line in lines {
            grouped.entry(line.result_id.clone()).or_default().push(line);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl ResultStore for SeaOrmResultRepository {
    async fn replace_result(
        &self,
        computed: ComputedResult,
        generated_at: DateTime<Utc>,
    ) -> Result<StudentResult, StoreError> {
        let cohort = computed.cohort;
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let existing = Self::find_model(&txn, computed.student_id, cohort).await?;
        let (id, position) = match &existing {
            Some(model) => (
                parse_id::<ResultId>("student_result.id", &model.id)?,
                model
                    .position
                    .map(|position| to_count("student_result.position", position))
                    .transpose()?,
            ),
            None => (ResultId::new(), None),
        };
        let result = StudentResult::from_computed(id, computed, position, generated_at);
        let result_id = id.to_string();

        let total_score = Set(result.total_score);
        let average_score = Set(result.average_score);
        let grade_letter = Set(result
            .grade_letter
            .as_ref()
            .map(|letter| letter.as_str().to_string()));
        let remark = Set(result.remark.clone());
        let subject_count = Set(from_count("student_result.subject_count", result.subject_count)?);

        match existing {
            Some(model) => {
                let mut active_model: student_result::ActiveModel = model.into();
                active_model.total_score = total_score;
                active_model.average_score = average_score;
                active_model.grade_letter = grade_letter;
                active_model.remark = remark;
                active_model.subject_count = subject_count;
                active_model.generated_at = Set(to_db_time(generated_at));
                active_model.update(&txn).await.map_err(map_db_err)?;

                result_subject_line::Entity::delete_many()
                    .filter(result_subject_line::Column::ResultId.eq(result_id.clone()))
                    .exec(&txn)
                    .await
                    .map_err(map_db_err)?;
            }
            None => {
                let active_model = student_result::ActiveModel {
                    id: Set(result_id.clone()),
                    student_id: Set(result.student_id.to_string()),
                    class_id: Set(cohort.class_id.to_string()),
                    term_id: Set(cohort.term_id.to_string()),
                    session_id: Set(cohort.session_id.to_string()),
                    total_score,
                    average_score,
                    grade_letter,
                    remark,
                    position: Set(None),
                    subject_count,
                    generated_at: Set(to_db_time(generated_at)),
                };
                student_result::Entity::insert(active_model)
                    .exec_without_returning(&txn)
                    .await
                    .map_err(map_db_err)?;
            }
        }

        let rows = Self::line_rows(&result_id, &result.lines);
        if !rows.is_empty() {
            result_subject_line::Entity::insert_many(rows)
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)?;
        Ok(result)
    }

    async fn find_result(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Option<StudentResult>, StoreError> {
        let Some(model) = Self::find_model(&self.db, student_id, cohort).await? else {
            return Ok(None);
        };

        let mut lines = Self::load_lines(&self.db, vec![model.id.clone()]).await?;
        let lines = lines.remove(&model.id).unwrap_or_default();
        Self::map_model(model, lines).map(Some)
    }

    async fn list_cohort_results(&self, cohort: CohortKey) -> Result<Vec<StudentResult>, StoreError> {
        let models = student_result::Entity::find()
            .filter(student_result::Column::ClassId.eq(cohort.class_id.to_string()))
            .filter(student_result::Column::TermId.eq(cohort.term_id.to_string()))
            .filter(student_result::Column::SessionId.eq(cohort.session_id.to_string()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let ids = models.iter().map(|model| model.id.clone()).collect();
        let mut lines = Self::load_lines(&self.db, ids).await?;

        let mut results = models
            .into_iter()
            .map(|model| {
                let model_lines = lines.remove(&model.id).unwrap_or_default();
                Self::map_model(model, model_lines)
            })
            .collect::<Result<Vec<_>, _>>()?;
        results.sort_by_key(|result| result.student_id);
        Ok(results)
    }

    async fn save_ranking(&self, ranking: &CohortRanking) -> Result<(), StoreError> {
        let statistics = &ranking.statistics;
        let cohort = statistics.cohort;
        let txn = self.db.begin().await.map_err(map_db_err)?;

        for entry in &ranking.entries {
            let position = entry
                .position
                .map(|position| from_count("student_result.position", position))
                .transpose()?;
            let updated = student_result::Entity::update_many()
                .col_expr(student_result::Column::Position, Expr::value(position))
                .filter(student_result::Column::Id.eq(entry.result_id.to_string()))
                .filter(student_result::Column::ClassId.eq(cohort.class_id.to_string()))
                .filter(student_result::Column::TermId.eq(cohort.term_id.to_string()))
                .filter(student_result::Column::SessionId.eq(cohort.session_id.to_string()))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;

            if updated.rows_affected == 0 {
                return Err(StoreError::Failed(format!(
                    "result {} is not part of cohort {cohort}",
                    entry.result_id
                )));
            }
        }

        cohort_statistics::Entity::delete_many()
            .filter(cohort_statistics::Column::ClassId.eq(cohort.class_id.to_string()))
            .filter(cohort_statistics::Column::TermId.eq(cohort.term_id.to_string()))
            .filter(cohort_statistics::Column::SessionId.eq(cohort.session_id.to_string()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        let active_model = cohort_statistics::ActiveModel {
            class_id: Set(cohort.class_id.to_string()),
            term_id: Set(cohort.term_id.to_string()),
            session_id: Set(cohort.session_id.to_string()),
            highest_score: Set(statistics.highest_score),
            lowest_score: Set(statistics.lowest_score),
            class_average: Set(statistics.class_average),
            total_students: Set(from_count(
                "cohort_statistics.total_students",
                statistics.total_students,
            )?),
            ranked_students: Set(from_count(
                "cohort_statistics.ranked_students",
                statistics.ranked_students,
            )?),
            computed_at: Set(to_db_time(statistics.computed_at)),
        };
        cohort_statistics::Entity::insert(active_model)
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)
    }

    async fn find_statistics(
        &self,
        cohort: CohortKey,
    ) -> Result<Option<ClassStatistics>, StoreError> {
        let model = cohort_statistics::Entity::find_by_id((
            cohort.class_id.to_string(),
            cohort.term_id.to_string(),
            cohort.session_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(map_db_err)?;

        model.map(Self::map_statistics).transpose()
    }
}
