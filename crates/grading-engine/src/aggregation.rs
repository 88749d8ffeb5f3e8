use std::sync::Arc;

use chrono::Utc;
use gradebook_core::domain::{
    CohortKey, ComputedResult, GradeScale, ResultStore, StudentId, StudentResult,
    SubmissionStore, aggregate_subjects,
};
use tracing::info;

use crate::Result;

/// 根据已审批成绩单计算单个学生的学期成绩，并整体替换已有结果。
pub struct ResultAggregationEngine {
    submissions: Arc<dyn SubmissionStore>,
    results: Arc<dyn ResultStore>,
    scale: Arc<GradeScale>,
}

impl ResultAggregationEngine {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        results: Arc<dyn ResultStore>,
        scale: Arc<GradeScale>,
    ) -> Self {
        Self {
            submissions,
            results,
            scale,
        }
    }

    /// 只计算不落库。输入不变时结果逐字段一致。
    pub async fn compute(&self, student_id: StudentId, cohort: CohortKey) -> Result<ComputedResult> {
        let grades = self.submissions.approved_grades(student_id, cohort).await?;
        Ok(aggregate_subjects(student_id, cohort, &grades, &self.scale)?)
    }

    /// 计算并持久化。没有可计分科目时返回 `InsufficientData`，已有结果保持不变。
    #[tracing::instrument(skip(self))]
    pub async fn aggregate(&self, student_id: StudentId, cohort: CohortKey) -> Result<StudentResult> {
        let computed = self.compute(student_id, cohort).await?;
        let result = self.results.replace_result(computed, Utc::now()).await?;

        info!(
            student_id = %student_id,
            cohort = %cohort,
            result_id = %result.id,
            subject_count = result.subject_count,
            total_score = %result.total_score,
            "student result generated"
        );

        Ok(result)
    }
}
