//! 进程内存储实现，适用于单实例部署与测试。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gradebook_core::domain::{
    AcademicSessionId, ApprovedSubjectGrade, ClassId, ClassStatistics, CohortKey, CohortRanking,
    ComputedResult, EnrollmentProvider, GradeSubmission, ResultId, ResultStore, StoreError,
    StudentId, StudentResult, SubmissionId, SubmissionKey, SubmissionStatus, SubmissionStore,
    TermId,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreState {
    submissions: HashMap<SubmissionId, GradeSubmission>,
    results: HashMap<(StudentId, CohortKey), StudentResult>,
    statistics: HashMap<CohortKey, ClassStatistics>,
}

/// 成绩单与成绩结果的内存存储。每个操作在一次写锁内完成，天然满足原子替换。
#[derive(Default)]
pub struct InMemoryGradebookStore {
    state: RwLock<StoreState>,
}

impl InMemoryGradebookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某个学生在所有班级中的成绩结果。
    pub async fn results_for_student(&self, student_id: StudentId) -> Vec<StudentResult> {
        let state = self.state.read().await;
        state
            .results
            .values()
            .filter(|result| result.student_id == student_id)
            .cloned()
            .collect()
    }

    /// 按成绩单槽位列出全部提交（含已驳回），用于审计。
    pub async fn submissions_for(&self, key: SubmissionKey) -> Vec<GradeSubmission> {
        let state = self.state.read().await;
        let mut submissions: Vec<GradeSubmission> = state
            .submissions
            .values()
            .filter(|submission| submission.key() == key)
            .cloned()
            .collect();
        submissions.sort_by_key(|submission| submission.created_at());
        submissions
    }
}

#[async_trait]
impl SubmissionStore for InMemoryGradebookStore {
    async fn insert_draft(&self, submission: &GradeSubmission) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .submissions
            .values()
            .find(|existing| existing.key() == submission.key() && existing.status().occupies_slot())
        {
            return Err(StoreError::ActiveSubmissionExists(existing.id()));
        }

        state
            .submissions
            .insert(submission.id(), submission.clone());
        Ok(())
    }

    async fn find_submission(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<GradeSubmission>, StoreError> {
        let state = self.state.read().await;
        Ok(state.submissions.get(&submission_id).cloned())
    }

    async fn save_submission(
        &self,
        submission: &GradeSubmission,
        expected: SubmissionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .get_mut(&submission.id())
            .ok_or_else(|| StoreError::Failed(format!("submission {} not found", submission.id())))?;

        if stored.status() != expected {
            return Err(StoreError::StaleSubmission {
                id: submission.id(),
                expected,
                found: stored.status(),
            });
        }

        *stored = submission.clone();
        Ok(())
    }

    async fn approved_grades(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Vec<ApprovedSubjectGrade>, StoreError> {
        let state = self.state.read().await;
        let grades = state
            .submissions
            .values()
            .filter(|submission| {
                submission.status() == SubmissionStatus::Approved
                    && submission.key().cohort() == cohort
            })
            .filter_map(|submission| {
                submission
                    .grades()
                    .iter()
                    .find(|grade| grade.student_id == student_id)
                    .map(|grade| ApprovedSubjectGrade {
                        submission_id: submission.id(),
                        subject_id: submission.key().subject_id,
                        ca_score: grade.ca_score,
                        exam_score: grade.exam_score,
                        total_score: grade.total_score,
                    })
            })
            .collect();
        Ok(grades)
    }
}

#[async_trait]
impl ResultStore for InMemoryGradebookStore {
    async fn replace_result(
        &self,
        computed: ComputedResult,
        generated_at: DateTime<Utc>,
    ) -> Result<StudentResult, StoreError> {
        let mut state = self.state.write().await;
        let slot = (computed.student_id, computed.cohort);
        let (id, position) = state
            .results
            .get(&slot)
            .map(|existing| (existing.id, existing.position))
            .unwrap_or_else(|| (ResultId::new(), None));

        let result = StudentResult::from_computed(id, computed, position, generated_at);
        state.results.insert(slot, result.clone());
        Ok(result)
    }

    async fn find_result(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Option<StudentResult>, StoreError> {
        let state = self.state.read().await;
        Ok(state.results.get(&(student_id, cohort)).cloned())
    }

    async fn list_cohort_results(&self, cohort: CohortKey) -> Result<Vec<StudentResult>, StoreError> {
        let state = self.state.read().await;
        let mut results: Vec<StudentResult> = state
            .results
            .values()
            .filter(|result| result.cohort == cohort)
            .cloned()
            .collect();
        results.sort_by_key(|result| result.student_id);
        Ok(results)
    }

    async fn save_ranking(&self, ranking: &CohortRanking) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let cohort = ranking.statistics.cohort;

        let known: HashSet<ResultId> = state
            .results
            .values()
            .filter(|result| result.cohort == cohort)
            .map(|result| result.id)
            .collect();
        if let Some(missing) = ranking
            .entries
            .iter()
            .find(|entry| !known.contains(&entry.result_id))
        {
            return Err(StoreError::Failed(format!(
                "result {} is not part of cohort {cohort}",
                missing.result_id
            )));
        }

        for entry in &ranking.entries {
            if let Some(result) = state.results.get_mut(&(entry.student_id, cohort)) {
                result.position = entry.position;
            }
        }
        state.statistics.insert(cohort, ranking.statistics.clone());
        Ok(())
    }

    async fn find_statistics(
        &self,
        cohort: CohortKey,
    ) -> Result<Option<ClassStatistics>, StoreError> {
        let state = self.state.read().await;
        Ok(state.statistics.get(&cohort).cloned())
    }
}

/// 静态的选课名单，满足 `EnrollmentProvider` 接口。
#[derive(Default)]
pub struct InMemoryEnrollment {
    enrollments: RwLock<HashMap<CohortKey, Vec<StudentId>>>,
}

impl InMemoryEnrollment {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enroll(&self, cohort: CohortKey, student_id: StudentId) {
        let mut enrollments = self.enrollments.write().await;
        let students = enrollments.entry(cohort).or_default();
        if !students.contains(&student_id) {
            students.push(student_id);
        }
    }
}

#[async_trait]
impl EnrollmentProvider for InMemoryEnrollment {
    async fn list_enrolled_students(&self, cohort: CohortKey) -> Result<Vec<StudentId>, StoreError> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments.get(&cohort).cloned().unwrap_or_default())
    }

    async fn current_class(
        &self,
        student_id: StudentId,
        term_id: TermId,
        session_id: AcademicSessionId,
    ) -> Result<Option<ClassId>, StoreError> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .iter()
            .find(|(cohort, students)| {
                cohort.term_id == term_id
                    && cohort.session_id == session_id
                    && students.contains(&student_id)
            })
            .map(|(cohort, _)| cohort.class_id))
    }
}
