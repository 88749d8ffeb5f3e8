#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gradebook_core::domain::{
    AcademicSessionId, ClassId, ClassStatistics, CohortKey, CohortRanking, ComputedResult,
    GradeSubmission, ResultStore, StoreError, StudentId, StudentResult, SubjectGradeInput,
    SubjectId, SubmissionKey, TermId, UserId,
};
use grading_engine::{Gradebook, GradebookConfig, InMemoryEnrollment, InMemoryGradebookStore};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

pub fn row(student_id: StudentId, ca: Decimal, exam: Decimal) -> SubjectGradeInput {
    SubjectGradeInput::new(student_id, Some(ca), Some(exam))
}

pub fn config(regenerate_on_approval: bool) -> GradebookConfig {
    let mut config = GradebookConfig::default();
    config.generation.regenerate_on_approval = regenerate_on_approval;
    config.generation.aggregation_timeout_ms = 1_000;
    config.generation.lock_timeout_ms = 2_000;
    config.generation.store_timeout_ms = 2_000;
    config
}

pub struct Harness {
    pub store: Arc<InMemoryGradebookStore>,
    pub enrollment: Arc<InMemoryEnrollment>,
    pub gradebook: Gradebook,
    pub cohort: CohortKey,
    pub teacher: UserId,
    pub reviewer: UserId,
}

impl Harness {
    pub fn new(config: GradebookConfig) -> Self {
        let store = Arc::new(InMemoryGradebookStore::new());
        Self::with_result_store(config, store.clone(), store)
    }

    pub fn with_result_store(
        config: GradebookConfig,
        store: Arc<InMemoryGradebookStore>,
        result_store: Arc<dyn ResultStore>,
    ) -> Self {
        let enrollment = Arc::new(InMemoryEnrollment::new());
        let gradebook = Gradebook::new(config, store.clone(), result_store, enrollment.clone())
            .expect("gradebook should initialize");

        Self {
            store,
            enrollment,
            gradebook,
            cohort: CohortKey::new(ClassId::new(), TermId::new(), AcademicSessionId::new()),
            teacher: UserId::new(),
            reviewer: UserId::new(),
        }
    }

    pub fn key(&self, subject_id: SubjectId) -> SubmissionKey {
        SubmissionKey::new(
            self.cohort.class_id,
            subject_id,
            self.cohort.term_id,
            self.cohort.session_id,
        )
    }

    pub async fn enroll(&self, count: usize) -> Vec<StudentId> {
        let mut students = Vec::with_capacity(count);
        for _ in 0..count {
            let student_id = StudentId::new();
            self.enrollment.enroll(self.cohort, student_id).await;
            students.push(student_id);
        }
        students
    }

    pub async fn submitted_sheet(
        &self,
        subject_id: SubjectId,
        rows: Vec<SubjectGradeInput>,
    ) -> GradeSubmission {
        let service = self.gradebook.submissions();
        let draft = service
            .create_draft(self.teacher, self.key(subject_id))
            .await
            .expect("draft should be created");
        service
            .upsert_grades(draft.id(), rows)
            .await
            .expect("grades should be accepted");
        service.submit(draft.id()).await.expect("sheet should submit")
    }

    pub async fn approved_sheet(
        &self,
        subject_id: SubjectId,
        rows: Vec<SubjectGradeInput>,
    ) -> GradeSubmission {
        let submitted = self.submitted_sheet(subject_id, rows).await;
        self.gradebook
            .submissions()
            .approve(submitted.id(), self.reviewer)
            .await
            .expect("sheet should approve")
            .submission
    }
}

/// Wraps the in-memory store, failing or slowing `replace_result` on demand and
/// recording how many writes overlap. `save_ranking` can be made to hang.
pub struct FaultyResultStore {
    inner: Arc<InMemoryGradebookStore>,
    fail_for: Mutex<HashSet<StudentId>>,
    write_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    ranked_during_write: AtomicBool,
    hang_ranking: AtomicBool,
}

impl FaultyResultStore {
    pub fn new(inner: Arc<InMemoryGradebookStore>, write_delay: Duration) -> Self {
        Self {
            inner,
            fail_for: Mutex::new(HashSet::new()),
            write_delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            ranked_during_write: AtomicBool::new(false),
            hang_ranking: AtomicBool::new(false),
        }
    }

    pub async fn fail_for(&self, student_id: StudentId) {
        self.fail_for.lock().await.insert(student_id);
    }

    pub fn hang_ranking(&self) {
        self.hang_ranking.store(true, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn ranked_during_write(&self) -> bool {
        self.ranked_during_write.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultStore for FaultyResultStore {
    async fn replace_result(
        &self,
        computed: ComputedResult,
        generated_at: DateTime<Utc>,
    ) -> Result<StudentResult, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.write_delay).await;
        let outcome = if self.fail_for.lock().await.contains(&computed.student_id) {
            Err(StoreError::Unavailable("injected write failure".to_string()))
        } else {
            self.inner.replace_result(computed, generated_at).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn find_result(
        &self,
        student_id: StudentId,
        cohort: CohortKey,
    ) -> Result<Option<StudentResult>, StoreError> {
        self.inner.find_result(student_id, cohort).await
    }

    async fn list_cohort_results(&self, cohort: CohortKey) -> Result<Vec<StudentResult>, StoreError> {
        self.inner.list_cohort_results(cohort).await
    }

    async fn save_ranking(&self, ranking: &CohortRanking) -> Result<(), StoreError> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.ranked_during_write.store(true, Ordering::SeqCst);
        }
        if self.hang_ranking.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.save_ranking(ranking).await
    }

    async fn find_statistics(
        &self,
        cohort: CohortKey,
    ) -> Result<Option<ClassStatistics>, StoreError> {
        self.inner.find_statistics(cohort).await
    }
}
