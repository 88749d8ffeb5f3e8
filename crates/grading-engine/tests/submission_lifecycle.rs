mod common;

use common::{Harness, config, row};
use gradebook_core::domain::{
    DomainError, StudentId, SubjectGradeInput, SubjectId, SubmissionId, SubmissionStatus,
    SubmissionTransition, UserId,
};
use grading_engine::{GradingError, GradingEvent, Regeneration};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_full_review_lifecycle() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let mut events = harness.gradebook.subscribe_events();
    let student = StudentId::new();

    let draft = service
        .create_draft(harness.teacher, harness.key(SubjectId::new()))
        .await
        .expect("draft should be created");
    assert_eq!(draft.status(), SubmissionStatus::Draft);
    assert!(draft.grades().is_empty());

    let updated = service
        .upsert_grades(draft.id(), vec![row(student, dec!(25), dec!(60))])
        .await
        .expect("grades should be accepted");
    assert_eq!(updated.grades()[0].total_score, Some(dec!(85)));

    let submitted = service.submit(draft.id()).await.expect("submit should succeed");
    assert_eq!(submitted.status(), SubmissionStatus::Submitted);
    assert!(submitted.submitted_at().is_some());

    let outcome = service
        .approve(draft.id(), harness.reviewer)
        .await
        .expect("approve should succeed");
    assert_eq!(outcome.submission.status(), SubmissionStatus::Approved);
    assert_eq!(outcome.submission.reviewed_by(), Some(harness.reviewer));
    assert!(matches!(outcome.regeneration, Regeneration::Disabled));

    let stored = service.get(draft.id()).await.expect("submission should be stored");
    assert_eq!(stored.status(), SubmissionStatus::Approved);

    let events = events.drain();
    assert!(matches!(events[0], GradingEvent::SubmissionCreated { .. }));
    assert!(matches!(events[1], GradingEvent::SubmissionSubmitted { .. }));
    assert!(matches!(events[2], GradingEvent::SubmissionApproved { .. }));
}

#[tokio::test]
async fn test_only_one_open_sheet_per_slot() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let key = harness.key(SubjectId::new());

    let first = service
        .create_draft(harness.teacher, key)
        .await
        .expect("first draft should be created");

    let err = service
        .create_draft(UserId::new(), key)
        .await
        .expect_err("another teacher cannot open the same slot");
    match err {
        GradingError::Conflict { key: conflict_key, existing } => {
            assert_eq!(conflict_key, key);
            assert_eq!(existing, first.id());
        }
        other => panic!("expected Conflict, got: {other:?}"),
    }

    service
        .upsert_grades(first.id(), vec![row(StudentId::new(), dec!(10), dec!(30))])
        .await
        .expect("grades should be accepted");
    service.submit(first.id()).await.expect("submit should succeed");
    service
        .reject(first.id(), harness.reviewer, "wrong term")
        .await
        .expect("reject should succeed");

    let replacement = service
        .create_draft(harness.teacher, key)
        .await
        .expect("a rejected sheet frees the slot");

    service
        .upsert_grades(replacement.id(), vec![row(StudentId::new(), dec!(10), dec!(30))])
        .await
        .expect("grades should be accepted");
    service.submit(replacement.id()).await.expect("submit should succeed");
    service
        .approve(replacement.id(), harness.reviewer)
        .await
        .expect("approve should succeed");

    let err = service
        .create_draft(harness.teacher, key)
        .await
        .expect_err("an approved sheet keeps the slot");
    assert!(matches!(err, GradingError::Conflict { .. }));

    let history = harness.store.submissions_for(key).await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|submission| submission.id() == first.id()
        && submission.status() == SubmissionStatus::Rejected));
    assert!(history.iter().any(|submission| submission.id() == replacement.id()
        && submission.status() == SubmissionStatus::Approved));
}

#[tokio::test]
async fn test_grades_are_frozen_after_submit() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let submitted = harness
        .submitted_sheet(SubjectId::new(), vec![row(StudentId::new(), dec!(10), dec!(40))])
        .await;

    let err = service
        .upsert_grades(submitted.id(), vec![row(StudentId::new(), dec!(1), dec!(1))])
        .await
        .expect_err("submitted sheet is read-only");

    match err {
        GradingError::InvalidState(DomainError::InvalidTransition { current, attempted }) => {
            assert_eq!(current, SubmissionStatus::Submitted);
            assert_eq!(attempted, SubmissionTransition::UpsertGrades);
        }
        other => panic!("expected InvalidState, got: {other:?}"),
    }

    let err = service
        .submit(submitted.id())
        .await
        .expect_err("repeated submit must fail");
    assert!(matches!(err, GradingError::InvalidState(_)));
}

#[tokio::test]
async fn test_submit_requires_gradable_row() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let draft = service
        .create_draft(harness.teacher, harness.key(SubjectId::new()))
        .await
        .expect("draft should be created");

    service
        .upsert_grades(
            draft.id(),
            vec![SubjectGradeInput::new(StudentId::new(), Some(dec!(20)), None)],
        )
        .await
        .expect("partial row is valid");

    let err = service
        .submit(draft.id())
        .await
        .expect_err("partial rows only cannot be submitted");
    assert!(matches!(
        err,
        GradingError::Validation(DomainError::NothingToSubmit)
    ));
    assert_eq!(
        service.get(draft.id()).await.expect("stored").status(),
        SubmissionStatus::Draft
    );
}

#[tokio::test]
async fn test_out_of_range_score_is_rejected() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let draft = service
        .create_draft(harness.teacher, harness.key(SubjectId::new()))
        .await
        .expect("draft should be created");

    let err = service
        .upsert_grades(draft.id(), vec![row(StudentId::new(), dec!(20), dec!(71))])
        .await
        .expect_err("exam above 70 is invalid");
    assert!(matches!(
        err,
        GradingError::Validation(DomainError::ScoreOutOfRange { .. })
    ));

    let stored = service.get(draft.id()).await.expect("stored");
    assert!(stored.grades().is_empty());
}

#[tokio::test]
async fn test_review_transitions_require_submitted_state() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let draft = service
        .create_draft(harness.teacher, harness.key(SubjectId::new()))
        .await
        .expect("draft should be created");

    let err = service
        .approve(draft.id(), harness.reviewer)
        .await
        .expect_err("draft cannot be approved");
    assert!(matches!(err, GradingError::InvalidState(_)));

    let err = service
        .reject(draft.id(), harness.reviewer, "not ready")
        .await
        .expect_err("draft cannot be rejected");
    assert!(matches!(err, GradingError::InvalidState(_)));
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let submitted = harness
        .submitted_sheet(SubjectId::new(), vec![row(StudentId::new(), dec!(10), dec!(40))])
        .await;

    let err = service
        .reject(submitted.id(), harness.reviewer, "  ")
        .await
        .expect_err("empty reason is invalid");
    assert!(matches!(
        err,
        GradingError::Validation(DomainError::EmptyRejectionReason)
    ));

    let err = service
        .reject(submitted.id(), harness.reviewer, &"x".repeat(256))
        .await
        .expect_err("overlong reason is invalid");
    assert!(matches!(
        err,
        GradingError::Validation(DomainError::RejectionReasonTooLong(256))
    ));

    let rejected = service
        .reject(submitted.id(), harness.reviewer, "exam scores missing for two students")
        .await
        .expect("reject should succeed");
    assert_eq!(rejected.status(), SubmissionStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason().map(|reason| reason.as_str()),
        Some("exam scores missing for two students")
    );

    let err = service
        .approve(submitted.id(), harness.reviewer)
        .await
        .expect_err("rejected sheet cannot be approved");
    assert!(matches!(err, GradingError::InvalidState(_)));
}

#[tokio::test]
async fn test_reject_does_not_touch_results() {
    let harness = Harness::new(config(true));
    let students = harness.enroll(1).await;
    let student = students[0];

    harness
        .approved_sheet(SubjectId::new(), vec![row(student, dec!(25), dec!(60))])
        .await;
    let before = harness
        .gradebook
        .results()
        .result_for(student, harness.cohort)
        .await
        .expect("approval should have generated a result");

    let submitted = harness
        .submitted_sheet(SubjectId::new(), vec![row(student, dec!(1), dec!(1))])
        .await;
    harness
        .gradebook
        .submissions()
        .reject(submitted.id(), harness.reviewer, "scores look wrong")
        .await
        .expect("reject should succeed");

    let after = harness
        .gradebook
        .results()
        .result_for(student, harness.cohort)
        .await
        .expect("result should still exist");
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_reopen_rejected_sheet() {
    let harness = Harness::new(config(false));
    let service = harness.gradebook.submissions();
    let student = StudentId::new();
    let submitted = harness
        .submitted_sheet(SubjectId::new(), vec![row(student, dec!(10), dec!(40))])
        .await;

    let err = service
        .reopen(submitted.id(), harness.teacher)
        .await
        .expect_err("only rejected sheets can be reopened");
    assert!(matches!(err, GradingError::InvalidState(_)));

    service
        .reject(submitted.id(), harness.reviewer, "recheck exam")
        .await
        .expect("reject should succeed");

    let reopened = service
        .reopen(submitted.id(), harness.teacher)
        .await
        .expect("rejected sheet can be reopened");
    assert_ne!(reopened.id(), submitted.id());
    assert_eq!(reopened.status(), SubmissionStatus::Draft);
    assert_eq!(reopened.grades().len(), 1);
    assert_eq!(reopened.grades()[0].student_id, student);

    let err = service
        .reopen(submitted.id(), harness.teacher)
        .await
        .expect_err("slot is taken by the reopened draft");
    assert!(matches!(err, GradingError::Conflict { .. }));
}

#[tokio::test]
async fn test_unknown_submission_is_not_found() {
    let harness = Harness::new(config(false));
    let missing = SubmissionId::new();

    let err = harness
        .gradebook
        .submissions()
        .submit(missing)
        .await
        .expect_err("unknown submission");

    match err {
        GradingError::NotFound(message) => assert!(message.contains(&missing.to_string())),
        other => panic!("expected NotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_approval_triggers_generation_after_commit() {
    let harness = Harness::new(config(true));
    let students = harness.enroll(2).await;
    let mut events = harness.gradebook.subscribe_events();

    let submitted = harness
        .submitted_sheet(
            SubjectId::new(),
            vec![
                row(students[0], dec!(25), dec!(60)),
                row(students[1], dec!(20), dec!(50)),
            ],
        )
        .await;
    let outcome = harness
        .gradebook
        .submissions()
        .approve(submitted.id(), harness.reviewer)
        .await
        .expect("approve should succeed");

    let summary = match outcome.regeneration {
        Regeneration::Completed(summary) => summary,
        other => panic!("expected completed regeneration, got: {other:?}"),
    };
    assert_eq!(summary.succeeded, 2);
    assert!(summary.failed.is_empty());

    let events = events.drain();
    let approved_at = events
        .iter()
        .position(|event| matches!(event, GradingEvent::SubmissionApproved { .. }))
        .expect("approval event");
    let first_generated = events
        .iter()
        .position(|event| matches!(event, GradingEvent::ResultGenerated { .. }))
        .expect("generation event");
    assert!(approved_at < first_generated);
    assert!(events
        .iter()
        .any(|event| matches!(event, GradingEvent::ClassGenerationCompleted { succeeded: 2, .. })));
}
