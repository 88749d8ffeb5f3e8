use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GradeSubmission::Table)
                    .if_not_exists()
                    .col(string_len(GradeSubmission::Id, 36).primary_key())
                    .col(string_len(GradeSubmission::TeacherId, 36))
                    .col(string_len(GradeSubmission::ClassId, 36))
                    .col(string_len(GradeSubmission::SubjectId, 36))
                    .col(string_len(GradeSubmission::TermId, 36))
                    .col(string_len(GradeSubmission::SessionId, 36))
                    // SubmissionStatus enum is represented in app code.
                    // 0=draft, 1=submitted, 2=approved, 3=rejected
                    .col(
                        small_integer(GradeSubmission::Status)
                            .check(Expr::col(GradeSubmission::Status).gte(0))
                            .check(Expr::col(GradeSubmission::Status).lte(3)),
                    )
                    .col(timestamp(GradeSubmission::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_null(GradeSubmission::SubmittedAt))
                    .col(timestamp_null(GradeSubmission::ReviewedAt))
                    .col(string_len_null(GradeSubmission::ReviewedBy, 36))
                    .col(string_len_null(GradeSubmission::RejectionReason, 255))
                    .col(timestamp(GradeSubmission::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grade_submission_slot")
                    .table(GradeSubmission::Table)
                    .col(GradeSubmission::ClassId)
                    .col(GradeSubmission::SubjectId)
                    .col(GradeSubmission::TermId)
                    .col(GradeSubmission::SessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubjectGrade::Table)
                    .if_not_exists()
                    .col(string_len(SubjectGrade::SubmissionId, 36))
                    .col(string_len(SubjectGrade::StudentId, 36))
                    .col(decimal_len_null(SubjectGrade::CaScore, 5, 2))
                    .col(decimal_len_null(SubjectGrade::ExamScore, 5, 2))
                    .col(decimal_len_null(SubjectGrade::TotalScore, 5, 2))
                    .col(string_len_null(SubjectGrade::GradeLetter, 8))
                    .col(string_len_null(SubjectGrade::Comment, 200))
                    .primary_key(
                        Index::create()
                            .col(SubjectGrade::SubmissionId)
                            .col(SubjectGrade::StudentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-subject_grade-submission_id")
                            .from(SubjectGrade::Table, SubjectGrade::SubmissionId)
                            .to(GradeSubmission::Table, GradeSubmission::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StudentResult::Table)
                    .if_not_exists()
                    .col(string_len(StudentResult::Id, 36).primary_key())
                    .col(string_len(StudentResult::StudentId, 36))
                    .col(string_len(StudentResult::ClassId, 36))
                    .col(string_len(StudentResult::TermId, 36))
                    .col(string_len(StudentResult::SessionId, 36))
                    .col(decimal_len(StudentResult::TotalScore, 8, 2))
                    .col(decimal_len_null(StudentResult::AverageScore, 5, 2))
                    .col(string_len_null(StudentResult::GradeLetter, 8))
                    .col(string_len_null(StudentResult::Remark, 100))
                    .col(integer_null(StudentResult::Position))
                    .col(integer(StudentResult::SubjectCount).default(0))
                    .col(timestamp(StudentResult::GeneratedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_student_result_student_cohort")
                    .table(StudentResult::Table)
                    .col(StudentResult::StudentId)
                    .col(StudentResult::ClassId)
                    .col(StudentResult::TermId)
                    .col(StudentResult::SessionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_student_result_cohort")
                    .table(StudentResult::Table)
                    .col(StudentResult::ClassId)
                    .col(StudentResult::TermId)
                    .col(StudentResult::SessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ResultSubjectLine::Table)
                    .if_not_exists()
                    .col(string_len(ResultSubjectLine::ResultId, 36))
                    .col(string_len(ResultSubjectLine::SubjectId, 36))
                    .col(decimal_len(ResultSubjectLine::CaScore, 5, 2))
                    .col(decimal_len(ResultSubjectLine::ExamScore, 5, 2))
                    .col(decimal_len(ResultSubjectLine::TotalScore, 5, 2))
                    .col(string_len(ResultSubjectLine::GradeLetter, 8))
                    .col(string_len(ResultSubjectLine::Remark, 100))
                    .primary_key(
                        Index::create()
                            .col(ResultSubjectLine::ResultId)
                            .col(ResultSubjectLine::SubjectId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-result_subject_line-result_id")
                            .from(ResultSubjectLine::Table, ResultSubjectLine::ResultId)
                            .to(StudentResult::Table, StudentResult::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CohortStatistics::Table)
                    .if_not_exists()
                    .col(string_len(CohortStatistics::ClassId, 36))
                    .col(string_len(CohortStatistics::TermId, 36))
                    .col(string_len(CohortStatistics::SessionId, 36))
                    .col(decimal_len_null(CohortStatistics::HighestScore, 5, 2))
                    .col(decimal_len_null(CohortStatistics::LowestScore, 5, 2))
                    .col(decimal_len_null(CohortStatistics::ClassAverage, 5, 2))
                    .col(integer(CohortStatistics::TotalStudents))
                    .col(integer(CohortStatistics::RankedStudents))
                    .col(timestamp(CohortStatistics::ComputedAt))
                    .primary_key(
                        Index::create()
                            .col(CohortStatistics::ClassId)
                            .col(CohortStatistics::TermId)
                            .col(CohortStatistics::SessionId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClassEnrollment::Table)
                    .if_not_exists()
                    .col(string_len(ClassEnrollment::ClassId, 36))
                    .col(string_len(ClassEnrollment::TermId, 36))
                    .col(string_len(ClassEnrollment::SessionId, 36))
                    .col(string_len(ClassEnrollment::StudentId, 36))
                    .primary_key(
                        Index::create()
                            .col(ClassEnrollment::ClassId)
                            .col(ClassEnrollment::TermId)
                            .col(ClassEnrollment::SessionId)
                            .col(ClassEnrollment::StudentId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_enrollment_student")
                    .table(ClassEnrollment::Table)
                    .col(ClassEnrollment::StudentId)
                    .col(ClassEnrollment::TermId)
                    .col(ClassEnrollment::SessionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClassEnrollment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CohortStatistics::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ResultSubjectLine::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(StudentResult::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SubjectGrade::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(GradeSubmission::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum GradeSubmission {
    Table,
    Id,
    TeacherId,
    ClassId,
    SubjectId,
    TermId,
    SessionId,
    Status,
    CreatedAt,
    SubmittedAt,
    ReviewedAt,
    ReviewedBy,
    RejectionReason,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubjectGrade {
    Table,
    SubmissionId,
    StudentId,
    CaScore,
    ExamScore,
    TotalScore,
    GradeLetter,
    Comment,
}

#[derive(DeriveIden)]
enum StudentResult {
    Table,
    Id,
    StudentId,
    ClassId,
    TermId,
    SessionId,
    TotalScore,
    AverageScore,
    GradeLetter,
    Remark,
    Position,
    SubjectCount,
    GeneratedAt,
}

#[derive(DeriveIden)]
enum ResultSubjectLine {
    Table,
    ResultId,
    SubjectId,
    CaScore,
    ExamScore,
    TotalScore,
    GradeLetter,
    Remark,
}

#[derive(DeriveIden)]
enum CohortStatistics {
    Table,
    ClassId,
    TermId,
    SessionId,
    HighestScore,
    LowestScore,
    ClassAverage,
    TotalStudents,
    RankedStudents,
    ComputedAt,
}

#[derive(DeriveIden)]
enum ClassEnrollment {
    Table,
    ClassId,
    TermId,
    SessionId,
    StudentId,
}
