pub mod class_enrollment;
pub mod cohort_statistics;
pub mod grade_submission;
pub mod result_subject_line;
pub mod student_result;
pub mod subject_grade;
