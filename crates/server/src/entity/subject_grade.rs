use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subject_grade")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: String,
    pub ca_score: Option<Decimal>,
    pub exam_score: Option<Decimal>,
    pub total_score: Option<Decimal>,
    pub grade_letter: Option<String>,
    pub comment: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grade_submission::Entity",
        from = "Column::SubmissionId",
        to = "super::grade_submission::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GradeSubmission,
}

impl Related<super::grade_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradeSubmission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
