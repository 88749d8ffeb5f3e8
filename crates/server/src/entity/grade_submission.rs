use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "grade_submission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub teacher_id: String,
    pub class_id: String,
    pub subject_id: String,
    pub term_id: String,
    pub session_id: String,
    pub status: i16,
    pub created_at: DateTime,
    pub submitted_at: Option<DateTime>,
    pub reviewed_at: Option<DateTime>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subject_grade::Entity")]
    SubjectGrade,
}

impl Related<super::subject_grade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubjectGrade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
