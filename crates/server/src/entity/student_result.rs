use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "student_result")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub term_id: String,
    pub session_id: String,
    pub total_score: Decimal,
    pub average_score: Option<Decimal>,
    pub grade_letter: Option<String>,
    pub remark: Option<String>,
    pub position: Option<i32>,
    pub subject_count: i32,
    pub generated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::result_subject_line::Entity")]
    ResultSubjectLine,
}

impl Related<super::result_subject_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResultSubjectLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
