use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "result_subject_line")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub result_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject_id: String,
    pub ca_score: Decimal,
    pub exam_score: Decimal,
    pub total_score: Decimal,
    pub grade_letter: String,
    pub remark: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_result::Entity",
        from = "Column::ResultId",
        to = "super::student_result::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    StudentResult,
}

impl Related<super::student_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
