use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cohort_statistics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub class_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub term_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    pub highest_score: Option<Decimal>,
    pub lowest_score: Option<Decimal>,
    pub class_average: Option<Decimal>,
    pub total_students: i32,
    pub ranked_students: i32,
    pub computed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
