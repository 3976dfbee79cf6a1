use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "calculation_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Double")]
    pub operand1: f64,
    #[sea_orm(column_type = "Double")]
    pub operand2: f64,
    #[sea_orm(column_type = "String(StringLen::N(50))")]
    pub operation: String,
    #[sea_orm(column_type = "Double", nullable)]
    pub result: Option<f64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
