//! Ledger entry
//!
//! `refund` holds the accumulated refund or chargeback amount and
//! `refund_type` records which one (0 none, 1 refund, 2 chargeback).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// expense | income
    pub kind: String,
    pub category_id: i64,
    #[sea_orm(column_type = "Double")]
    pub amount: f64,
    pub description: String,
    pub date: Date,
    /// month | year
    pub period_type: String,
    pub is_consumed: bool,
    #[sea_orm(column_type = "Double")]
    pub refund: f64,
    pub refund_type: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
