//! Client-side tracking events (clicks, scrolls, form submits)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_type: String,
    pub event_name: String,
    pub page_type: String,
    pub page_id: Option<i64>,
    /// anonymous visitor id supplied by the client
    pub user_id: String,
    /// JSON object, serialized
    #[sea_orm(column_type = "Text", nullable)]
    pub properties: Option<String>,
    pub ip_address: String,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
