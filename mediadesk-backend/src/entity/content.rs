use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ContentRecord)]
#[sea_orm(table_name = "content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub filename: String,
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub content_type: String,
    pub size: i64,
    pub is_image: bool,
    pub is_folder: bool,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub name: Option<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Default for Model {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            parent_id: None,
            filename: String::new(),
            content_type: String::new(),
            size: 0,
            is_image: false,
            is_folder: false,
            width: None,
            height: None,
            name: None,
            alt_text: None,
            description: None,
            created: now,
            updated: now,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
