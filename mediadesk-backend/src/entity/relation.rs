use mediadesk_shared::relation::RelationType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A typed many-to-many link. `data_id` points at whatever owns the link
/// (content, post, page) so there's no foreign key on it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = RelationRecord)]
#[sea_orm(table_name = "relation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub data_id: Uuid,
    pub related_id: Uuid,
    #[sea_orm(column_name = "type")]
    pub relation_type: RelationType,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
