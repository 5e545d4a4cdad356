//! Persistence for content records and their relations
//!
//! Writes only happen through a [RepositoryTransaction], so a content row and
//! its relation rows are always committed or rolled back together.

use async_trait::async_trait;
use chrono::Utc;
use mediadesk_shared::error::ContentError;
use mediadesk_shared::relation::RelationType;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, Order, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::entity::{category, content, extension, relation};

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fails with [ContentError::NotFound] if there's no such record.
    async fn get_by_id(&self, id: Uuid) -> Result<content::Model, ContentError>;

    /// Related ids for `data_id`, in the order they were written.
    async fn get_related_ids(
        &self,
        data_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<Uuid>, ContentError>;

    /// All categories, ordered by name.
    async fn list_categories(&self) -> Result<Vec<category::Model>, ContentError>;

    /// Every category extension, grouped by the category that owns it.
    async fn list_category_extensions(&self) -> Result<Vec<extension::Model>, ContentError>;

    async fn begin_transaction(&self) -> Result<Box<dyn RepositoryTransaction>, ContentError>;
}

#[async_trait]
pub trait RepositoryTransaction: Send {
    /// Insert when `is_new`, otherwise update. New records get an id if they don't have one.
    async fn save_content(
        &mut self,
        content: content::Model,
        is_new: bool,
    ) -> Result<content::Model, ContentError>;

    /// Removes every relation owned by `data_id`, whatever its type.
    async fn delete_relations_by_data_id(&mut self, data_id: Uuid) -> Result<u64, ContentError>;

    async fn insert_relation(
        &mut self,
        data_id: Uuid,
        related_id: Uuid,
        relation_type: RelationType,
    ) -> Result<(), ContentError>;

    /// Fails with [ContentError::NotFound] if there's no such record.
    async fn delete_content(&mut self, id: Uuid) -> Result<(), ContentError>;

    async fn commit(self: Box<Self>) -> Result<(), ContentError>;

    async fn rollback(self: Box<Self>) -> Result<(), ContentError>;
}

/// [ContentRepository] backed by the sea-orm connection
#[derive(Clone)]
pub struct SeaOrmRepository {
    conn: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ContentRepository for SeaOrmRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<content::Model, ContentError> {
        content::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("Content {} not found", id)))
    }

    async fn get_related_ids(
        &self,
        data_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<Uuid>, ContentError> {
        let ids = relation::Entity::find()
            .select_only()
            .column(relation::Column::RelatedId)
            .filter(relation::Column::DataId.eq(data_id))
            .filter(relation::Column::RelationType.eq(relation_type))
            .order_by(Expr::cust("rowid"), Order::Asc)
            .into_tuple::<Uuid>()
            .all(&self.conn)
            .await?;
        Ok(ids)
    }

    async fn list_categories(&self) -> Result<Vec<category::Model>, ContentError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .order_by_asc(category::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(categories)
    }

    async fn list_category_extensions(&self) -> Result<Vec<extension::Model>, ContentError> {
        let extensions = extension::Entity::find()
            .order_by_asc(extension::Column::ParentId)
            .order_by(Expr::cust("rowid"), Order::Asc)
            .all(&self.conn)
            .await?;
        Ok(extensions)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn RepositoryTransaction>, ContentError> {
        let txn = self.conn.begin().await?;
        Ok(Box::new(SeaOrmTransaction { txn }))
    }
}

pub struct SeaOrmTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl RepositoryTransaction for SeaOrmTransaction {
    async fn save_content(
        &mut self,
        mut content: content::Model,
        is_new: bool,
    ) -> Result<content::Model, ContentError> {
        let now = Utc::now();
        content.updated = now;

        if is_new {
            if content.id.is_nil() {
                content.id = Uuid::new_v4();
            }
            content.created = now;
            debug!("Inserting content {}", content.id);
            content
                .into_active_model()
                .insert(&self.txn)
                .await
                .inspect_err(|err| error!("Failed to insert content: {:?}", err))
                .map_err(ContentError::from)
        } else {
            let id = content.id;
            debug!("Updating content {}", id);
            content
                .into_active_model()
                .reset_all()
                .update(&self.txn)
                .await
                .map_err(|err| match err {
                    DbErr::RecordNotUpdated => {
                        ContentError::NotFound(format!("Content {} not found", id))
                    }
                    other => {
                        error!("Failed to update content {}: {:?}", id, other);
                        ContentError::from(other)
                    }
                })
        }
    }

    async fn delete_relations_by_data_id(&mut self, data_id: Uuid) -> Result<u64, ContentError> {
        let res = relation::Entity::delete_many()
            .filter(relation::Column::DataId.eq(data_id))
            .exec(&self.txn)
            .await?;
        debug!("Deleted {} relations for {}", res.rows_affected, data_id);
        Ok(res.rows_affected)
    }

    async fn insert_relation(
        &mut self,
        data_id: Uuid,
        related_id: Uuid,
        relation_type: RelationType,
    ) -> Result<(), ContentError> {
        relation::ActiveModel {
            id: Set(Uuid::new_v4()),
            data_id: Set(data_id),
            related_id: Set(related_id),
            relation_type: Set(relation_type),
        }
        .insert(&self.txn)
        .await
        .inspect_err(|err| error!("Failed to insert relation {data_id} -> {related_id}: {err:?}"))?;
        Ok(())
    }

    async fn delete_content(&mut self, id: Uuid) -> Result<(), ContentError> {
        let res = content::Entity::delete_by_id(id).exec(&self.txn).await?;
        if res.rows_affected == 0 {
            return Err(ContentError::NotFound(format!("Content {} not found", id)));
        }
        debug!("Deleted content {}", id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), ContentError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ContentError> {
        self.txn.rollback().await?;
        Ok(())
    }
}
