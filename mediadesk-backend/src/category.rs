//! Category service
//!

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use mediadesk_shared::category::{
    permalink_from_name, BodyFormat, Category, Extension, ExtensionBody,
};
use mediadesk_shared::error::ContentError;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::content::WebError;
use crate::entity::{category, extension};
use crate::repository::ContentRepository;
use crate::SharedState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

pub async fn insert_category(
    conn: &DatabaseConnection,
    new: NewCategory,
) -> Result<category::Model, ContentError> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
        return Err(ContentError::Validation(
            "Category name can't be empty".to_string(),
        ));
    }

    let txn = conn.begin().await?;
    let now = Utc::now();
    let saved = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        parent_id: Set(new.parent_id),
        permalink: Set(permalink_from_name(&name)),
        name: Set(name),
        description: Set(new.description),
        created: Set(now),
        updated: Set(now),
    }
    .insert(&txn)
    .await
    .inspect_err(|err| error!("Failed to insert category: {:?}", err))?;

    for ext in new.extensions {
        insert_extension(&txn, saved.id, ext).await?;
    }
    txn.commit().await?;

    debug!("Created category {} ({})", saved.name, saved.id);
    Ok(saved)
}

async fn insert_extension<C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
    ext: Extension,
) -> Result<(), ContentError> {
    let (body_format, body) = match ext.body {
        ExtensionBody::PlainText(body) => (BodyFormat::Plain, body),
        ExtensionBody::RichText(body) => (BodyFormat::Html, body),
    };
    extension::ActiveModel {
        id: Set(Uuid::new_v4()),
        parent_id: Set(parent_id),
        extension_type: Set(ext.name),
        body: Set(body),
        body_format: Set(body_format),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Every category ordered by name, with its extensions resolved.
pub async fn list_categories(
    repository: &dyn ContentRepository,
) -> Result<Vec<Category>, ContentError> {
    let mut extensions: HashMap<Uuid, Vec<Extension>> = HashMap::new();
    for ext in repository.list_category_extensions().await? {
        extensions.entry(ext.parent_id).or_default().push(Extension {
            body: ext.resolved_body(),
            name: ext.extension_type,
        });
    }

    Ok(repository
        .list_categories()
        .await?
        .into_iter()
        .map(|category| Category {
            extensions: extensions.remove(&category.id).unwrap_or_default(),
            id: category.id,
            name: category.name,
            permalink: category.permalink,
            description: category.description,
            created: category.created,
            updated: category.updated,
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "All categories ordered by name", body = Vec<Category>),
    )
)]
pub async fn get_categories(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Category>>, WebError> {
    let repository = state.read().await.repository.clone();
    let categories = list_categories(repository.as_ref()).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/category",
    request_body = NewCategory,
    responses(
        (status = 200, description = "Category created", body = category::Model),
        (status = 400, description = "Invalid category"),
    )
)]
pub async fn post_category(
    State(state): State<SharedState>,
    Json(new): Json<NewCategory>,
) -> Result<Json<category::Model>, WebError> {
    let saved = insert_category(&state.read().await.conn, new).await?;
    Ok(Json(saved))
}
