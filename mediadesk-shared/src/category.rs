//! Category service schema
//!

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How an extension body is stored.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum BodyFormat {
    #[default]
    #[sea_orm(string_value = "plain")]
    Plain,
    #[sea_orm(string_value = "html")]
    Html,
}

/// The value of an extension, resolved once when it's loaded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "format", content = "value", rename_all = "snake_case")]
pub enum ExtensionBody {
    PlainText(String),
    RichText(String),
}

impl ExtensionBody {
    pub fn from_stored(format: BodyFormat, body: String) -> Self {
        match format {
            BodyFormat::Plain => ExtensionBody::PlainText(body),
            BodyFormat::Html => ExtensionBody::RichText(body),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Extension {
    /// Internal id of the extension type
    pub name: String,
    pub body: ExtensionBody,
}

/// A category as exposed by the category service
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub permalink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

/// Turns a category name into a url-safe permalink, "Big Cats!" becomes "big-cats"
pub fn permalink_from_name(name: &str) -> String {
    let mut permalink = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            permalink.extend(c.to_lowercase());
        } else if !permalink.is_empty() && !permalink.ends_with('-') {
            permalink.push('-');
        }
    }
    permalink.trim_end_matches('-').to_string()
}
