//! Relation kinds linking records to each other
//!

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The kind of a many-to-many link row. Content records only ever use
/// [RelationType::ContentCategory]; the others belong to posts and pages.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RelationType {
    #[default]
    #[sea_orm(string_value = "CONTENTCATEGORY")]
    ContentCategory,
    #[sea_orm(string_value = "POSTCATEGORY")]
    PostCategory,
    #[sea_orm(string_value = "PAGECATEGORY")]
    PageCategory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveEnum;

    #[test]
    fn test_relation_type_db_values() {
        assert_eq!(
            RelationType::ContentCategory.to_value(),
            "CONTENTCATEGORY".to_string()
        );
        assert_eq!(
            RelationType::try_from_value(&"PAGECATEGORY".to_string()).expect("valid value"),
            RelationType::PageCategory
        );
        assert!(RelationType::try_from_value(&"NOPE".to_string()).is_err());
    }
}
