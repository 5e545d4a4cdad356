use sea_orm_migration::prelude::*;
use uuid::Uuid;

/// Fallback category every install starts with
pub const DEFAULT_CATEGORY_ID: Uuid = Uuid::from_u128(0x7f3c_51a2_0d4e_4c8b_9a61_2e5f_c0de_0001);

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = chrono::Utc::now().to_rfc3339();
        let insert = Query::insert()
            .into_table(Category::Table)
            .columns([
                Category::Id,
                Category::Name,
                Category::Permalink,
                Category::Created,
                Category::Updated,
            ])
            .values_panic([
                DEFAULT_CATEGORY_ID.into(),
                "Uncategorized".into(),
                "uncategorized".into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Category::Table)
            .and_where(Expr::col(Category::Id).eq(DEFAULT_CATEGORY_ID))
            .to_owned();

        manager.exec_stmt(delete).await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Category {
    Table,
    Id,
    Name,
    Permalink,
    Created,
    Updated,
}
