use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Content::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Content::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Content::ParentId).string())
                    .col(ColumnDef::new(Content::Filename).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Content::ContentType)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Content::Size).big_integer().not_null())
                    .col(ColumnDef::new(Content::IsImage).boolean().not_null())
                    .col(ColumnDef::new(Content::IsFolder).boolean().not_null())
                    .col(ColumnDef::new(Content::Width).integer())
                    .col(ColumnDef::new(Content::Height).integer())
                    .col(ColumnDef::new(Content::Name).string_len(128))
                    .col(ColumnDef::new(Content::AltText).string_len(128))
                    .col(ColumnDef::new(Content::Description).string_len(255))
                    .col(ColumnDef::new(Content::Created).string().not_null())
                    .col(ColumnDef::new(Content::Updated).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Category::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Category::ParentId).string())
                    .col(ColumnDef::new(Category::Name).string_len(64).not_null())
                    .col(ColumnDef::new(Category::Permalink).string_len(128).not_null())
                    .col(ColumnDef::new(Category::Description).string_len(255))
                    .col(ColumnDef::new(Category::Created).string().not_null())
                    .col(ColumnDef::new(Category::Updated).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Extension::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Extension::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Extension::ParentId).string().not_null())
                    .col(ColumnDef::new(Extension::ExtensionType).string().not_null())
                    .col(ColumnDef::new(Extension::Body).text().not_null())
                    .col(ColumnDef::new(Extension::BodyFormat).string_len(8).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_extension_category")
                            .from(Extension::Table, Extension::ParentId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // relation.data_id can point at content, posts or pages, so no foreign key
        manager
            .create_table(
                Table::create()
                    .table(Relation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Relation::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Relation::DataId).string().not_null())
                    .col(ColumnDef::new(Relation::RelatedId).string().not_null())
                    .col(ColumnDef::new(Relation::Type).string_len(16).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relation_data_id")
                    .table(Relation::Table)
                    .col(Relation::DataId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Relation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Extension::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Content::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Content {
    Table,
    Id,
    ParentId,
    Filename,
    ContentType,
    Size,
    IsImage,
    IsFolder,
    Width,
    Height,
    Name,
    AltText,
    Description,
    Created,
    Updated,
}

#[derive(DeriveIden)]
enum Category {
    Table,
    Id,
    ParentId,
    Name,
    Permalink,
    Description,
    Created,
    Updated,
}

#[derive(DeriveIden)]
enum Extension {
    Table,
    Id,
    ParentId,
    ExtensionType,
    Body,
    BodyFormat,
}

#[derive(DeriveIden)]
enum Relation {
    Table,
    Id,
    DataId,
    RelatedId,
    Type,
}
