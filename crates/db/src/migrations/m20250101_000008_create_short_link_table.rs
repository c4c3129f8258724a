//! Create short link table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortLink::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortLink::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortLink::RecipeId).integer().not_null())
                    .col(ColumnDef::new(ShortLink::Code).string_len(6).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_short_link_recipe")
                            .from(ShortLink::Table, ShortLink::RecipeId)
                            .to(Recipe::Table, Recipe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: recipe_id (one link per recipe)
        manager
            .create_index(
                Index::create()
                    .name("idx_short_link_recipe_id")
                    .table(ShortLink::Table)
                    .col(ShortLink::RecipeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_short_link_code")
                    .table(ShortLink::Table)
                    .col(ShortLink::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShortLink::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ShortLink {
    Table,
    Id,
    RecipeId,
    Code,
}

#[derive(Iden)]
enum Recipe {
    Table,
    Id,
}
