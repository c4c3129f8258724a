//! Create shopping cart item table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShoppingCartItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShoppingCartItem::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShoppingCartItem::UserId).integer().not_null())
                    .col(ColumnDef::new(ShoppingCartItem::RecipeId).integer().not_null())
                    .col(
                        ColumnDef::new(ShoppingCartItem::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shopping_cart_item_user")
                            .from(ShoppingCartItem::Table, ShoppingCartItem::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shopping_cart_item_recipe")
                            .from(ShoppingCartItem::Table, ShoppingCartItem::RecipeId)
                            .to(Recipe::Table, Recipe::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, recipe_id) - prevent duplicate markers
        manager
            .create_index(
                Index::create()
                    .name("idx_shopping_cart_item_user_recipe")
                    .table(ShoppingCartItem::Table)
                    .col(ShoppingCartItem::UserId)
                    .col(ShoppingCartItem::RecipeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: recipe_id (for cascading deletes and marker filters)
        manager
            .create_index(
                Index::create()
                    .name("idx_shopping_cart_item_recipe_id")
                    .table(ShoppingCartItem::Table)
                    .col(ShoppingCartItem::RecipeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShoppingCartItem::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ShoppingCartItem {
    Table,
    Id,
    UserId,
    RecipeId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Recipe {
    Table,
    Id,
}
