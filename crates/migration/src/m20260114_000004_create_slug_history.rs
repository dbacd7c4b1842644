use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CountrySlugHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CountrySlugHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CountrySlugHistory::CountryId).uuid().not_null())
                    .col(ColumnDef::new(CountrySlugHistory::OldSlug).text().not_null())
                    .col(
                        ColumnDef::new(CountrySlugHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_country_slug_history_country_id")
                            .from(CountrySlugHistory::Table, CountrySlugHistory::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The history writers rely on `ON CONFLICT (old_slug) DO NOTHING`,
        // so the unique index must cover exactly that column.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_country_slug_history_old_slug")
                    .table(CountrySlugHistory::Table)
                    .col(CountrySlugHistory::OldSlug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_country_slug_history_country_id")
                    .table(CountrySlugHistory::Table)
                    .col(CountrySlugHistory::CountryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TagSlugHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TagSlugHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TagSlugHistory::TagId).uuid().not_null())
                    .col(ColumnDef::new(TagSlugHistory::OldSlug).text().not_null())
                    .col(
                        ColumnDef::new(TagSlugHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tag_slug_history_tag_id")
                            .from(TagSlugHistory::Table, TagSlugHistory::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tag_slug_history_old_slug")
                    .table(TagSlugHistory::Table)
                    .col(TagSlugHistory::OldSlug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tag_slug_history_tag_id")
                    .table(TagSlugHistory::Table)
                    .col(TagSlugHistory::TagId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostSlugHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostSlugHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostSlugHistory::PostId).uuid().not_null())
                    .col(ColumnDef::new(PostSlugHistory::CountryId).uuid().not_null())
                    .col(ColumnDef::new(PostSlugHistory::Category).text().not_null())
                    .col(ColumnDef::new(PostSlugHistory::OldSlug).text().not_null())
                    .col(
                        ColumnDef::new(PostSlugHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_slug_history_post_id")
                            .from(PostSlugHistory::Table, PostSlugHistory::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_slug_history_country_id")
                            .from(PostSlugHistory::Table, PostSlugHistory::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Post redirects are scoped, so uniqueness (and the insert's
        // conflict arbiter) covers the full (country, category, old_slug)
        // address rather than the slug alone.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_post_slug_history_scope_old_slug")
                    .table(PostSlugHistory::Table)
                    .col(PostSlugHistory::CountryId)
                    .col(PostSlugHistory::Category)
                    .col(PostSlugHistory::OldSlug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_post_slug_history_post_id")
                    .table(PostSlugHistory::Table)
                    .col(PostSlugHistory::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostSlugHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TagSlugHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CountrySlugHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CountrySlugHistory {
    Table,
    Id,
    CountryId,
    OldSlug,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TagSlugHistory {
    Table,
    Id,
    TagId,
    OldSlug,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PostSlugHistory {
    Table,
    Id,
    PostId,
    CountryId,
    Category,
    OldSlug,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Countries {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
}
