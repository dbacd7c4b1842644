use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Countries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Countries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Countries::Name).text().not_null())
                    .col(ColumnDef::new(Countries::NameEn).text())
                    .col(ColumnDef::new(Countries::Slug).text().not_null())
                    .col(ColumnDef::new(Countries::IsoA2).text())
                    .col(ColumnDef::new(Countries::IsoA3).text())
                    .col(
                        ColumnDef::new(Countries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Countries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_countries_slug")
                    .table(Countries::Table)
                    .col(Countries::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Blank ISO codes are stored as NULL, and Postgres permits
        // repeated NULLs under a unique index.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_countries_iso_a3")
                    .table(Countries::Table)
                    .col(Countries::IsoA3)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_countries_iso_a2")
                    .table(Countries::Table)
                    .col(Countries::IsoA2)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Countries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Countries {
    Table,
    Id,
    Name,
    NameEn,
    Slug,
    IsoA2,
    IsoA3,
    CreatedAt,
    UpdatedAt,
}
