use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(waypost_migration::Migrator).await;
}
