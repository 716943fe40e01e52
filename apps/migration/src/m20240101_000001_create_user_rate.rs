use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserRate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRate::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserRate::Name).string().not_null())
                    .col(
                        ColumnDef::new(UserRate::RateLimit)
                            .integer()
                            .not_null()
                            .check(Expr::col(UserRate::RateLimit).gt(0)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRate::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserRate {
    Table,
    Id,
    Name,
    RateLimit,
}
