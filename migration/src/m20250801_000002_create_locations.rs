use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Location::Table)
                    .if_not_exists()
                    .col(string_len(Location::Id, 64).primary_key())
                    .col(string_len(Location::Name, 100).not_null())
                    .col(double(Location::Latitude).not_null())
                    .col(double(Location::Longitude).not_null())
                    .col(
                        integer(Location::Radius)
                            .not_null()
                            .check(Expr::col(Location::Radius).gt(0)),
                    )
                    .col(
                        timestamp_with_time_zone(Location::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Location::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed default sites
        let insert = Query::insert()
            .into_table(Location::Table)
            .columns([
                Location::Id,
                Location::Name,
                Location::Latitude,
                Location::Longitude,
                Location::Radius,
            ])
            .values_panic([
                "main-hospital".into(),
                "Main Hospital Ward".into(),
                (37.7749).into(),
                (-122.4194).into(),
                100.into(),
            ])
            .values_panic([
                "emergency-wing".into(),
                "Emergency Wing".into(),
                (37.7849).into(),
                (-122.4094).into(),
                150.into(),
            ])
            .values_panic([
                "nursing-home".into(),
                "Sunrise Nursing Home".into(),
                (37.7649).into(),
                (-122.4294).into(),
                200.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Location::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Location {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
    Radius,
    CreatedAt,
    UpdatedAt,
}
