use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250801_000001_create_users::User;
use super::m20250801_000002_create_locations::Location;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ShiftStatus::Enum)
                    .values([ShiftStatus::ClockedIn, ShiftStatus::ClockedOut])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Shift::Table)
                    .if_not_exists()
                    .col(uuid(Shift::Id).primary_key())
                    .col(uuid(Shift::UserId).not_null())
                    .col(string_len(Shift::LocationId, 64).not_null())
                    .col(timestamp_with_time_zone(Shift::ClockInTime).not_null())
                    .col(timestamp_with_time_zone_null(Shift::ClockOutTime))
                    .col(double(Shift::ClockInLat).not_null())
                    .col(double(Shift::ClockInLng).not_null())
                    .col(double_null(Shift::ClockOutLat))
                    .col(double_null(Shift::ClockOutLng))
                    .col(text_null(Shift::ClockInNote))
                    .col(text_null(Shift::ClockOutNote))
                    .col(
                        ColumnDef::new(Shift::Status)
                            .custom(ShiftStatus::Enum)
                            .not_null(),
                    )
                    .col(double_null(Shift::TotalHours))
                    .col(
                        timestamp_with_time_zone(Shift::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Shift::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shift_user")
                            .from(Shift::Table, Shift::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shift_location")
                            .from(Shift::Table, Shift::LocationId)
                            .to(Location::Table, Location::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one open shift per user
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_shift_one_open_per_user ON shift (user_id) WHERE status = 'clocked_in'",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shift_clock_in_time")
                    .table(Shift::Table)
                    .col(Shift::ClockInTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Shift::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ShiftStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shift {
    Table,
    Id,
    UserId,
    LocationId,
    ClockInTime,
    ClockOutTime,
    ClockInLat,
    ClockInLng,
    ClockOutLat,
    ClockOutLng,
    ClockInNote,
    ClockOutNote,
    Status,
    TotalHours,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ShiftStatus {
    #[sea_orm(iden = "shift_status")]
    Enum,
    #[sea_orm(iden = "clocked_in")]
    ClockedIn,
    #[sea_orm(iden = "clocked_out")]
    ClockedOut,
}
