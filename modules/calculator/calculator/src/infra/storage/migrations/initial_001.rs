use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CalculationHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CalculationHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CalculationHistory::Operand1)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculationHistory::Operand2)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculationHistory::Operation)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CalculationHistory::Result).double())
                    .col(
                        ColumnDef::new(CalculationHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CalculationHistory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_calculation_history_created_at")
                    .table(CalculationHistory::Table)
                    .col(CalculationHistory::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CalculationHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CalculationHistory {
    Table,
    Id,
    Operand1,
    Operand2,
    Operation,
    Result,
    CreatedAt,
    UpdatedAt,
}
