//! Creates the workflow definition, task, and status time log tables

use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240115_000001_create_workflow_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkflowDefinitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkflowDefinitions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkflowDefinitions::Name).string().not_null())
                    .col(
                        ColumnDef::new(WorkflowDefinitions::IsDefault)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkflowDefinitions::Graph).text().not_null())
                    .col(
                        ColumnDef::new(WorkflowDefinitions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WorkflowDefinitions::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_workflow_definitions_is_default")
                    .table(WorkflowDefinitions::Table)
                    .col(WorkflowDefinitions::IsDefault)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tasks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Status).string().not_null())
                    .col(ColumnDef::new(Tasks::AssigneeId).big_integer().null())
                    .col(ColumnDef::new(Tasks::WorkflowId).big_integer().not_null())
                    .col(ColumnDef::new(Tasks::Schedule).text().null())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_workflow_id")
                    .table(Tasks::Table)
                    .col(Tasks::WorkflowId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_status")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StatusTimeLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StatusTimeLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StatusTimeLogs::TaskId).big_integer().not_null())
                    .col(ColumnDef::new(StatusTimeLogs::FromStatus).string().null())
                    .col(ColumnDef::new(StatusTimeLogs::ToStatus).string().not_null())
                    .col(
                        ColumnDef::new(StatusTimeLogs::EnteredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StatusTimeLogs::ExitedAt).timestamp().null())
                    .col(
                        ColumnDef::new(StatusTimeLogs::DurationSeconds)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(StatusTimeLogs::ActorId).big_integer().not_null())
                    .col(
                        ColumnDef::new(StatusTimeLogs::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_status_time_logs_task_id")
                    .table(StatusTimeLogs::Table)
                    .col(StatusTimeLogs::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_status_time_logs_open")
                    .table(StatusTimeLogs::Table)
                    .col(StatusTimeLogs::TaskId)
                    .col(StatusTimeLogs::ExitedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StatusTimeLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowDefinitions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkflowDefinitions {
    Table,
    Id,
    Name,
    IsDefault,
    Graph,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    Title,
    Status,
    AssigneeId,
    WorkflowId,
    Schedule,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StatusTimeLogs {
    Table,
    Id,
    TaskId,
    FromStatus,
    ToStatus,
    EnteredAt,
    ExitedAt,
    DurationSeconds,
    ActorId,
    CreatedAt,
}
