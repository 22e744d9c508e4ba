//! SeaORM entities for the workflow engine

pub mod workflow_definitions {
    use sea_orm::entity::prelude::*;

    /// A tenant's status graph, stored wholesale as JSON in `graph`
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "workflow_definitions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub is_default: bool,
        #[sea_orm(column_type = "Text")]
        pub graph: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod tasks {
    use sea_orm::entity::prelude::*;

    /// A task; `status` is always a node of its bound workflow definition,
    /// `schedule` is an optional JSON-encoded [`crate::schedule::TaskSchedule`]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "tasks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub title: String,
        pub status: String,
        pub assignee_id: Option<i64>,
        pub workflow_id: i64,
        #[sea_orm(column_type = "Text", nullable)]
        pub schedule: Option<String>,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod status_time_logs {
    use sea_orm::entity::prelude::*;

    /// Append-only ledger row for time spent in a status
    ///
    /// At most one row per task has `exited_at = NULL` (the open interval).
    /// Closed rows carry `duration_seconds = exited_at - entered_at` and are
    /// never touched again.
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "status_time_logs")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub task_id: i64,
        pub from_status: Option<String>,
        pub to_status: String,
        pub entered_at: chrono::NaiveDateTime,
        pub exited_at: Option<chrono::NaiveDateTime>,
        pub duration_seconds: Option<i64>,
        pub actor_id: i64,
        pub created_at: chrono::NaiveDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
