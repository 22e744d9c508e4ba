//! Persistence helpers for definitions, tasks, and status logs
//!
//! Functions take any `ConnectionTrait` implementor so callers can run them
//! on a plain connection or inside a transaction. The transition write path
//! ([`record_transition`]) must run inside the orchestrator's transaction;
//! everything else is a straightforward read or single-row write.

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};

use crate::error::EngineError;
use crate::schedule::TaskSchedule;
use crate::workflow::definition::{WorkflowDefinition, WorkflowGraph};
use crate::workflow::entities::{status_time_logs, tasks, workflow_definitions};

/// Insert a new workflow definition
///
/// The graph is validated before anything is written. If `is_default` is set,
/// the previous default is cleared in the same transaction so at most one
/// definition is ever the default.
pub async fn insert_definition(
    conn: &DatabaseConnection,
    name: &str,
    is_default: bool,
    graph: WorkflowGraph,
) -> Result<WorkflowDefinition, EngineError> {
    graph.validate()?;
    let json = serde_json::to_string(&graph)
        .map_err(|e| EngineError::internal(format!("graph serialize error: {}", e)))?;
    let now = Utc::now().naive_utc();

    let txn = conn.begin().await?;
    if is_default {
        clear_default(&txn).await?;
    }

    let model = workflow_definitions::ActiveModel {
        name: Set(name.to_string()),
        is_default: Set(is_default),
        graph: Set(json),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let inserted = model.insert(&txn).await?;
    txn.commit().await?;

    WorkflowDefinition::new(inserted.id, inserted.name, inserted.is_default, graph)
}

/// Replace a definition wholesale
///
/// There are no partial patch semantics: the entire graph is swapped in one
/// transaction, so a concurrent reader sees either the old graph or the new
/// one, never a mix. Tasks holding a status absent from the new graph are not
/// remapped here; their next transition attempt surfaces `UnknownStatus`.
pub async fn replace_definition(
    conn: &DatabaseConnection,
    id: i64,
    name: &str,
    is_default: bool,
    graph: WorkflowGraph,
) -> Result<WorkflowDefinition, EngineError> {
    graph.validate()?;
    let json = serde_json::to_string(&graph)
        .map_err(|e| EngineError::internal(format!("graph serialize error: {}", e)))?;
    let now = Utc::now().naive_utc();

    let txn = conn.begin().await?;
    if is_default {
        clear_default(&txn).await?;
    }

    let existing = workflow_definitions::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| EngineError::model_not_found("WorkflowDefinition"))?;

    let mut active: workflow_definitions::ActiveModel = existing.into();
    active.name = Set(name.to_string());
    active.is_default = Set(is_default);
    active.graph = Set(json);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    WorkflowDefinition::new(updated.id, updated.name, updated.is_default, graph)
}

async fn clear_default<C: ConnectionTrait>(conn: &C) -> Result<(), EngineError> {
    workflow_definitions::Entity::update_many()
        .col_expr(workflow_definitions::Column::IsDefault, Expr::value(false))
        .filter(workflow_definitions::Column::IsDefault.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}

/// Load a definition snapshot by id
pub async fn load_definition<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<WorkflowDefinition, EngineError> {
    let model = workflow_definitions::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::model_not_found("WorkflowDefinition"))?;
    parse_definition(model)
}

/// Load the default definition
pub async fn load_default_definition<C: ConnectionTrait>(
    conn: &C,
) -> Result<WorkflowDefinition, EngineError> {
    let model = workflow_definitions::Entity::find()
        .filter(workflow_definitions::Column::IsDefault.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::model_not_found("WorkflowDefinition"))?;
    parse_definition(model)
}

fn parse_definition(model: workflow_definitions::Model) -> Result<WorkflowDefinition, EngineError> {
    let graph: WorkflowGraph = serde_json::from_str(&model.graph)
        .map_err(|e| EngineError::internal(format!("stored graph parse error: {}", e)))?;
    WorkflowDefinition::new(model.id, model.name, model.is_default, graph)
}

/// Create a task in its workflow's initial status
///
/// Opens the first status log entry (with no `from_status`) in the same
/// transaction, so a task always has exactly one open interval from the
/// moment it exists.
pub async fn insert_task(
    conn: &DatabaseConnection,
    definition: &WorkflowDefinition,
    title: &str,
    assignee_id: Option<i64>,
    schedule: Option<&TaskSchedule>,
    actor_id: i64,
    now: NaiveDateTime,
) -> Result<tasks::Model, EngineError> {
    let schedule_json = encode_schedule(schedule)?;
    let initial = definition.initial_status().to_string();

    let txn = conn.begin().await?;
    let task = tasks::ActiveModel {
        title: Set(title.to_string()),
        status: Set(initial.clone()),
        assignee_id: Set(assignee_id),
        workflow_id: Set(definition.id()),
        schedule: Set(schedule_json),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    status_time_logs::ActiveModel {
        task_id: Set(task.id),
        from_status: Set(None),
        to_status: Set(initial),
        entered_at: Set(now),
        exited_at: Set(None),
        duration_seconds: Set(None),
        actor_id: Set(actor_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(task)
}

/// Load a task by id
pub async fn load_task<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<tasks::Model, EngineError> {
    tasks::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::model_not_found("Task"))
}

/// Load a task with an exclusive row lock
///
/// On Postgres this issues `SELECT ... FOR UPDATE`, serializing concurrent
/// transitions on the same task: the loser blocks until the winner commits
/// and then re-validates against the now-current status. SQLite serializes
/// write transactions on the whole database, so a plain read suffices there.
pub async fn lock_task<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<tasks::Model, EngineError> {
    if conn.get_database_backend() == DatabaseBackend::Postgres {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT * FROM tasks WHERE id = $1 FOR UPDATE",
            [id.into()],
        );
        tasks::Entity::find()
            .from_raw_sql(stmt)
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::model_not_found("Task"))
    } else {
        load_task(conn, id).await
    }
}

/// Replace a task's schedule (validated), or clear it
pub async fn set_task_schedule(
    conn: &DatabaseConnection,
    id: i64,
    schedule: Option<&TaskSchedule>,
) -> Result<tasks::Model, EngineError> {
    let schedule_json = encode_schedule(schedule)?;
    let task = load_task(conn, id).await?;

    let mut active: tasks::ActiveModel = task.into();
    active.schedule = Set(schedule_json);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

/// Decode the schedule snapshot stored on a task row
pub fn task_schedule(task: &tasks::Model) -> Result<Option<TaskSchedule>, EngineError> {
    match task.schedule.as_deref() {
        Some(json) => serde_json::from_str(json)
            .map(Some)
            .map_err(|e| EngineError::internal(format!("stored schedule parse error: {}", e))),
        None => Ok(None),
    }
}

fn encode_schedule(schedule: Option<&TaskSchedule>) -> Result<Option<String>, EngineError> {
    match schedule {
        Some(schedule) => {
            schedule.validate()?;
            serde_json::to_string(schedule)
                .map(Some)
                .map_err(|e| EngineError::internal(format!("schedule serialize error: {}", e)))
        }
        None => Ok(None),
    }
}

/// All log entries for a task, ordered by `entered_at` ascending
pub async fn log_entries<C: ConnectionTrait>(
    conn: &C,
    task_id: i64,
) -> Result<Vec<status_time_logs::Model>, EngineError> {
    Ok(status_time_logs::Entity::find()
        .filter(status_time_logs::Column::TaskId.eq(task_id))
        .order_by_asc(status_time_logs::Column::EnteredAt)
        .order_by_asc(status_time_logs::Column::Id)
        .all(conn)
        .await?)
}

/// The task's currently open log entry, if any
pub async fn open_log_entry<C: ConnectionTrait>(
    conn: &C,
    task_id: i64,
) -> Result<Option<status_time_logs::Model>, EngineError> {
    Ok(status_time_logs::Entity::find()
        .filter(status_time_logs::Column::TaskId.eq(task_id))
        .filter(status_time_logs::Column::ExitedAt.is_null())
        .one(conn)
        .await?)
}

/// Close the open interval and open a new one, updating the task's status
///
/// This is the write half of status-duration accounting and must run inside
/// the caller's transaction: the close, the open, and the task update commit
/// together or not at all, so no half-closed row can ever be observed.
pub async fn record_transition<C: ConnectionTrait>(
    conn: &C,
    task: tasks::Model,
    to_status: &str,
    actor_id: i64,
    now: NaiveDateTime,
) -> Result<(tasks::Model, status_time_logs::Model), EngineError> {
    if let Some(open) = open_log_entry(conn, task.id).await? {
        let duration = (now - open.entered_at).num_seconds().max(0);
        let mut active: status_time_logs::ActiveModel = open.into();
        active.exited_at = Set(Some(now));
        active.duration_seconds = Set(Some(duration));
        active.update(conn).await?;
    }

    let from_status = task.status.clone();
    let opened = status_time_logs::ActiveModel {
        task_id: Set(task.id),
        from_status: Set(Some(from_status)),
        to_status: Set(to_status.to_string()),
        entered_at: Set(now),
        exited_at: Set(None),
        duration_seconds: Set(None),
        actor_id: Set(actor_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut active: tasks::ActiveModel = task.into();
    active.status = Set(to_status.to_string());
    active.updated_at = Set(now);
    let updated = active.update(conn).await?;

    Ok((updated, opened))
}
