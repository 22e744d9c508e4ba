//! Workflow orchestration
//!
//! [`WorkflowOrchestrator`] is the façade the transport layer calls. A status
//! change runs as one transaction: acquire the per-task row lock, re-read the
//! current status, validate against the bound definition snapshot, close the
//! open time-log interval and open the next one, update the task, commit.
//! Rejections roll back with the task untouched; the `StatusChanged` event is
//! published only after commit, fire-and-forget.
//!
//! The read-only surfaces (`validate_transition`, occurrence projection,
//! status summaries and timelines) never lock anything.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use sea_orm::TransactionTrait;
use serde::Serialize;

use crate::database::DbConnection;
use crate::error::{EngineError, Rejection, RejectionCode};
use crate::schedule::{occurrences, Occurrence};
use crate::timelog;
use crate::workflow::entities::{status_time_logs, tasks};
use crate::workflow::events::{EventSink, NullSink, StatusChanged};
use crate::workflow::{store, validator};

/// The authenticated caller, resolved by the identity layer
///
/// The engine trusts these values as given; resolving them is the excluded
/// auth subsystem's job. Passing the actor explicitly into every call keeps
/// transition evaluation free of ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: String,
}

impl Actor {
    pub fn new(id: i64, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }
}

/// Result of a side-effect-free transition probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Façade over validation, time tracking, and projection
pub struct WorkflowOrchestrator {
    db: DbConnection,
    sink: Arc<dyn EventSink>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator that drops domain events
    pub fn new(db: DbConnection) -> Self {
        Self::with_sink(db, Arc::new(NullSink))
    }

    /// Create an orchestrator publishing to the given sink
    pub fn with_sink(db: DbConnection, sink: Arc<dyn EventSink>) -> Self {
        Self { db, sink }
    }

    /// Request a status change for a task
    ///
    /// Returns the updated task on success, or the typed rejection with the
    /// task unmodified.
    pub async fn change_status(
        &self,
        task_id: i64,
        to_status: &str,
        actor: &Actor,
    ) -> Result<tasks::Model, EngineError> {
        self.change_status_at(task_id, to_status, actor, None, Utc::now().naive_utc())
            .await
    }

    /// Full-control variant of [`Self::change_status`]
    ///
    /// `expected_status` makes the call optimistic: if the task's current
    /// status no longer matches, the request is rejected with
    /// `ConcurrentModification` instead of being re-validated against the
    /// newer status. `now` is injectable for deterministic tests.
    pub async fn change_status_at(
        &self,
        task_id: i64,
        to_status: &str,
        actor: &Actor,
        expected_status: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<tasks::Model, EngineError> {
        let txn = self.db.inner().begin().await?;

        // holds the row lock until commit/rollback, serializing transitions
        // on this task
        let task = store::lock_task(&txn, task_id).await?;

        if let Some(expected) = expected_status {
            if task.status != expected {
                txn.rollback().await?;
                return Err(EngineError::Rejected(Rejection::new(
                    RejectionCode::ConcurrentModification,
                    format!(
                        "task {} is now '{}', expected '{}'",
                        task_id, task.status, expected
                    ),
                )));
            }
        }

        let definition = store::load_definition(&txn, task.workflow_id).await?;

        if let Err(rejection) = validator::validate(&definition, &task.status, to_status, &actor.role)
        {
            txn.rollback().await?;
            return Err(EngineError::Rejected(rejection));
        }

        let from_status = task.status.clone();
        let (updated, _opened) =
            store::record_transition(&txn, task, to_status, actor.id, now).await?;
        txn.commit().await?;

        let event = StatusChanged {
            task_id,
            from: Some(from_status),
            to: to_status.to_string(),
            at: now,
        };
        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.publish(event).await;
        });

        Ok(updated)
    }

    /// Side-effect-free probe: would this transition be admitted?
    ///
    /// Used by the UI to decide which actions to offer before requesting
    /// anything for real.
    pub async fn validate_transition(
        &self,
        workflow_id: i64,
        from: &str,
        to: &str,
        role: &str,
    ) -> Result<Probe, EngineError> {
        let definition = store::load_definition(self.db.inner(), workflow_id).await?;
        let probe = match validator::validate(&definition, from, to, role) {
            Ok(_) => Probe {
                valid: true,
                reason: None,
            },
            Err(rejection) => Probe {
                valid: false,
                reason: Some(rejection.to_string()),
            },
        };
        Ok(probe)
    }

    /// Project a task's schedule over `[range_start, range_end]`
    ///
    /// A task without a schedule projects to no occurrences.
    pub async fn occurrences_for_task(
        &self,
        task_id: i64,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Vec<Occurrence>, EngineError> {
        let task = store::load_task(self.db.inner(), task_id).await?;
        let schedule = store::task_schedule(&task)?;
        Ok(match schedule {
            Some(schedule) => occurrences(&schedule, range_start, range_end).collect(),
            None => Vec::new(),
        })
    }

    /// Total seconds per status for a task, including the open interval
    pub async fn status_summary(
        &self,
        task_id: i64,
        as_of: Option<NaiveDateTime>,
    ) -> Result<BTreeMap<String, i64>, EngineError> {
        let entries = store::log_entries(self.db.inner(), task_id).await?;
        let as_of = as_of.unwrap_or_else(|| Utc::now().naive_utc());
        Ok(timelog::summarize(&entries, as_of))
    }

    /// A task's full status history, oldest first
    pub async fn status_timeline(
        &self,
        task_id: i64,
    ) -> Result<Vec<status_time_logs::Model>, EngineError> {
        let entries = store::log_entries(self.db.inner(), task_id).await?;
        Ok(timelog::timeline(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Migrator;
    use crate::schedule::{TaskSchedule, TimeWindow, WeekdaySlot};
    use crate::testing::TestDatabase;
    use crate::workflow::definition::{
        RoleRestrictionSpec, StatusSpec, TransitionSpec, WorkflowDefinition, WorkflowGraph,
    };
    use crate::workflow::events::test_support::CollectingSink;
    use chrono::{Duration, NaiveTime};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn status(id: &str, order: i32) -> StatusSpec {
        StatusSpec {
            id: id.into(),
            display_order: order,
            color: None,
        }
    }

    fn graph() -> WorkflowGraph {
        WorkflowGraph {
            statuses: vec![
                status("pending", 1),
                status("in_progress", 2),
                status("completed", 3),
                status("cancelled", 4),
            ],
            transitions: vec![
                TransitionSpec {
                    from: "pending".into(),
                    to: vec!["in_progress".into(), "cancelled".into()],
                },
                TransitionSpec {
                    from: "in_progress".into(),
                    to: vec!["completed".into(), "cancelled".into()],
                },
            ],
            restrictions: vec![RoleRestrictionSpec {
                from: "pending".into(),
                to: "cancelled".into(),
                roles: vec!["admin".into()],
            }],
        }
    }

    async fn seed(db: &TestDatabase) -> (WorkflowDefinition, tasks::Model) {
        let definition = store::insert_definition(db.conn(), "Default", true, graph())
            .await
            .expect("insert definition");
        let task = store::insert_task(
            db.conn(),
            &definition,
            "Write the report",
            Some(5),
            None,
            1,
            ts(2024, 1, 1, 9),
        )
        .await
        .expect("insert task");
        (definition, task)
    }

    #[tokio::test]
    async fn accepted_transition_updates_task_and_ledger() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());
        let actor = Actor::new(2, "developer");

        let updated = orchestrator
            .change_status_at(task.id, "in_progress", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap();
        assert_eq!(updated.status, "in_progress");

        let timeline = orchestrator.status_timeline(task.id).await.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].from_status, None);
        assert_eq!(timeline[0].to_status, "pending");
        assert_eq!(timeline[0].duration_seconds, Some(3600));
        assert_eq!(timeline[1].from_status.as_deref(), Some("pending"));
        assert_eq!(timeline[1].to_status, "in_progress");
        assert_eq!(timeline[1].exited_at, None);

        // exactly one open entry after every accepted transition
        let open: Vec<_> = timeline.iter().filter(|e| e.exited_at.is_none()).collect();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn role_gated_edge_rejects_developer_but_admits_admin() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());

        let developer = Actor::new(2, "developer");
        let err = orchestrator
            .change_status_at(task.id, "cancelled", &developer, None, ts(2024, 1, 1, 10))
            .await
            .unwrap_err();
        match err {
            EngineError::Rejected(rejection) => {
                assert_eq!(rejection.code, RejectionCode::Forbidden)
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        // rejection left the task untouched
        let reloaded = store::load_task(db.conn(), task.id).await.unwrap();
        assert_eq!(reloaded.status, "pending");
        let timeline = orchestrator.status_timeline(task.id).await.unwrap();
        assert_eq!(timeline.len(), 1);

        let admin = Actor::new(3, "admin");
        let updated = orchestrator
            .change_status_at(task.id, "cancelled", &admin, None, ts(2024, 1, 1, 11))
            .await
            .unwrap();
        assert_eq!(updated.status, "cancelled");

        // the closed pending entry recorded the elapsed wall time
        let timeline = orchestrator.status_timeline(task.id).await.unwrap();
        assert_eq!(timeline[0].duration_seconds, Some(2 * 3600));
    }

    #[tokio::test]
    async fn illegal_and_noop_transitions_are_rejected() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());
        let actor = Actor::new(2, "admin");

        let err = orchestrator
            .change_status_at(task.id, "completed", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap_err();
        match err {
            EngineError::Rejected(r) => assert_eq!(r.code, RejectionCode::IllegalTransition),
            other => panic!("expected rejection, got {:?}", other),
        }

        let err = orchestrator
            .change_status_at(task.id, "pending", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap_err();
        match err {
            EngineError::Rejected(r) => assert_eq!(r.code, RejectionCode::NoOpTransition),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_expected_status_is_a_concurrent_modification() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());
        let actor = Actor::new(2, "developer");

        orchestrator
            .change_status_at(task.id, "in_progress", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap();

        // a second caller still believing the task is pending
        let err = orchestrator
            .change_status_at(
                task.id,
                "cancelled",
                &actor,
                Some("pending"),
                ts(2024, 1, 1, 10),
            )
            .await
            .unwrap_err();
        match err {
            EngineError::Rejected(r) => {
                assert_eq!(r.code, RejectionCode::ConcurrentModification)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_orphaned_by_definition_swap_is_unknown() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (definition, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());
        let actor = Actor::new(2, "admin");

        // swap the graph wholesale for one that no longer knows "pending"
        let replacement = WorkflowGraph {
            statuses: vec![status("todo", 1), status("done", 2)],
            transitions: vec![TransitionSpec {
                from: "todo".into(),
                to: vec!["done".into()],
            }],
            restrictions: vec![],
        };
        store::replace_definition(db.conn(), definition.id(), "Default", true, replacement)
            .await
            .unwrap();

        let err = orchestrator
            .change_status_at(task.id, "done", &actor, None, ts(2024, 1, 2, 9))
            .await
            .unwrap_err();
        match err {
            EngineError::Rejected(r) => assert_eq!(r.code, RejectionCode::UnknownStatus),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn probe_reports_validity_without_side_effects() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (definition, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());

        let probe = orchestrator
            .validate_transition(definition.id(), "pending", "in_progress", "developer")
            .await
            .unwrap();
        assert_eq!(
            probe,
            Probe {
                valid: true,
                reason: None
            }
        );

        let probe = orchestrator
            .validate_transition(definition.id(), "pending", "cancelled", "developer")
            .await
            .unwrap();
        assert!(!probe.valid);
        assert!(probe.reason.unwrap().contains("forbidden"));

        // probing changed nothing
        let timeline = orchestrator.status_timeline(task.id).await.unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[tokio::test]
    async fn summary_tracks_open_interval_growth() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());
        let actor = Actor::new(2, "developer");

        orchestrator
            .change_status_at(task.id, "in_progress", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap();

        let summary = orchestrator
            .status_summary(task.id, Some(ts(2024, 1, 1, 10) + Duration::seconds(90)))
            .await
            .unwrap();
        assert_eq!(summary["pending"], 3600);
        assert_eq!(summary["in_progress"], 90);

        let later = orchestrator
            .status_summary(task.id, Some(ts(2024, 1, 1, 12)))
            .await
            .unwrap();
        assert!(later["in_progress"] > summary["in_progress"]);
        assert_eq!(later["pending"], summary["pending"]);
    }

    #[tokio::test]
    async fn occurrences_for_task_projects_its_schedule() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (definition, _) = seed(&db).await;
        let orchestrator = WorkflowOrchestrator::new(db.db().clone());

        let schedule = TaskSchedule::WeeklyDays {
            start_date: date(2024, 1, 1),
            end_date: None,
            slots: vec![
                WeekdaySlot {
                    day_of_week: 1,
                    window: Some(TimeWindow::new(
                        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                    )),
                },
                WeekdaySlot {
                    day_of_week: 3,
                    window: None,
                },
            ],
        };
        let task = store::insert_task(
            db.conn(),
            &definition,
            "Standup notes",
            None,
            Some(&schedule),
            1,
            ts(2024, 1, 1, 8),
        )
        .await
        .unwrap();

        let got = orchestrator
            .occurrences_for_task(task.id, date(2024, 1, 1), date(2024, 1, 14))
            .await
            .unwrap();
        assert_eq!(
            got.iter().map(|o| o.date).collect::<Vec<_>>(),
            vec![
                date(2024, 1, 1),
                date(2024, 1, 3),
                date(2024, 1, 8),
                date(2024, 1, 10),
            ]
        );

        // a task without a schedule projects to nothing
        let bare = store::insert_task(
            db.conn(),
            &definition,
            "No schedule",
            None,
            None,
            1,
            ts(2024, 1, 1, 8),
        )
        .await
        .unwrap();
        let got = orchestrator
            .occurrences_for_task(bare.id, date(2024, 1, 1), date(2024, 12, 31))
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn committed_transitions_publish_status_changed() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let (_, task) = seed(&db).await;
        let sink = Arc::new(CollectingSink::default());
        let orchestrator = WorkflowOrchestrator::with_sink(db.db().clone(), sink.clone());
        let actor = Actor::new(2, "developer");

        orchestrator
            .change_status_at(task.id, "in_progress", &actor, None, ts(2024, 1, 1, 10))
            .await
            .unwrap();

        // publication is spawned; poll briefly for it to land
        let mut events = sink.events();
        for _ in 0..50 {
            if !events.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            events = sink.events();
        }
        assert_eq!(
            events,
            vec![StatusChanged {
                task_id: task.id,
                from: Some("pending".into()),
                to: "in_progress".into(),
                at: ts(2024, 1, 1, 10),
            }]
        );

        // rejections publish nothing
        let before = sink.events().len();
        let _ = orchestrator
            .change_status_at(task.id, "in_progress", &actor, None, ts(2024, 1, 1, 11))
            .await
            .unwrap_err();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sink.events().len(), before);
    }

    #[tokio::test]
    async fn default_definition_is_unique() {
        let db = TestDatabase::fresh::<Migrator>().await.unwrap();
        let first = store::insert_definition(db.conn(), "First", true, graph())
            .await
            .unwrap();
        let second = store::insert_definition(db.conn(), "Second", true, graph())
            .await
            .unwrap();

        let default = store::load_default_definition(db.conn()).await.unwrap();
        assert_eq!(default.id(), second.id());

        let first_reloaded = store::load_definition(db.conn(), first.id()).await.unwrap();
        assert!(!first_reloaded.is_default());
    }
}
