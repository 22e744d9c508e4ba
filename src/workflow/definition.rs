//! Workflow definition value type
//!
//! A [`WorkflowDefinition`] is the single authoritative description of a
//! status graph: which statuses exist, which directed edges connect them, and
//! which roles may traverse each edge. It is immutable once constructed;
//! admin updates replace the whole graph atomically rather than patching it,
//! so evaluations always see a consistent snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A status node in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSpec {
    /// Opaque status identifier, unique within the definition
    pub id: String,
    /// Position in UI listings
    pub display_order: i32,
    /// Display color, if any
    #[serde(default)]
    pub color: Option<String>,
}

/// Directed edges out of one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub to: Vec<String>,
}

/// Roles allowed to traverse one edge; an absent entry means anyone may
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRestrictionSpec {
    pub from: String,
    pub to: String,
    pub roles: Vec<String>,
}

/// Raw serde shape of a workflow graph, as stored in the database
///
/// This is what admins author and what the `graph` JSON column holds.
/// It only becomes usable after validation via [`WorkflowDefinition::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub statuses: Vec<StatusSpec>,
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
    #[serde(default)]
    pub restrictions: Vec<RoleRestrictionSpec>,
}

impl WorkflowGraph {
    /// Check the structural invariants of the graph
    ///
    /// - at least one status
    /// - no duplicate status ids
    /// - every edge endpoint is a declared status
    /// - no self-loop edges
    /// - restrictions only reference declared edges
    ///
    /// Terminality (a status with no outgoing edge) is intentionally not
    /// enforced; workflows may be cyclic, e.g. re-open semantics.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.statuses.is_empty() {
            return Err(EngineError::invalid_definition(
                "a workflow must declare at least one status",
            ));
        }

        let mut ids = BTreeSet::new();
        for status in &self.statuses {
            if !ids.insert(status.id.as_str()) {
                return Err(EngineError::invalid_definition(format!(
                    "duplicate status id '{}'",
                    status.id
                )));
            }
        }

        let mut edges = BTreeSet::new();
        for transition in &self.transitions {
            if !ids.contains(transition.from.as_str()) {
                return Err(EngineError::invalid_definition(format!(
                    "transition from undeclared status '{}'",
                    transition.from
                )));
            }
            for to in &transition.to {
                if !ids.contains(to.as_str()) {
                    return Err(EngineError::invalid_definition(format!(
                        "transition to undeclared status '{}'",
                        to
                    )));
                }
                if to == &transition.from {
                    return Err(EngineError::invalid_definition(format!(
                        "self-loop on status '{}'",
                        to
                    )));
                }
                edges.insert((transition.from.as_str(), to.as_str()));
            }
        }

        for restriction in &self.restrictions {
            if !edges.contains(&(restriction.from.as_str(), restriction.to.as_str())) {
                return Err(EngineError::invalid_definition(format!(
                    "role restriction on undeclared edge '{}' -> '{}'",
                    restriction.from, restriction.to
                )));
            }
        }

        Ok(())
    }
}

/// Validated, immutable workflow definition with fast edge lookups
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    id: i64,
    name: String,
    is_default: bool,
    graph: WorkflowGraph,
    edges: BTreeMap<String, BTreeSet<String>>,
    restrictions: BTreeMap<(String, String), BTreeSet<String>>,
}

impl WorkflowDefinition {
    /// Validate a graph and build the derived lookup tables
    ///
    /// Statuses are re-ordered by `display_order` so [`Self::initial_status`]
    /// and [`Self::statuses`] follow the authored ordering.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        is_default: bool,
        mut graph: WorkflowGraph,
    ) -> Result<Self, EngineError> {
        graph.validate()?;
        graph
            .statuses
            .sort_by(|a, b| a.display_order.cmp(&b.display_order));

        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for transition in &graph.transitions {
            edges
                .entry(transition.from.clone())
                .or_default()
                .extend(transition.to.iter().cloned());
        }

        let mut restrictions: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
        for restriction in &graph.restrictions {
            restrictions
                .entry((restriction.from.clone(), restriction.to.clone()))
                .or_default()
                .extend(restriction.roles.iter().cloned());
        }

        Ok(Self {
            id,
            name: name.into(),
            is_default,
            graph,
            edges,
            restrictions,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// The underlying serde shape, e.g. for persisting a copy
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Statuses in display order
    pub fn statuses(&self) -> &[StatusSpec] {
        &self.graph.statuses
    }

    /// The status newly created tasks start in (lowest display order)
    pub fn initial_status(&self) -> &str {
        // validated non-empty in new()
        &self.graph.statuses[0].id
    }

    pub fn contains_status(&self, status: &str) -> bool {
        self.graph.statuses.iter().any(|s| s.id == status)
    }

    /// Statuses reachable from `from` in one transition
    pub fn outgoing_edges(&self, from: &str) -> &BTreeSet<String> {
        static EMPTY: OnceLock<BTreeSet<String>> = OnceLock::new();
        self.edges
            .get(from)
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeSet::new))
    }

    /// Whether the graph contains the edge `from -> to`
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing_edges(from).contains(to)
    }

    /// A status with no outgoing edges is terminal
    pub fn is_terminal(&self, status: &str) -> bool {
        self.outgoing_edges(status).is_empty()
    }

    /// Roles allowed on `from -> to`; `None` or an empty set means any role
    pub fn allowed_roles(&self, from: &str, to: &str) -> Option<&BTreeSet<String>> {
        self.restrictions
            .get(&(from.to_string(), to.to_string()))
            .filter(|roles| !roles.is_empty())
    }
}
