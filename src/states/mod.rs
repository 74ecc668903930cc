//! The state graph: one state per resumption point, plus the record that
//! carries the suspended function's variables between invocations.

pub mod decompose;
pub mod record;

pub use decompose::decompose;
pub use record::{CounterType, PersistentRecord, RecordField};

use crate::analysis::StateId;
use crate::syntax::tree::NodeId;
use std::fmt;

/// The boundary a state resumes after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Index into the function's call sites
    pub site: usize,
    pub stmt: NodeId,
    pub primitive: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub id: StateId,
    /// `None` for the entry state
    pub resume: Option<ResumePoint>,
    /// Statements whose home is this state, in program order
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// The state ends by suspending at the boundary
    Resume,
    /// The state falls out of a branch arm into a later boundary
    FallThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: StateId,
    pub to: StateId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateGraph {
    states: Vec<State>,
    edges: Vec<Edge>,
}

impl StateGraph {
    pub fn new(states: Vec<State>, edges: Vec<Edge>) -> Self {
        Self { states, edges }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id as usize)
    }

    pub fn successors(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.from == id)
            .map(|edge| edge.to)
    }

    /// The state that resumes after call site `site`
    pub fn resume_target(&self, site: usize) -> Option<StateId> {
        self.states
            .iter()
            .find(|state| matches!(&state.resume, Some(point) if point.site == site))
            .map(|state| state.id)
    }
}

impl fmt::Display for StateGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.states {
            match &state.resume {
                Some(point) => writeln!(
                    f,
                    "state {} (resumes after {}, call site {})",
                    state.id, point.primitive, point.site
                )?,
                None => writeln!(f, "state {} (entry)", state.id)?,
            }
            writeln!(f, "  statements: {}", state.statements.len())?;
            for edge in self.edges.iter().filter(|edge| edge.from == state.id) {
                let kind = match edge.kind {
                    EdgeKind::Resume => "resume",
                    EdgeKind::FallThrough => "fall-through",
                };
                writeln!(f, "  -> {} ({})", edge.to, kind)?;
            }
        }
        Ok(())
    }
}
