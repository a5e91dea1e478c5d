//! Per-query lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Received,
    Dispatching,
    Collecting,
    Synthesizing,
    Done,
    Failed,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Done | QueryState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Received => "received",
            QueryState::Dispatching => "dispatching",
            QueryState::Collecting => "collecting",
            QueryState::Synthesizing => "synthesizing",
            QueryState::Done => "done",
            QueryState::Failed => "failed",
        }
    }

    fn can_advance_to(&self, next: QueryState) -> bool {
        use QueryState::*;
        matches!(
            (*self, next),
            (Received, Dispatching)
                | (Dispatching, Collecting)
                | (Collecting, Synthesizing)
                | (Synthesizing, Done)
                | (Received, Failed)
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records every transition of one query
#[derive(Debug, Clone)]
pub struct QueryTrace {
    transitions: Vec<QueryState>,
}

impl QueryTrace {
    pub fn start() -> Self {
        debug!(state = %QueryState::Received, "Query state");
        Self {
            transitions: vec![QueryState::Received],
        }
    }

    pub fn current(&self) -> QueryState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(QueryState::Received)
    }

    /// Move to `next`; transitions outside the lifecycle are ignored and logged
    pub fn advance(&mut self, next: QueryState) {
        let current = self.current();
        if !current.can_advance_to(next) {
            tracing::warn!(from = %current, to = %next, "Ignoring invalid query transition");
            return;
        }
        debug!(from = %current, to = %next, "Query state");
        self.transitions.push(next);
    }

    pub fn transitions(&self) -> &[QueryState] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<QueryState> {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut trace = QueryTrace::start();
        for next in [
            QueryState::Dispatching,
            QueryState::Collecting,
            QueryState::Synthesizing,
            QueryState::Done,
        ] {
            trace.advance(next);
        }
        assert_eq!(trace.current(), QueryState::Done);
        assert!(trace.current().is_terminal());
        assert_eq!(trace.transitions().len(), 5);
    }

    #[test]
    fn test_invalid_transition_ignored() {
        let mut trace = QueryTrace::start();
        trace.advance(QueryState::Done);
        assert_eq!(trace.current(), QueryState::Received);

        trace.advance(QueryState::Failed);
        assert_eq!(trace.current(), QueryState::Failed);
        trace.advance(QueryState::Dispatching);
        assert_eq!(trace.current(), QueryState::Failed);
    }
}
