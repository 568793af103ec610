//! Session state and the pure event fold that maintains it.
//!
//! The reducers here never touch the network: given the same ordered event
//! sequence they produce the same state, which is what makes them testable
//! without replaying a live stream.

use research_common::{NodeKind, StreamEvent};
use research_protocol::{Message, PlanStep, Role, SessionStatus, StepStatus};
use serde::{Deserialize, Serialize};

/// Fixed log line appended to a step when the executor reports it done.
pub const STEP_COMPLETE_LOG: &str = "Execution complete. Data retrieved.";

/// What applying one event did, as far as the orchestrator cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Plan or transcript changed; the stream continues.
    Progress,
    /// A final answer was recorded; the session completed successfully.
    Final,
    /// No state change.
    Noop,
}

/// Observable state of one research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// The directive currently (or last) in flight.
    pub query: Option<String>,
    pub status: SessionStatus,
    /// Append-only, in arrival order.
    pub transcript: Vec<Message>,
    pub plan: Vec<PlanStep>,
    /// Index of the step the next executor event applies to. Monotonic
    /// within one plan; reset to 0 only when a plan is installed.
    pub active_step_cursor: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            query: None,
            status: SessionStatus::Idle,
            transcript: Vec::new(),
            plan: Vec::new(),
            active_step_cursor: 0,
        }
    }

    /// Record a user directive and mark the session busy. Any previous plan
    /// is discarded wholesale; the transcript is kept.
    pub fn begin(&mut self, query: &str) {
        self.transcript.push(Message::new(Role::User, query));
        self.query = Some(query.to_string());
        self.status = SessionStatus::Processing;
        self.plan.clear();
        self.active_step_cursor = 0;
    }

    /// Record a transport failure: one synthetic agent message, terminal
    /// error status. The plan is left showing how far execution got.
    pub fn fail(&mut self, reason: &str) {
        self.transcript
            .push(Message::new(Role::Agent, format!("Connection failure: {reason}")));
        self.status = SessionStatus::Error;
    }

    /// Fold one decoded event into the state.
    pub fn apply_event(&mut self, event: &StreamEvent) -> Applied {
        match event.node {
            NodeKind::Planner => self.apply_planner(event),
            NodeKind::Executor => self.apply_executor(event),
            NodeKind::Reporter => self.apply_reporter(event),
            NodeKind::Unknown => Applied::Noop,
        }
    }

    /// A planner event with a non-empty step list replaces the whole plan:
    /// every step starts `Pending` except the first, which is immediately
    /// `Active`. An empty or absent list leaves the previous plan in place.
    fn apply_planner(&mut self, event: &StreamEvent) -> Applied {
        let Some(descriptors) = event.data.plan.as_ref() else {
            return Applied::Noop;
        };
        if descriptors.is_empty() {
            return Applied::Noop;
        }
        self.plan = descriptors
            .iter()
            .enumerate()
            .map(|(id, d)| PlanStep {
                id,
                title: d.title.clone(),
                tool: d.tool.clone(),
                status: if id == 0 {
                    StepStatus::Active
                } else {
                    StepStatus::Pending
                },
                logs: Vec::new(),
            })
            .collect();
        self.active_step_cursor = 0;
        Applied::Progress
    }

    /// An executor event completes the step under the cursor and activates
    /// its successor. Past the end of the plan it is a total no-op: nothing
    /// throws, nothing mutates, the cursor stays put.
    fn apply_executor(&mut self, event: &StreamEvent) -> Applied {
        let cursor = self.active_step_cursor;
        let Some(step) = self.plan.get_mut(cursor) else {
            return Applied::Noop;
        };
        step.status = StepStatus::Completed;
        step.logs.push(STEP_COMPLETE_LOG.to_string());
        if let Some(log) = event.data.log.as_ref() {
            step.logs.push(log.clone());
        }
        if let Some(next) = self.plan.get_mut(cursor + 1) {
            next.status = StepStatus::Active;
        }
        self.active_step_cursor = cursor + 1;
        Applied::Progress
    }

    /// A reporter event with a non-empty final answer appends the agent
    /// message and ends processing. The plan is untouched.
    fn apply_reporter(&mut self, event: &StreamEvent) -> Applied {
        let answer = match event.data.final_answer.as_deref() {
            Some(answer) if !answer.is_empty() => answer,
            _ => return Applied::Noop,
        };
        self.transcript.push(Message::new(Role::Agent, answer));
        self.status = SessionStatus::Idle;
        Applied::Final
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_common::{EventData, StepDescriptor};

    fn planner(steps: &[(&str, &str)]) -> StreamEvent {
        StreamEvent {
            node: NodeKind::Planner,
            data: EventData {
                plan: Some(
                    steps
                        .iter()
                        .map(|(title, tool)| StepDescriptor {
                            title: (*title).to_string(),
                            tool: (*tool).to_string(),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
        }
    }

    fn executor() -> StreamEvent {
        StreamEvent {
            node: NodeKind::Executor,
            data: EventData::default(),
        }
    }

    fn reporter(answer: &str) -> StreamEvent {
        StreamEvent {
            node: NodeKind::Reporter,
            data: EventData {
                final_answer: Some(answer.to_string()),
                ..Default::default()
            },
        }
    }

    fn two_step_plan() -> SessionState {
        let mut state = SessionState::new();
        state.begin("research rust");
        let applied =
            state.apply_event(&planner(&[("Search", "web_search"), ("Summarize", "llm")]));
        assert_eq!(applied, Applied::Progress);
        state
    }

    #[test]
    fn planner_installs_plan_with_first_step_active() {
        let state = two_step_plan();
        assert_eq!(state.plan.len(), 2);
        assert_eq!(state.plan[0].status, StepStatus::Active);
        assert_eq!(state.plan[0].title, "Search");
        assert_eq!(state.plan[1].status, StepStatus::Pending);
        assert_eq!(state.active_step_cursor, 0);
    }

    #[test]
    fn executor_completes_current_and_activates_next() {
        let mut state = two_step_plan();
        state.apply_event(&executor());
        assert_eq!(state.plan[0].status, StepStatus::Completed);
        assert_eq!(state.plan[0].logs, vec![STEP_COMPLETE_LOG]);
        assert_eq!(state.plan[1].status, StepStatus::Active);
        assert_eq!(state.active_step_cursor, 1);
    }

    #[test]
    fn trailing_executor_completes_last_step_and_further_events_are_noops() {
        let mut state = two_step_plan();
        state.apply_event(&executor());
        state.apply_event(&executor());
        assert_eq!(state.plan[0].status, StepStatus::Completed);
        assert_eq!(state.plan[1].status, StepStatus::Completed);
        assert_eq!(state.active_step_cursor, 2);

        let before = state.clone();
        assert_eq!(state.apply_event(&executor()), Applied::Noop);
        assert_eq!(state.active_step_cursor, before.active_step_cursor);
        assert_eq!(state.plan.len(), before.plan.len());
    }

    #[test]
    fn executor_log_text_is_appended_after_fixed_note() {
        let mut state = two_step_plan();
        let event = StreamEvent {
            node: NodeKind::Executor,
            data: EventData {
                log: Some("Step executed. Found data.".to_string()),
                ..Default::default()
            },
        };
        state.apply_event(&event);
        assert_eq!(
            state.plan[0].logs,
            vec![STEP_COMPLETE_LOG, "Step executed. Found data."]
        );
    }

    #[test]
    fn reporter_appends_agent_message_and_ends_processing() {
        let mut state = two_step_plan();
        let transcript_len = state.transcript.len();
        assert_eq!(state.apply_event(&reporter("X")), Applied::Final);
        assert_eq!(state.transcript.len(), transcript_len + 1);
        let last = state.transcript.last().map(|m| (m.role, m.content.clone()));
        assert_eq!(last, Some((Role::Agent, "X".to_string())));
        assert_eq!(state.status, SessionStatus::Idle);
        // Plan untouched.
        assert_eq!(state.plan[0].status, StepStatus::Active);
    }

    #[test]
    fn reporter_without_answer_is_a_noop() {
        let mut state = two_step_plan();
        let event = StreamEvent {
            node: NodeKind::Reporter,
            data: EventData::default(),
        };
        assert_eq!(state.apply_event(&event), Applied::Noop);
        assert_eq!(state.status, SessionStatus::Processing);

        assert_eq!(state.apply_event(&reporter("")), Applied::Noop);
    }

    #[test]
    fn empty_planner_list_keeps_previous_plan() {
        let mut state = two_step_plan();
        assert_eq!(state.apply_event(&planner(&[])), Applied::Noop);
        assert_eq!(state.plan.len(), 2);
        let absent = StreamEvent {
            node: NodeKind::Planner,
            data: EventData::default(),
        };
        assert_eq!(state.apply_event(&absent), Applied::Noop);
        assert_eq!(state.plan.len(), 2);
    }

    #[test]
    fn fresh_planner_event_replaces_plan_and_resets_cursor() {
        let mut state = two_step_plan();
        state.apply_event(&executor());
        assert_eq!(state.active_step_cursor, 1);

        state.apply_event(&planner(&[("Verify", "web_search")]));
        assert_eq!(state.plan.len(), 1);
        assert_eq!(state.plan[0].status, StepStatus::Active);
        assert_eq!(state.active_step_cursor, 0);
    }

    #[test]
    fn unknown_node_is_ignored() {
        let mut state = two_step_plan();
        let event = StreamEvent {
            node: NodeKind::Unknown,
            data: EventData {
                final_answer: Some("ignored".to_string()),
                ..Default::default()
            },
        };
        assert_eq!(state.apply_event(&event), Applied::Noop);
        assert_eq!(state.transcript.len(), 1);
    }

    #[test]
    fn reduction_is_deterministic() {
        let events = vec![
            planner(&[("Search", "web_search"), ("Summarize", "llm")]),
            executor(),
            executor(),
            reporter("done"),
        ];

        let run = || {
            let mut state = SessionState::new();
            state.begin("q");
            for event in &events {
                state.apply_event(event);
            }
            state
        };

        let a = run();
        let b = run();
        assert_eq!(a.active_step_cursor, b.active_step_cursor);
        assert_eq!(a.status, b.status);
        assert_eq!(a.plan.len(), b.plan.len());
        for (x, y) in a.plan.iter().zip(&b.plan) {
            assert_eq!(x.status, y.status);
            assert_eq!(x.logs, y.logs);
        }
    }

    #[test]
    fn at_most_one_step_is_active_at_any_point() {
        let mut state = SessionState::new();
        state.begin("q");
        let events = vec![
            planner(&[("A", "t"), ("B", "t"), ("C", "t")]),
            executor(),
            executor(),
            executor(),
            executor(),
        ];
        for event in &events {
            state.apply_event(event);
            let active = state
                .plan
                .iter()
                .filter(|s| s.status == StepStatus::Active)
                .count();
            assert!(active <= 1, "more than one active step");
        }
    }

    #[test]
    fn step_status_never_regresses() {
        let mut state = SessionState::new();
        state.begin("q");
        let events = vec![
            planner(&[("A", "t"), ("B", "t")]),
            executor(),
            executor(),
            executor(),
            reporter("x"),
        ];
        let rank = |s: StepStatus| match s {
            StepStatus::Pending => 0,
            StepStatus::Active => 1,
            StepStatus::Completed => 2,
        };
        let mut previous: Vec<StepStatus> = Vec::new();
        for event in &events {
            state.apply_event(event);
            for (i, step) in state.plan.iter().enumerate() {
                if let Some(&old) = previous.get(i) {
                    assert!(rank(step.status) >= rank(old), "step {i} regressed");
                }
            }
            previous = state.plan.iter().map(|s| s.status).collect();
        }
    }

    #[test]
    fn begin_clears_plan_and_appends_user_message() {
        let mut state = two_step_plan();
        state.apply_event(&executor());
        state.begin("second directive");
        assert!(state.plan.is_empty());
        assert_eq!(state.active_step_cursor, 0);
        assert_eq!(state.status, SessionStatus::Processing);
        assert_eq!(state.query.as_deref(), Some("second directive"));
        let last = state.transcript.last().map(|m| m.role);
        assert_eq!(last, Some(Role::User));
    }

    #[test]
    fn fail_appends_one_synthetic_message_and_sets_error() {
        let mut state = two_step_plan();
        let transcript_len = state.transcript.len();
        state.fail("connection refused");
        assert_eq!(state.transcript.len(), transcript_len + 1);
        assert_eq!(state.status, SessionStatus::Error);
        let last = state.transcript.last().map(|m| m.content.clone());
        assert!(last.is_some_and(|c| c.contains("connection refused")));
    }
}
