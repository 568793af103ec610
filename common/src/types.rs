use serde::{Deserialize, Serialize};

/// Body of the POST that starts one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

/// Which graph node an event came from.
///
/// The set is closed for this protocol version; nodes added by newer
/// backends deserialize to `Unknown` and reduce to no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Planner,
    Executor,
    Reporter,
    #[serde(other)]
    Unknown,
}

/// One step as the planner describes it. Extra backend fields (internal
/// step ids, per-tool query strings) are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub title: String,
    pub tool: String,
}

/// Payload of one stream event. Sparse: each node fills only its own fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<StepDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// One decoded `data:` payload from the event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub node: NodeKind,
    #[serde(default)]
    pub data: EventData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_planner_event_with_extra_fields() {
        let raw = r#"{"type":"update","node":"planner","data":{"plan":[{"id":1,"title":"Search","tool":"web_search","query":"rust"}]}}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.node, NodeKind::Planner);
        let plan = event.data.plan.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].title, "Search");
        assert_eq!(plan[0].tool, "web_search");
    }

    #[test]
    fn unknown_node_deserializes() {
        let raw = r#"{"node":"reflector","data":{}}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.node, NodeKind::Unknown);
    }

    #[test]
    fn missing_data_defaults_to_empty() {
        let raw = r#"{"node":"executor"}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        assert!(event.data.plan.is_none());
        assert!(event.data.final_answer.is_none());
        assert!(event.data.log.is_none());
    }
}
