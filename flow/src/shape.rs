use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which control-flow statement a flow stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    If,
    Switch,
    While,
}

/// Read-only structural view of a flow.
///
/// The shape describes how a flow was assembled without exposing the
/// conditions or handlers themselves, so it can be logged or shipped to
/// tooling as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowShape {
    pub id: Uuid,
    pub label: Option<String>,
    pub kind: FlowKind,
    /// Conditions, cases, or the single loop predicate.
    pub conditions: usize,
    pub handlers: usize,
    pub has_fallback: bool,
    /// Loop body steps; zero for branching flows.
    pub steps: usize,
}

impl FlowShape {
    /// Every condition has its handler.
    pub fn is_balanced(&self) -> bool {
        self.conditions == self.handlers
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_serializes_kind_in_snake_case() {
        let shape = FlowShape {
            id: Uuid::nil(),
            label: Some("router".to_string()),
            kind: FlowKind::Switch,
            conditions: 2,
            handlers: 1,
            has_fallback: true,
            steps: 0,
        };

        let json = shape.to_json();
        assert_eq!(json["kind"], "switch");
        assert_eq!(json["conditions"], 2);
        assert_eq!(json["label"], "router");
        assert!(!shape.is_balanced());
    }
}
