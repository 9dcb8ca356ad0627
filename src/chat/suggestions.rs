//! Suggestion tracker: before/after parameter snapshots per applied suggestion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflow::NodeParameters;

/// A suggestion that was written onto a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// The node's values for the suggested keys before the apply.
    pub previous_parameters: NodeParameters,
    pub suggested_parameters: NodeParameters,
    pub applied_at: DateTime<Utc>,
}

/// Applied suggestions keyed by suggestion id. Entries live as long as the
/// coordinator; nothing is evicted.
#[derive(Debug, Clone, Default)]
pub struct SuggestionTracker {
    entries: HashMap<String, Suggestion>,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `current` on the suggested keys and store both sides.
    pub fn record(
        &mut self,
        suggestion_id: impl Into<String>,
        current: &NodeParameters,
        suggested: NodeParameters,
    ) -> &Suggestion {
        let suggestion = Suggestion {
            previous_parameters: relevant_parameters(current, suggested.keys()),
            suggested_parameters: suggested,
            applied_at: Utc::now(),
        };

        let id = suggestion_id.into();
        self.entries.insert(id.clone(), suggestion);
        &self.entries[&id]
    }

    pub fn get(&self, suggestion_id: &str) -> Option<&Suggestion> {
        self.entries.get(suggestion_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, Suggestion> {
        self.entries.clone()
    }
}

/// Copy `parameters` restricted to `keys`. Keys the node does not have map
/// to `null`, so the result always has exactly the requested keys.
pub fn relevant_parameters<'a, I>(parameters: &NodeParameters, keys: I) -> NodeParameters
where
    I: IntoIterator<Item = &'a String>,
{
    keys.into_iter()
        .map(|key| {
            let value = parameters
                .get(key)
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> NodeParameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn relevant_parameters_keeps_only_requested_keys() {
        let current = params(json!({"jsCode": "old", "mode": "each", "notes": "x"}));
        let suggested = params(json!({"jsCode": "new", "language": "js"}));

        let previous = relevant_parameters(&current, suggested.keys());
        assert_eq!(previous, params(json!({"jsCode": "old", "language": null})));
    }

    #[test]
    fn record_snapshot_is_not_aliased() {
        let mut current = params(json!({"options": {"retry": 1}}));
        let mut tracker = SuggestionTracker::new();
        tracker.record("s1", &current, params(json!({"options": {"retry": 3}})));

        current["options"]["retry"] = json!(99);

        let stored = tracker.get("s1").unwrap();
        assert_eq!(stored.previous_parameters["options"]["retry"], 1);
        assert_eq!(stored.suggested_parameters["options"]["retry"], 3);
    }

    #[test]
    fn record_keys_match() {
        let mut tracker = SuggestionTracker::new();
        let stored = tracker.record(
            "s1",
            &params(json!({"a": 1})),
            params(json!({"a": 2, "b": 3})),
        );
        let prev: Vec<_> = stored.previous_parameters.keys().collect();
        let next: Vec<_> = stored.suggested_parameters.keys().collect();
        assert_eq!(prev, next);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn re_recording_replaces_entry() {
        let mut tracker = SuggestionTracker::new();
        tracker.record("s1", &params(json!({"a": 1})), params(json!({"a": 2})));
        tracker.record("s1", &params(json!({"a": 2})), params(json!({"a": 5})));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("s1").unwrap().previous_parameters["a"], 2);
        assert!(tracker.get("missing").is_none());
    }
}
