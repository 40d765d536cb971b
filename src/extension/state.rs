//! Execution state carried through one resolution call.
//!
//! Extensions use it to pass values to later extensions. The resolver records
//! under `resolverExtensionStages` which extensions produced a status, per stage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ExtensionStage;

const RESOLVER_EXTENSION_STAGES: &str = "resolverExtensionStages";

/// Per-call scratch space shared by the extensions of one resolution call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionState(Map<String, Value>);

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copies all entries of `other` into this state
    pub fn extend(&mut self, other: ExecutionState) {
        self.0.extend(other.0);
    }

    /// Records that `extension` ran at `stage`
    pub fn record_extension_stage(&mut self, stage: ExtensionStage, extension: &str) {
        let stages = self
            .0
            .entry(RESOLVER_EXTENSION_STAGES)
            .or_insert_with(|| Value::Object(Map::new()));

        // An extension may have replaced the audit entry with something else
        if !stages.is_object() {
            *stages = Value::Object(Map::new());
        }
        let Value::Object(stages) = stages else {
            return;
        };

        let names = stages
            .entry(stage.as_str())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(names) = names {
            names.push(Value::String(extension.to_string()));
        }
    }

    /// Names of the extensions that ran at `stage`, in order
    pub fn extension_stages(&self, stage: ExtensionStage) -> Vec<&str> {
        self.0
            .get(RESOLVER_EXTENSION_STAGES)
            .and_then(|stages| stages.get(stage.as_str()))
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for ExecutionState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_extension_stages() {
        let mut state = ExecutionState::new();
        state.record_extension_stage(ExtensionStage::BeforeResolve, "first");
        state.record_extension_stage(ExtensionStage::BeforeResolve, "second");
        state.record_extension_stage(ExtensionStage::AfterResolve, "third");

        assert_eq!(state.extension_stages(ExtensionStage::BeforeResolve), vec!["first", "second"]);
        assert_eq!(state.extension_stages(ExtensionStage::AfterResolve), vec!["third"]);
        assert_eq!(
            state.get("resolverExtensionStages").unwrap()["beforeResolve"][1],
            "second"
        );
    }

    #[test]
    fn test_record_over_clobbered_entry() {
        let mut state = ExecutionState::new();
        state.insert(RESOLVER_EXTENSION_STAGES, "oops");
        state.record_extension_stage(ExtensionStage::AfterResolve, "audit");
        assert_eq!(state.extension_stages(ExtensionStage::AfterResolve), vec!["audit"]);
    }
}
