//! Telemetry → host variable synchronization
//!
//! Each telemetry category owns a schema that starts `Uninitialized`. The
//! first snapshot of a category defines one variable per key and the union
//! of both categories' definitions is published. Every snapshot, first or
//! not, publishes values for all keys it carries.
//!
//! Definitions are never retracted. Keys that appear after the defining
//! snapshot are handled according to [`LateKeyPolicy`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::config::LateKeyPolicy;
use crate::hardware::connection::TelemetrySnapshot;

/// Telemetry category, which is also the variable namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableCategory {
    /// Lens telemetry: zoom, focus and speeds.
    Optical,
    /// Camera telemetry: iris, gains, tally and menu.
    Camera,
}

impl VariableCategory {
    /// Prefix of this category's variable ids.
    pub fn prefix(self) -> &'static str {
        match self {
            VariableCategory::Optical => "optical",
            VariableCategory::Camera => "camera",
        }
    }

    /// Prefix of this category's variable names.
    pub fn display_name(self) -> &'static str {
        match self {
            VariableCategory::Optical => "Optical",
            VariableCategory::Camera => "Camera",
        }
    }

    /// Variable id of `key` within this category.
    pub fn variable_id(self, key: &str) -> String {
        format!("{}.{}", self.prefix(), key)
    }
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Host-visible variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    /// Host variable id, `<category>.<key>`.
    #[serde(rename = "variableId")]
    pub variable_id: String,
    /// Display name.
    pub name: String,
}

impl VariableDefinition {
    /// Definition for telemetry `key` of `category`.
    pub fn new(category: VariableCategory, key: &str) -> Self {
        Self {
            variable_id: category.variable_id(key),
            name: format!("{}: {}", category.display_name(), key),
        }
    }
}

/// Variable values keyed by variable id.
pub type VariableValues = Map<String, Value>;

/// Definition state of one telemetry category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaState {
    /// No snapshot seen yet.
    #[default]
    Uninitialized,
    /// Definitions derived from the first snapshot.
    Initialized(Vec<VariableDefinition>),
}

impl SchemaState {
    /// Current definitions; empty while uninitialized.
    pub fn definitions(&self) -> &[VariableDefinition] {
        match self {
            SchemaState::Uninitialized => &[],
            SchemaState::Initialized(defs) => defs,
        }
    }

    /// Whether the first snapshot has been seen.
    pub fn is_initialized(&self) -> bool {
        matches!(self, SchemaState::Initialized(_))
    }
}

/// Host updates produced by one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Full replacement definition set, when it changed.
    pub definitions: Option<Vec<VariableDefinition>>,
    /// Values to publish, keyed by variable id.
    pub values: VariableValues,
}

/// Derives host variables from telemetry snapshots of both categories.
#[derive(Debug, Clone, Default)]
pub struct VariableSynchronizer {
    optical: SchemaState,
    camera: SchemaState,
    policy: LateKeyPolicy,
}

impl VariableSynchronizer {
    /// Synchronizer with both schemas uninitialized.
    pub fn new(policy: LateKeyPolicy) -> Self {
        Self {
            optical: SchemaState::Uninitialized,
            camera: SchemaState::Uninitialized,
            policy,
        }
    }

    /// Active late key policy.
    pub fn policy(&self) -> LateKeyPolicy {
        self.policy
    }

    /// Change the late key policy; applies from the next snapshot.
    pub fn set_policy(&mut self, policy: LateKeyPolicy) {
        self.policy = policy;
    }

    /// Schema state of `category`.
    pub fn schema(&self, category: VariableCategory) -> &SchemaState {
        match category {
            VariableCategory::Optical => &self.optical,
            VariableCategory::Camera => &self.camera,
        }
    }

    fn schema_mut(&mut self, category: VariableCategory) -> &mut SchemaState {
        match category {
            VariableCategory::Optical => &mut self.optical,
            VariableCategory::Camera => &mut self.camera,
        }
    }

    /// All definitions, optical first.
    pub fn all_definitions(&self) -> Vec<VariableDefinition> {
        self.optical
            .definitions()
            .iter()
            .chain(self.camera.definitions())
            .cloned()
            .collect()
    }

    /// Process one snapshot of `category`.
    pub fn apply(&mut self, category: VariableCategory, snapshot: &TelemetrySnapshot) -> SyncOutcome {
        let policy = self.policy;
        let schema = self.schema_mut(category);
        let changed = match schema {
            SchemaState::Uninitialized => {
                let defs = snapshot
                    .keys()
                    .map(|key| VariableDefinition::new(category, key))
                    .collect();
                *schema = SchemaState::Initialized(defs);
                true
            }
            SchemaState::Initialized(defs) => match policy {
                LateKeyPolicy::Ignore => false,
                LateKeyPolicy::Extend => {
                    let before = defs.len();
                    for key in snapshot.keys() {
                        let id = category.variable_id(key);
                        if !defs.iter().any(|d| d.variable_id == id) {
                            defs.push(VariableDefinition::new(category, key));
                        }
                    }
                    defs.len() != before
                }
            },
        };

        let values = snapshot
            .iter()
            .map(|(key, value)| (category.variable_id(key), value.clone()))
            .collect();

        SyncOutcome {
            definitions: changed.then(|| self.all_definitions()),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(value: Value) -> TelemetrySnapshot {
        value.as_object().cloned().unwrap_or_default()
    }

    fn ids(defs: &[VariableDefinition]) -> Vec<&str> {
        defs.iter().map(|d| d.variable_id.as_str()).collect()
    }

    #[test]
    fn first_snapshot_defines_and_publishes() {
        let mut sync = VariableSynchronizer::default();
        let out = sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 10, "focus": 5})));

        let defs = out.definitions.unwrap();
        assert_eq!(ids(&defs), vec!["optical.focus", "optical.zoom"]);
        assert_eq!(defs[1].name, "Optical: zoom");
        assert_eq!(out.values.len(), 2);
        assert_eq!(out.values["optical.zoom"], json!(10));
    }

    #[test]
    fn late_keys_ignored_by_default() {
        let mut sync = VariableSynchronizer::default();
        sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 10, "focus": 5})));
        let out = sync.apply(
            VariableCategory::Optical,
            &snap(json!({"zoom": 12, "focus": 5, "newKey": 1})),
        );

        assert!(out.definitions.is_none());
        assert_eq!(out.values["optical.zoom"], json!(12));
        assert_eq!(out.values["optical.newKey"], json!(1));
        assert_eq!(sync.schema(VariableCategory::Optical).definitions().len(), 2);
    }

    #[test]
    fn late_keys_extend_when_configured() {
        let mut sync = VariableSynchronizer::new(LateKeyPolicy::Extend);
        sync.apply(VariableCategory::Camera, &snap(json!({"iris": 4000})));
        let out = sync.apply(VariableCategory::Camera, &snap(json!({"iris": 4000, "redGain": 3})));
        assert_eq!(ids(&out.definitions.unwrap()), vec!["camera.iris", "camera.redGain"]);

        let out = sync.apply(VariableCategory::Camera, &snap(json!({"redGain": 4})));
        assert!(out.definitions.is_none());
    }

    #[test]
    fn policy_switch_applies_to_next_snapshot() {
        let mut sync = VariableSynchronizer::default();
        assert_eq!(sync.policy(), LateKeyPolicy::Ignore);
        sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 1})));

        sync.set_policy(LateKeyPolicy::Extend);
        assert_eq!(sync.policy(), LateKeyPolicy::Extend);
        let out = sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 1, "focus": 2})));
        assert_eq!(ids(&out.definitions.unwrap()), vec!["optical.zoom", "optical.focus"]);
    }

    #[test]
    fn union_lists_optical_before_camera() {
        let mut sync = VariableSynchronizer::default();
        let out = sync.apply(VariableCategory::Camera, &snap(json!({"iris": 1})));
        assert_eq!(ids(&out.definitions.unwrap()), vec!["camera.iris"]);

        let out = sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 1})));
        assert_eq!(ids(&out.definitions.unwrap()), vec!["optical.zoom", "camera.iris"]);
    }

    #[test]
    fn empty_first_snapshot_still_initializes() {
        let mut sync = VariableSynchronizer::default();
        let out = sync.apply(VariableCategory::Optical, &TelemetrySnapshot::new());
        assert_eq!(out.definitions, Some(Vec::new()));
        assert!(sync.schema(VariableCategory::Optical).is_initialized());

        let out = sync.apply(VariableCategory::Optical, &snap(json!({"zoom": 1})));
        assert!(out.definitions.is_none());
        assert_eq!(out.values.len(), 1);
    }

    #[test]
    fn values_keep_native_types() {
        let mut sync = VariableSynchronizer::default();
        let out = sync.apply(
            VariableCategory::Camera,
            &snap(json!({"menu": true, "mode": "AUTO", "gain": 1.5, "none": null})),
        );
        assert_eq!(out.values["camera.menu"], json!(true));
        assert_eq!(out.values["camera.mode"], json!("AUTO"));
        assert_eq!(out.values["camera.gain"], json!(1.5));
        assert_eq!(out.values["camera.none"], Value::Null);
    }
}
