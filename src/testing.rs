//! Test doubles for the host side.
//!
//! [`RecordingHost`] remembers every call the camera module makes so tests
//! can assert on registrations, variables, status and log lines. Pair it
//! with [`crate::hardware::mock::MockConnectionFactory`] for the device side.

use std::sync::Mutex;

use crate::actions::ActionDefinition;
use crate::host::{HostLogLevel, HostSurface, ModuleStatus};
use crate::variables::{VariableDefinition, VariableValues};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// [`HostSurface::register_actions`]
    RegisterActions(Vec<ActionDefinition>),
    /// [`HostSurface::set_variable_definitions`]
    SetVariableDefinitions(Vec<VariableDefinition>),
    /// [`HostSurface::set_variable_values`]
    SetVariableValues(VariableValues),
    /// [`HostSurface::report_status`]
    ReportStatus(ModuleStatus, Option<String>),
    /// [`HostSurface::log`]
    Log(HostLogLevel, String),
}

/// [`HostSurface`] that records every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    /// Host with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: HostCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Forget the recorded calls.
    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Every action registration, oldest first.
    pub fn registrations(&self) -> Vec<Vec<ActionDefinition>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::RegisterActions(defs) => Some(defs),
                _ => None,
            })
            .collect()
    }

    /// Every published definition set, oldest first.
    pub fn definition_sets(&self) -> Vec<Vec<VariableDefinition>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::SetVariableDefinitions(defs) => Some(defs),
                _ => None,
            })
            .collect()
    }

    /// Definitions currently known to the host.
    pub fn definitions(&self) -> Vec<VariableDefinition> {
        self.definition_sets().pop().unwrap_or_default()
    }

    /// Every value batch, oldest first.
    pub fn value_batches(&self) -> Vec<VariableValues> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::SetVariableValues(values) => Some(values),
                _ => None,
            })
            .collect()
    }

    /// Latest value of every variable the host has been sent.
    pub fn values(&self) -> VariableValues {
        let mut merged = VariableValues::new();
        for batch in self.value_batches() {
            merged.extend(batch);
        }
        merged
    }

    /// Every reported status, in order.
    pub fn statuses(&self) -> Vec<ModuleStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::ReportStatus(status, _) => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Most recently reported status.
    pub fn last_status(&self) -> Option<ModuleStatus> {
        self.statuses().pop()
    }

    /// Every host log line, in order.
    pub fn logs(&self) -> Vec<(HostLogLevel, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Log(level, message) => Some((level, message)),
                _ => None,
            })
            .collect()
    }
}

impl HostSurface for RecordingHost {
    fn register_actions(&self, actions: &[ActionDefinition]) {
        self.record(HostCall::RegisterActions(actions.to_vec()));
    }

    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>) {
        self.record(HostCall::SetVariableDefinitions(definitions));
    }

    fn set_variable_values(&self, values: VariableValues) {
        self.record(HostCall::SetVariableValues(values));
    }

    fn report_status(&self, status: ModuleStatus, message: Option<String>) {
        self.record(HostCall::ReportStatus(status, message));
    }

    fn log(&self, level: HostLogLevel, message: &str) {
        self.record(HostCall::Log(level, message.to_string()));
    }
}
