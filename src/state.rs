//! Cached camera state
//!
//! Holds the most recent camera snapshot. Written by the telemetry path,
//! read by relative actions (stepped iris, absolute gain). Replaced wholesale
//! on every snapshot and cleared when the connection is replaced.

use serde_json::Value;

use crate::hardware::capabilities::GainColor;
use crate::hardware::connection::TelemetrySnapshot;

/// Last camera snapshot received on the current connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStateCache {
    camera: Option<TelemetrySnapshot>,
}

impl DeviceStateCache {
    /// Empty cache; nothing has been reported yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached camera state with `snapshot`.
    pub fn update_camera(&mut self, snapshot: &TelemetrySnapshot) {
        self.camera = Some(snapshot.clone());
    }

    /// Forget everything, e.g. when the connection is replaced.
    pub fn clear(&mut self) {
        self.camera = None;
    }

    /// Whether a camera snapshot has arrived since the last [`clear`](Self::clear).
    pub fn has_camera_state(&self) -> bool {
        self.camera.is_some()
    }

    /// Raw cached value of `key`.
    pub fn camera_value(&self, key: &str) -> Option<&Value> {
        self.camera.as_ref()?.get(key)
    }

    /// Numeric value of `key`, rounded to the nearest integer.
    fn integer(&self, key: &str) -> Option<i64> {
        let value = self.camera_value(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        })
    }

    /// Current iris control value, if the camera has reported a numeric one.
    ///
    /// Fractional readings are rounded, so a reading below 0.5 comes back as
    /// 0, which stepless iris changes treat as unknown.
    pub fn iris(&self) -> Option<i64> {
        self.integer("iris")
    }

    /// Current white-balance gain of `color`, rounded like [`iris`](Self::iris).
    pub fn gain(&self, color: GainColor) -> Option<i64> {
        match color {
            GainColor::Red => self.integer("redGain"),
            GainColor::Blue => self.integer("blueGain"),
        }
    }
}
