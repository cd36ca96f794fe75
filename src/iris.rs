//! Iris step table
//!
//! The P2 protocol exposes iris as a continuous control value. Operators think
//! in f-stops, so the configuration carries a table of `label:value` pairs
//! (`"2.8:2970;3:3150;...;CLOSE:8174"`) that maps stops onto control values.
//!
//! The table keeps configuration order. Values are not guaranteed to be
//! monotonic, so [`IrisTable::nearest`] scans instead of binary-searching.

use serde::Serialize;

/// One configured stop.
///
/// `value` is `None` when the segment could not be parsed. Such a step stays
/// in the table (so indices match the configuration) but is never selected
/// as a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrisStep {
    /// Label as configured, e.g. `2.8` or `CLOSE`.
    pub label: String,
    /// Control value, or `None` when the entry is malformed.
    pub value: Option<i64>,
}

/// Ordered iris steps derived from one configuration load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrisTable {
    steps: Vec<IrisStep>,
}

impl IrisTable {
    /// Parse a `label:value;label:value` string.
    ///
    /// Empty segments are skipped. A segment without `:` or without leading
    /// digits after it becomes a step with `value: None`.
    pub fn parse(config: &str) -> Self {
        let steps = config
            .split(';')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once(':') {
                Some((label, value)) => IrisStep {
                    label: label.to_string(),
                    value: parse_leading_int(value),
                },
                None => IrisStep {
                    label: segment.to_string(),
                    value: None,
                },
            })
            .collect();
        Self { steps }
    }

    /// Table for an optional configuration entry. `None` yields an empty table.
    pub fn from_config(config: Option<&str>) -> Self {
        config.map(Self::parse).unwrap_or_default()
    }

    /// Every configured step, malformed ones included.
    pub fn steps(&self) -> &[IrisStep] {
        &self.steps
    }

    /// Number of configured steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are configured.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that can actually be sent to the camera.
    pub fn valid_steps(&self) -> impl Iterator<Item = &IrisStep> {
        self.steps.iter().filter(|step| step.value.is_some())
    }

    /// Number of malformed entries, reported once per configuration load.
    pub fn malformed_count(&self) -> usize {
        self.steps.iter().filter(|step| step.value.is_none()).count()
    }

    /// Value of the first configured entry.
    pub fn first_value(&self) -> Option<i64> {
        self.steps.first().and_then(|step| step.value)
    }

    /// Step whose value is closest to `current`.
    ///
    /// Ties resolve to the first step encountered.
    pub fn nearest(&self, current: Option<i64>) -> Option<&IrisStep> {
        let current = current?;
        let mut best: Option<(&IrisStep, u64)> = None;
        for step in &self.steps {
            let Some(value) = step.value else { continue };
            let distance = value.abs_diff(current);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((step, distance)),
            }
        }
        best.map(|(step, _)| step)
    }

    /// Move `direction` entries away from `current`, clamped to the table.
    ///
    /// An unknown `current` (not in the table, or `None`) starts from index 0.
    pub fn step(&self, current: Option<&IrisStep>, direction: i64) -> Option<&IrisStep> {
        if self.steps.is_empty() {
            return None;
        }
        let last = self.steps.len() as i64 - 1;
        let next = match current.and_then(|c| self.steps.iter().position(|s| s == c)) {
            Some(index) => (index as i64).saturating_add(direction).clamp(0, last),
            None => 0,
        };
        self.steps.get(next as usize)
    }
}

/// Integer parse in the spirit of a lenient `parseInt`: leading whitespace,
/// optional sign, then as many decimal digits as are present.
fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(i, _)| i);
    if digits_end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
