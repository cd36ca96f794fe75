//! Option schemas and defensive option extraction.
//!
//! Option values reach the bridge as a JSON object produced by the host. The
//! host may have evaluated expressions into them, so nothing about their type
//! is trusted. The `require_*` helpers re-check each value and return a
//! [`Rejection`] describing the first problem.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw option bag of one action invocation.
pub type OptionValues = Map<String, Value>;

/// Widget type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Pick one of the declared choices.
    Dropdown,
    /// Bounded integer input.
    Number,
    /// Free text.
    TextInput,
    /// Boolean toggle.
    Checkbox,
}

/// Dropdown choice identifier: text or integer, exactly as the host stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChoiceId {
    /// Text id, e.g. `RED`.
    Text(String),
    /// Numeric id, e.g. an iris control value.
    Number(i64),
}

impl From<&str> for ChoiceId {
    fn from(id: &str) -> Self {
        ChoiceId::Text(id.to_string())
    }
}

impl From<i64> for ChoiceId {
    fn from(id: i64) -> Self {
        ChoiceId::Number(id)
    }
}

impl From<ChoiceId> for Value {
    fn from(id: ChoiceId) -> Self {
        match id {
            ChoiceId::Text(text) => Value::String(text),
            ChoiceId::Number(n) => Value::from(n),
        }
    }
}

/// One entry of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Value stored in the option when this entry is picked.
    pub id: ChoiceId,
    /// Text shown in the dropdown.
    pub label: String,
}

impl Choice {
    /// Choice with the given id and label.
    pub fn new(id: impl Into<ChoiceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Declared schema of one action option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    /// Key of the option in the invocation's option bag.
    pub id: &'static str,
    /// Widget type.
    #[serde(rename = "type")]
    pub kind: OptionKind,
    /// Label shown next to the widget.
    pub label: &'static str,
    /// Dropdown entries; empty for other widgets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Value the host pre-fills when the action is placed.
    pub default: Value,
    /// Lower bound of a number option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Upper bound of a number option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl OptionSpec {
    /// Dropdown restricted to `choices`.
    pub fn dropdown(id: &'static str, label: &'static str, choices: Vec<Choice>, default: impl Into<Value>) -> Self {
        Self {
            id,
            kind: OptionKind::Dropdown,
            label,
            choices,
            default: default.into(),
            min: None,
            max: None,
        }
    }

    /// Integer input bounded by `range`.
    pub fn number(id: &'static str, label: &'static str, default: i64, range: Bounds) -> Self {
        Self {
            id,
            kind: OptionKind::Number,
            label,
            choices: Vec::new(),
            default: Value::from(default),
            min: Some(range.min),
            max: Some(range.max),
        }
    }

    /// Free text input, empty by default.
    pub fn text(id: &'static str, label: &'static str) -> Self {
        Self {
            id,
            kind: OptionKind::TextInput,
            label,
            choices: Vec::new(),
            default: Value::from(""),
            min: None,
            max: None,
        }
    }

    /// Boolean checkbox.
    pub fn checkbox(id: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            id,
            kind: OptionKind::Checkbox,
            label,
            choices: Vec::new(),
            default: Value::from(default),
            min: None,
            max: None,
        }
    }
}

/// Inclusive numeric bounds of a number option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Smallest accepted value.
    pub min: i64,
    /// Largest accepted value.
    pub max: i64,
}

impl Bounds {
    /// Inclusive range `[min, max]`.
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the range.
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Why an invocation was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("option '{option}' is missing")]
    Missing { option: &'static str },
    #[error("option '{option}' must be {expected}, got {found}")]
    WrongType {
        option: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("option '{option}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        option: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("option '{option}' = {value} is not one of the declared choices")]
    NotAChoice { option: &'static str, value: String },
    #[error("option '{option}' is empty")]
    Empty { option: &'static str },
}

fn present<'a>(options: &'a OptionValues, option: &'static str) -> Result<&'a Value, Rejection> {
    match options.get(option) {
        None | Some(Value::Null) => Err(Rejection::Missing { option }),
        Some(value) => Ok(value),
    }
}

fn wrong_type(option: &'static str, expected: &'static str, found: &Value) -> Rejection {
    Rejection::WrongType {
        option,
        expected,
        found: found.to_string(),
    }
}

/// Integral value of a JSON number. Floats are accepted only when they carry
/// no fractional part.
pub fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// A number option within `bounds`.
pub fn require_integer(options: &OptionValues, option: &'static str, bounds: Bounds) -> Result<i64, Rejection> {
    let value = present(options, option)?;
    let n = as_integer(value).ok_or_else(|| wrong_type(option, "an integer", value))?;
    if !bounds.contains(n) {
        return Err(Rejection::OutOfRange {
            option,
            value: n,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(n)
}

/// A string dropdown choice, mapped through `parse`.
pub fn require_choice<T>(
    options: &OptionValues,
    option: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, Rejection> {
    let value = present(options, option)?;
    let text = value.as_str().ok_or_else(|| wrong_type(option, "a string", value))?;
    parse(text).ok_or_else(|| Rejection::NotAChoice {
        option,
        value: text.to_string(),
    })
}

/// A numeric dropdown choice, mapped through `parse`.
pub fn require_numeric_choice<T>(
    options: &OptionValues,
    option: &'static str,
    parse: impl Fn(i64) -> Option<T>,
) -> Result<T, Rejection> {
    let value = present(options, option)?;
    let n = as_integer(value).ok_or_else(|| wrong_type(option, "a number", value))?;
    parse(n).ok_or_else(|| Rejection::NotAChoice {
        option,
        value: n.to_string(),
    })
}

/// A checkbox. Missing or `null` reads as unchecked.
pub fn optional_flag(options: &OptionValues, option: &'static str) -> Result<bool, Rejection> {
    match options.get(option) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(wrong_type(option, "a boolean", other)),
    }
}

/// Free text, stringifying numbers and booleans. Must not be empty.
pub fn require_text(options: &OptionValues, option: &'static str) -> Result<String, Rejection> {
    let value = present(options, option)?;
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return Err(wrong_type(option, "text", other)),
    };
    if text.is_empty() {
        return Err(Rejection::Empty { option });
    }
    Ok(text)
}
