//! Rendering payload values as display text.

use std::borrow::Cow;

use serde_json::{Number, Value};

/// Text shown for a missing or null payload value.
pub const PLACEHOLDER: &str = "-";

/// Render one payload value for display.
///
/// Missing and `null` values become [`PLACEHOLDER`]. Strings are written
/// verbatim (an empty string is a present value and stays empty), numbers and
/// booleans use their JSON spelling, and nested arrays or objects are written
/// as compact JSON. Whole-number floats drop their fraction (`1000.0` shows
/// as `1000`), as a browser renders them.
pub fn display_value(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(PLACEHOLDER),
        Some(Value::String(text)) => Cow::Borrowed(text.as_str()),
        Some(Value::Bool(true)) => Cow::Borrowed("true"),
        Some(Value::Bool(false)) => Cow::Borrowed("false"),
        Some(Value::Number(number)) => Cow::Owned(number_text(number)),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => Cow::Owned(nested.to_string()),
    }
}

fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.abs() < 1e21 => {
            // f64's Display omits the fraction of whole values
            let text = float.to_string();
            if text.contains('.') {
                number.to_string()
            } else if text == "-0" {
                "0".to_owned()
            } else {
                text
            }
        }
        _ => number.to_string(),
    }
}
