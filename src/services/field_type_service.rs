//! Display labels for field types.
//!
//! The describe payload reports a raw type name (`reference`, `picklist`,
//! `double`, ...) plus type-specific attributes. The schema listing shows
//! a single human-readable string per field instead, e.g.
//! `Lookup (Account, Contact)`, `Picklist (Hot, Warm, Cold)`,
//! `String (80)` or `Currency (16,2)`.

use crate::external::metadata_provider::FieldDescribe;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldTypeError {
    #[error("field {field}: {attribute} is not an integer ({value})")]
    NotAnInteger {
        field: String,
        attribute: &'static str,
        value: String,
    },
    #[error("field {field}: precision {precision} and scale {scale} are out of range")]
    OutOfRange {
        field: String,
        precision: i64,
        scale: i64,
    },
}

/// Builds the display label for one field. First matching rule wins.
pub fn data_type_label(field: &FieldDescribe) -> Result<String, FieldTypeError> {
    if is_calculated(field) {
        return Ok(format!("Formula ({})", field.field_type));
    }

    let label = match field.field_type.as_str() {
        "reference" => {
            let targets: Vec<String> = field
                .reference_to
                .iter()
                .flatten()
                .map(String::as_str)
                .map(title_case)
                .collect();
            with_list("Lookup".to_string(), &targets)
        }
        "picklist" | "multipicklist" => {
            let values: Vec<String> = field
                .picklist_values
                .iter()
                .flatten()
                .filter_map(|entry| entry.label.clone().or_else(|| entry.value.clone()))
                .collect();
            with_list(title_case(&field.field_type), &values)
        }
        "string" | "textarea" => {
            let mut label = title_case(&field.field_type);
            if let Some(length) = field.length.as_ref().and_then(render_scalar) {
                label.push_str(&format!(" ({})", length));
            }
            label
        }
        "double" | "percent" | "currency" => {
            let mut label = title_case(&field.field_type);
            let precision = integer_attribute(field, "precision", field.precision.as_ref())?;
            let scale = integer_attribute(field, "scale", field.scale.as_ref())?;
            if let (Some(precision), Some(scale)) = (precision, scale) {
                let digits = precision.checked_sub(scale).ok_or_else(|| {
                    FieldTypeError::OutOfRange {
                        field: field.name.clone(),
                        precision,
                        scale,
                    }
                })?;
                label.push_str(&format!(" ({},{})", digits, scale));
            }
            label
        }
        other => title_case(other),
    };

    Ok(label)
}

/// Upper-cases every cased letter that follows an uncased character and
/// lower-cases the rest: `multipicklist` -> `Multipicklist`,
/// `FAQ__kav` -> `Faq__Kav`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_cased = false;

    for c in input.chars() {
        if c.is_uppercase() || c.is_lowercase() {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            out.push(c);
            previous_cased = false;
        }
    }

    out
}

fn is_calculated(field: &FieldDescribe) -> bool {
    match &field.calculated {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag == "true",
        _ => false,
    }
}

fn with_list(prefix: String, items: &[String]) -> String {
    if items.is_empty() {
        prefix
    } else {
        format!("{} ({})", prefix, items.join(", "))
    }
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn integer_attribute(
    field: &FieldDescribe,
    attribute: &'static str,
    value: Option<&Value>,
) -> Result<Option<i64>, FieldTypeError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| FieldTypeError::NotAnInteger {
        field: field.name.clone(),
        attribute,
        value: value.to_string(),
    })
}
