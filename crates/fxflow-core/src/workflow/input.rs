//! Validation and coercion of INPUT step answers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::ValidationError;

/// Declared type of an INPUT answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    #[serde(alias = "str", alias = "text")]
    String,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "bool")]
    Boolean,
}

/// Constraints applied to an INPUT answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputValidation {
    #[serde(rename = "type", default)]
    pub kind: InputType,

    /// Inclusive numeric bounds (integer and float)
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,

    /// Inclusive character-count bounds (string)
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,

    #[serde(default)]
    pub choices: Vec<Value>,

    /// Regular expression the trimmed answer must match (string)
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Parse one line of user input into a typed value.
pub fn validate_and_coerce(raw: &str, rules: &InputValidation) -> Result<Value, ValidationError> {
    let input = raw.trim();

    let value = match rules.kind {
        InputType::String => {
            check_length(input, rules)?;
            check_pattern(input, rules)?;
            Value::String(input.to_string())
        }
        InputType::Integer => {
            let n: i64 = input.parse().map_err(|_| ValidationError::Format {
                expected: "an integer",
                input: input.to_string(),
            })?;
            check_range(n as f64, rules)?;
            Value::from(n)
        }
        InputType::Float => {
            let f: f64 = input
                .parse()
                .ok()
                .filter(|f: &f64| f.is_finite())
                .ok_or_else(|| ValidationError::Format {
                    expected: "a number",
                    input: input.to_string(),
                })?;
            check_range(f, rules)?;
            Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        InputType::Boolean => match input.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Value::Bool(true),
            "false" | "no" | "n" | "0" => Value::Bool(false),
            _ => {
                return Err(ValidationError::Format {
                    expected: "yes or no",
                    input: input.to_string(),
                })
            }
        },
    };

    check_choices(input, &value, rules)?;
    Ok(value)
}

/// Validate a value supplied from outside the prompt (run parameters).
pub fn accept_value(value: &Value, rules: &InputValidation) -> Result<Value, ValidationError> {
    validate_and_coerce(&value_text(value), rules)
}

/// Plain text of a scalar, JSON for anything structured.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn check_range(value: f64, rules: &InputValidation) -> Result<(), ValidationError> {
    let below = rules.min.is_some_and(|min| value < min);
    let above = rules.max.is_some_and(|max| value > max);
    if below || above {
        return Err(ValidationError::Range {
            value,
            range: describe_bounds(rules.min, rules.max),
        });
    }
    Ok(())
}

fn check_length(input: &str, rules: &InputValidation) -> Result<(), ValidationError> {
    let length = input.chars().count();
    let short = rules.min_length.is_some_and(|min| length < min);
    let long = rules.max_length.is_some_and(|max| length > max);
    if short || long {
        return Err(ValidationError::Length {
            length,
            range: describe_bounds(rules.min_length, rules.max_length),
        });
    }
    Ok(())
}

fn check_pattern(input: &str, rules: &InputValidation) -> Result<(), ValidationError> {
    let Some(pattern) = &rules.pattern else {
        return Ok(());
    };
    let re = Regex::new(pattern).map_err(|e| ValidationError::BadPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;
    if re.is_match(input) {
        Ok(())
    } else {
        Err(ValidationError::Pattern {
            input: input.to_string(),
            pattern: pattern.clone(),
        })
    }
}

fn check_choices(input: &str, value: &Value, rules: &InputValidation) -> Result<(), ValidationError> {
    if rules.choices.is_empty() {
        return Ok(());
    }
    let matched = rules
        .choices
        .iter()
        .any(|choice| choice == value || value_text(choice) == input);
    if matched {
        return Ok(());
    }
    Err(ValidationError::Choice {
        input: input.to_string(),
        choices: rules
            .choices
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn describe_bounds<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{}..={}", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => "unbounded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn integer(min: f64, max: f64) -> InputValidation {
        InputValidation {
            kind: InputType::Integer,
            min: Some(min),
            max: Some(max),
            ..Default::default()
        }
    }

    #[test]
    fn test_integer_format_then_range() {
        let rules = integer(1.0, 5.0);
        assert!(matches!(
            validate_and_coerce("abc", &rules),
            Err(ValidationError::Format { .. })
        ));
        let err = validate_and_coerce("9", &rules).unwrap_err();
        assert_eq!(err.to_string(), "value 9 is outside the allowed range 1..=5");
        assert_eq!(validate_and_coerce(" 3 ", &rules).unwrap(), json!(3));
    }

    #[test]
    fn test_float_and_boolean() {
        let float = InputValidation {
            kind: InputType::Float,
            ..Default::default()
        };
        assert_eq!(validate_and_coerce("1.25", &float).unwrap(), json!(1.25));
        assert!(validate_and_coerce("NaN", &float).is_err());

        let boolean = InputValidation {
            kind: InputType::Boolean,
            ..Default::default()
        };
        assert_eq!(validate_and_coerce("Yes", &boolean).unwrap(), json!(true));
        assert_eq!(validate_and_coerce("0", &boolean).unwrap(), json!(false));
        assert!(validate_and_coerce("maybe", &boolean).is_err());
    }

    #[test]
    fn test_string_length_pattern_and_choices() {
        let rules = InputValidation {
            min_length: Some(3),
            max_length: Some(7),
            pattern: Some(r"^[A-Z]{3}/[A-Z]{3}$".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_and_coerce("EU", &rules),
            Err(ValidationError::Length { length: 2, .. })
        ));
        assert!(matches!(
            validate_and_coerce("eur/usd", &rules),
            Err(ValidationError::Pattern { .. })
        ));
        assert_eq!(validate_and_coerce("EUR/USD", &rules).unwrap(), json!("EUR/USD"));

        let choices = InputValidation {
            choices: vec![json!("1h"), json!("4h"), json!("1d")],
            ..Default::default()
        };
        assert!(validate_and_coerce("4h", &choices).is_ok());
        let err = validate_and_coerce("2h", &choices).unwrap_err();
        assert_eq!(err.to_string(), "`2h` is not one of: 1h, 4h, 1d");
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let rules = InputValidation {
            pattern: Some("(".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_and_coerce("x", &rules),
            Err(ValidationError::BadPattern { .. })
        ));
    }

    #[test]
    fn test_accept_value_coerces_supplied_parameters() {
        let rules = integer(1.0, 30.0);
        assert_eq!(accept_value(&json!("14"), &rules).unwrap(), json!(14));
        assert_eq!(accept_value(&json!(7), &rules).unwrap(), json!(7));
        assert!(accept_value(&json!(90), &rules).is_err());
    }
}
