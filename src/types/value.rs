use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single sensor field value as exported by the logging app.
///
/// The app writes every CSV cell (and most JSON values) as text; cells that
/// look numeric become numbers, everything else is kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Classify exported text: integer, float (dot or comma decimal), or text
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if is_int_literal(trimmed) {
            if let Ok(v) = trimmed.parse::<i64>() {
                return FieldValue::Int(v);
            }
        }
        if is_float_literal(trimmed) {
            if let Ok(v) = trimmed.replace(',', ".").parse::<f64>() {
                return FieldValue::Float(v);
            }
        }
        FieldValue::Text(text.to_string())
    }

    /// Map a JSON value; `null`, arrays and objects carry no field value
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(FieldValue::from_text(s)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

fn strip_sign(text: &str) -> &str {
    text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text)
}

fn all_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

/// `[-+]?([1-9]\d*|0)`
fn is_int_literal(text: &str) -> bool {
    let digits = strip_sign(text);
    !digits.is_empty() && all_digits(digits) && (digits == "0" || !digits.starts_with('0'))
}

/// `[-+]?(\d+([.,]\d*)?|[.,]\d+)([eE][-+]?\d+)?`
fn is_float_literal(text: &str) -> bool {
    let body = strip_sign(text);
    let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };

    if let Some(exp) = exponent {
        let exp = strip_sign(exp);
        if exp.is_empty() || !all_digits(exp) {
            return false;
        }
    }

    let mut parts = mantissa.splitn(2, |c: char| c == '.' || c == ',');
    let whole = parts.next().unwrap_or("");
    match parts.next() {
        None => !whole.is_empty() && all_digits(whole),
        Some(frac) => {
            all_digits(whole) && all_digits(frac) && !(whole.is_empty() && frac.is_empty())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_text() {
        assert_eq!(FieldValue::from_text("42"), FieldValue::Int(42));
        assert_eq!(FieldValue::from_text("-7"), FieldValue::Int(-7));
        assert_eq!(FieldValue::from_text("0"), FieldValue::Int(0));
        assert_eq!(FieldValue::from_text("0.25"), FieldValue::Float(0.25));
        assert_eq!(FieldValue::from_text("1,5"), FieldValue::Float(1.5));
        assert_eq!(FieldValue::from_text(".5"), FieldValue::Float(0.5));
        assert_eq!(FieldValue::from_text("3."), FieldValue::Float(3.0));
        assert_eq!(FieldValue::from_text("1e-3"), FieldValue::Float(0.001));
        assert_eq!(
            FieldValue::from_text("unplugged"),
            FieldValue::Text("unplugged".into())
        );
    }

    #[test]
    fn test_leading_zero_is_float_not_int() {
        assert_eq!(FieldValue::from_text("007"), FieldValue::Float(7.0));
    }

    #[test]
    fn test_not_numbers() {
        for text in [".", "", "1e", "e5", "1.2.3", "12abc", "+"] {
            assert!(
                matches!(FieldValue::from_text(text), FieldValue::Text(_)),
                "{:?} should stay text",
                text
            );
        }
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FieldValue::from_json(&json!(3)), Some(FieldValue::Int(3)));
        assert_eq!(FieldValue::from_json(&json!(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(FieldValue::from_json(&json!("9.81")), Some(FieldValue::Float(9.81)));
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(FieldValue::from_json(&json!([1, 2])), None);
    }

    #[test]
    fn test_serializes_untagged() {
        let values = vec![
            FieldValue::Int(1),
            FieldValue::Float(0.5),
            FieldValue::Text("charging".into()),
        ];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[1,0.5,"charging"]"#
        );
    }
}
