use serde::Serialize;
use std::fmt;

/// A loosely typed field value as it appears in a source row before the
/// positional schema gives it meaning.
///
/// `Display` renders the literal form (`True`, `'text'`, `[1, 2.5]`) so that a
/// value written to a checkpoint line parses back to the same value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Textual content of a scalar field: strings unquoted, anything else in
    /// literal form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::None => String::new(),
            other => other.to_string(),
        }
    }

    /// Empty string, `None` and empty lists all mean "not provided".
    pub fn is_blank(&self) -> bool {
        match self {
            Value::None => true,
            Value::Str(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&serde_json::Value> for Value {
    /// Objects become lists of their values in declaration order; key names
    /// are dropped.
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::List(map.values().map(Value::from).collect()),
        }
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => write_quoted(f, s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_form_of_nested_values() {
        let value = Value::List(vec![
            Value::Bool(true),
            Value::text("it's"),
            Value::Float(2.0),
            Value::List(vec![Value::Int(1)]),
        ]);
        assert_eq!(value.to_string(), r"[True, 'it\'s', 2.0, [1]]");
    }

    #[test]
    fn json_objects_flatten_in_declaration_order() {
        let json = json!([{ "type": "Background", "name": "Blue" }, { "z": 1, "a": 2 }]);
        let value = Value::from(&json);
        assert_eq!(
            value,
            Value::List(vec![
                Value::List(vec![Value::text("Background"), Value::text("Blue")]),
                Value::List(vec![Value::Int(1), Value::Int(2)]),
            ])
        );
    }
}
