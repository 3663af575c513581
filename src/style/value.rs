use crate::MapError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operator name that marks a style variable reference
pub const VAR_OPERATOR: &str = "var";

/// Value of a style property.
///
/// `["var", name]` arrays become [`StyleValue::Variable`] and are resolved
/// late, at draw time. Other arrays starting with an operator name are kept
/// as expressions so nested variable references can still be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum StyleValue {
    Literal(Value),
    Variable(String),
    Expression { operator: String, args: Vec<StyleValue> },
}

impl StyleValue {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn parse(value: &Value) -> Result<Self, MapError> {
        let Value::Array(items) = value else {
            return Ok(Self::Literal(value.clone()));
        };

        let Some(Value::String(operator)) = items.first() else {
            return Ok(Self::Literal(value.clone()));
        };

        if operator == VAR_OPERATOR {
            return match items.as_slice() {
                [_, Value::String(name)] => Ok(Self::Variable(name.clone())),
                _ => Err(MapError::InvalidStyle(format!(
                    "expected [\"var\", name], got {value}"
                ))),
            };
        }

        let args = items[1..]
            .iter()
            .map(Self::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Expression {
            operator: operator.clone(),
            args,
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Variable(name) => Value::Array(vec![
                Value::String(VAR_OPERATOR.to_string()),
                Value::String(name.clone()),
            ]),
            Self::Expression { operator, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(operator.clone()));
                items.extend(args.iter().map(Self::to_json));
                Value::Array(items)
            }
        }
    }

    /// Whether this value contains a variable reference at any depth
    pub fn is_variable_dependent(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Variable(_) => true,
            Self::Expression { args, .. } => args.iter().any(Self::is_variable_dependent),
        }
    }

    /// Collects referenced variable names, depth-first, in order of appearance
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Variable(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Self::Expression { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

impl TryFrom<Value> for StyleValue {
    type Error = MapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StyleValue> for Value {
    fn from(value: StyleValue) -> Self {
        value.to_json()
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::literal(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        Self::literal(value)
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        Self::literal(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_variable() {
        let value = StyleValue::parse(&json!(["var", "fillColor"])).unwrap();
        assert_eq!(value, StyleValue::var("fillColor"));
        assert_eq!(value.to_json(), json!(["var", "fillColor"]));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(StyleValue::parse(&json!(4)).unwrap(), StyleValue::from(4));
        assert_eq!(StyleValue::parse(&json!("red")).unwrap(), StyleValue::from("red"));
        // Numeric arrays are literal colors, not expressions
        assert_eq!(
            StyleValue::parse(&json!([255, 0, 0, 1])).unwrap(),
            StyleValue::literal(json!([255, 0, 0, 1]))
        );
    }

    #[test]
    fn test_nested_expression_variables() {
        let value = StyleValue::parse(&json!([
            "interpolate",
            ["linear"],
            ["var", "size"],
            0,
            ["*", ["var", "base"], ["var", "size"]]
        ]))
        .unwrap();

        let mut names = Vec::new();
        value.collect_variables(&mut names);
        assert_eq!(names, vec!["size".to_string(), "base".to_string()]);
        assert!(value.is_variable_dependent());
    }

    #[test]
    fn test_malformed_variable_reference() {
        assert!(StyleValue::parse(&json!(["var"])).is_err());
        assert!(StyleValue::parse(&json!(["var", 3])).is_err());
        assert!(StyleValue::parse(&json!(["var", "a", "b"])).is_err());
    }
}
