use crate::{prelude::HashMap, MapError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Value of a named style variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Boolean(bool),
    Number(f64),
    String(String),
    NumberArray(Vec<f64>),
}

impl VariableValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Boolean(value) => Some(if *value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl TryFrom<&serde_json::Value> for VariableValue {
    type Error = MapError;

    fn try_from(value: &serde_json::Value) -> std::result::Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number).ok_or_else(|| {
                MapError::InvalidStyleVariables(format!("number {n} is out of range"))
            }),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_f64())
                .collect::<Option<Vec<f64>>>()
                .map(Self::NumberArray)
                .ok_or_else(|| {
                    MapError::InvalidStyleVariables(
                        "arrays may only contain numbers".to_string(),
                    )
                }),
            Value::Null | Value::Object(_) => Err(MapError::InvalidStyleVariables(format!(
                "unsupported variable value {value}"
            ))),
        }
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for VariableValue {
    fn from(value: f32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for VariableValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<f64>> for VariableValue {
    fn from(value: Vec<f64>) -> Self {
        Self::NumberArray(value)
    }
}

impl<const N: usize> From<[f64; N]> for VariableValue {
    fn from(value: [f64; N]) -> Self {
        Self::NumberArray(value.to_vec())
    }
}

/// Named style variables referenced from style rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleVariables(HashMap<String, VariableValue>);

impl StyleVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableValue)> {
        self.0.iter()
    }

    /// Merges `patch` into this table; keys in `patch` overwrite, others are kept
    pub fn merge(&mut self, patch: StyleVariables) {
        self.0.extend(patch.0);
    }

    /// Builds a table from an untyped JSON value, which must be an object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            MapError::InvalidStyleVariables(format!("expected an object, got {value}"))
        })?;

        let mut variables = Self::new();
        for (name, value) in object {
            let value = VariableValue::try_from(value).map_err(|e| match e {
                MapError::InvalidStyleVariables(reason) => {
                    MapError::InvalidStyleVariables(format!("'{name}': {reason}"))
                }
                other => other,
            })?;
            variables.insert(name.clone(), value);
        }
        Ok(variables)
    }
}

impl<K, V> FromIterator<(K, V)> for StyleVariables
where
    K: Into<String>,
    V: Into<VariableValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Variable table shared between a layer and its renderers.
///
/// The layer is the single writer; renderers and their uniform accessors only
/// read through this handle.
#[derive(Debug, Clone, Default)]
pub struct SharedVariables(Arc<RwLock<StyleVariables>>);

impl SharedVariables {
    pub fn new(variables: StyleVariables) -> Self {
        Self(Arc::new(RwLock::new(variables)))
    }

    pub fn snapshot(&self) -> StyleVariables {
        self.read(|variables| variables.clone())
    }

    pub fn get(&self, name: &str) -> Option<VariableValue> {
        self.read(|variables| variables.get(name).cloned())
    }

    pub fn read<R>(&self, f: impl FnOnce(&StyleVariables) -> R) -> R {
        let guard = self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    pub(crate) fn merge(&self, patch: StyleVariables) {
        let mut guard = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.merge(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let mut variables = StyleVariables::new()
            .with("fillColor", "red")
            .with("radius", 4);
        variables.merge(StyleVariables::new().with("fillColor", "yellow").with("width", 2.5));

        assert_eq!(variables.get("fillColor"), Some(&VariableValue::from("yellow")));
        assert_eq!(variables.get("radius"), Some(&VariableValue::Number(4.0)));
        assert_eq!(variables.get("width"), Some(&VariableValue::Number(2.5)));
        assert_eq!(variables.len(), 3);
    }

    #[test]
    fn test_from_json() {
        let variables = StyleVariables::from_json(&json!({
            "fillColor": "rgba(255, 0, 0, 0.5)",
            "visible": true,
            "offset": [1, 2]
        }))
        .unwrap();

        assert_eq!(variables.get("visible"), Some(&VariableValue::Boolean(true)));
        assert_eq!(
            variables.get("offset"),
            Some(&VariableValue::NumberArray(vec![1.0, 2.0]))
        );
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        for value in [json!("fillColor"), json!([1, 2]), json!(null), json!(3)] {
            let err = StyleVariables::from_json(&value).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<MapError>(),
                Some(MapError::InvalidStyleVariables(_))
            ));
        }
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = StyleVariables::from_json(&json!({ "nested": { "a": 1 } })).unwrap_err();
        assert!(err.to_string().contains("'nested'"));
        assert!(StyleVariables::from_json(&json!({ "mixed": [1, "a"] })).is_err());
    }

    #[test]
    fn test_shared_variables_visible_to_clones() {
        let shared = SharedVariables::new(StyleVariables::new().with("a", 1));
        let reader = shared.clone();
        shared.merge(StyleVariables::new().with("a", 2));
        assert_eq!(reader.get("a"), Some(VariableValue::Number(2.0)));
    }

    #[test]
    fn test_deserialize_untagged() {
        let variables: StyleVariables =
            serde_json::from_value(json!({ "n": 1.5, "s": "x", "b": false })).unwrap();
        assert_eq!(variables.get("n"), Some(&VariableValue::Number(1.5)));
        assert_eq!(variables.get("s"), Some(&VariableValue::from("x")));
        assert_eq!(variables.get("b"), Some(&VariableValue::Boolean(false)));
    }
}
