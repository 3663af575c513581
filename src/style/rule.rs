use crate::{style::value::StyleValue, MapError};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

/// Ordered mapping from visual property name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct StyleRule {
    properties: Vec<(String, StyleValue)>,
}

/// A variable reference found in a rule, with the property it appears in
#[derive(Debug, Clone, PartialEq)]
pub struct VariableReference {
    pub name: String,
    pub property: String,
    /// The property value is the bare reference, not an expression around it
    pub direct: bool,
}

impl StyleRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; replaces an existing property in place
    pub fn with(mut self, property: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<StyleValue>) {
        let property = property.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(name, _)| *name == property) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((property, value)),
        }
    }

    pub fn get(&self, property: &str) -> Option<&StyleValue> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether any property uses the given prefix (`"circle-"`, `"fill-"`, ...)
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.properties
            .iter()
            .any(|(name, _)| name.starts_with(prefix))
    }

    /// All variable references in property order, one entry per variable name
    pub fn variable_references(&self) -> Vec<VariableReference> {
        let mut references: Vec<VariableReference> = Vec::new();
        for (property, value) in &self.properties {
            let mut names = Vec::new();
            value.collect_variables(&mut names);
            let direct = matches!(value, StyleValue::Variable(_));

            for name in names {
                match references.iter_mut().find(|r| r.name == name) {
                    // A direct reference carries a precise type; prefer it
                    Some(existing) if direct && !existing.direct => {
                        existing.property = property.clone();
                        existing.direct = true;
                    }
                    Some(_) => {}
                    None => references.push(VariableReference {
                        name,
                        property: property.clone(),
                        direct,
                    }),
                }
            }
        }
        references
    }

    pub fn to_json(&self) -> Value {
        let mut object = JsonMap::new();
        for (name, value) in &self.properties {
            object.insert(name.clone(), value.to_json());
        }
        Value::Object(object)
    }
}

impl TryFrom<Value> for StyleRule {
    type Error = MapError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(object) = value else {
            return Err(MapError::InvalidStyle(format!(
                "a style rule must be an object, got {value}"
            )));
        };

        let properties = object
            .iter()
            .map(|(name, value)| Ok((name.clone(), StyleValue::parse(value)?)))
            .collect::<Result<Vec<_>, MapError>>()?;

        Ok(Self { properties })
    }
}

impl From<StyleRule> for Value {
    fn from(rule: StyleRule) -> Self {
        rule.to_json()
    }
}

/// A normalized style entry: the literal rule and an optional filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRuleDescriptor {
    pub style: StyleRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<StyleValue>,
}

impl StyleRuleDescriptor {
    pub fn new(style: StyleRule) -> Self {
        Self {
            style,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<StyleValue>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Variable references of the rule followed by those of the filter
    pub fn variable_references(&self) -> Vec<VariableReference> {
        let mut references = self.style.variable_references();
        if let Some(filter) = &self.filter {
            let mut names = Vec::new();
            filter.collect_variables(&mut names);
            for name in names {
                if !references.iter().any(|r| r.name == name) {
                    references.push(VariableReference {
                        name,
                        property: "filter".to_string(),
                        direct: false,
                    });
                }
            }
        }
        references
    }
}

/// Style configuration of a vector layer: one rule or an ordered list
#[derive(Debug, Clone, PartialEq)]
pub enum LayerStyle {
    Rule(StyleRule),
    Rules(Vec<StyleRule>),
    Descriptors(Vec<StyleRuleDescriptor>),
}

impl LayerStyle {
    /// Ordered per-rule descriptors; a single rule becomes a one-element list
    pub fn normalize(&self) -> Vec<StyleRuleDescriptor> {
        match self {
            Self::Rule(rule) => vec![StyleRuleDescriptor::new(rule.clone())],
            Self::Rules(rules) => rules.iter().cloned().map(StyleRuleDescriptor::new).collect(),
            Self::Descriptors(descriptors) => descriptors.clone(),
        }
    }

    /// Parses an object (single rule) or array of rules / `{style, filter}` entries
    pub fn from_json(value: &Value) -> Result<Self, MapError> {
        match value {
            Value::Object(_) => Ok(Self::Rule(StyleRule::try_from(value.clone())?)),
            Value::Array(items) => {
                let is_descriptor = |item: &Value| {
                    item.as_object()
                        .map(|object| object.contains_key("style"))
                        .unwrap_or(false)
                };

                if !items.is_empty() && items.iter().all(is_descriptor) {
                    let descriptors = items
                        .iter()
                        .map(|item| serde_json::from_value(item.clone()).map_err(MapError::from))
                        .collect::<Result<Vec<StyleRuleDescriptor>, _>>()?;
                    Ok(Self::Descriptors(descriptors))
                } else {
                    let rules = items
                        .iter()
                        .map(|item| StyleRule::try_from(item.clone()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::Rules(rules))
                }
            }
            other => Err(MapError::InvalidStyle(format!(
                "a style must be an object or an array, got {other}"
            ))),
        }
    }
}

impl From<StyleRule> for LayerStyle {
    fn from(rule: StyleRule) -> Self {
        Self::Rule(rule)
    }
}

impl From<Vec<StyleRule>> for LayerStyle {
    fn from(rules: Vec<StyleRule>) -> Self {
        Self::Rules(rules)
    }
}

impl From<Vec<StyleRuleDescriptor>> for LayerStyle {
    fn from(descriptors: Vec<StyleRuleDescriptor>) -> Self {
        Self::Descriptors(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_keeps_property_order() {
        let rule = StyleRule::try_from(json!({
            "stroke-width": 2,
            "circle-radius": 4,
            "circle-fill-color": ["var", "fillColor"]
        }))
        .unwrap();

        let names: Vec<&str> = rule.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["stroke-width", "circle-radius", "circle-fill-color"]);
        assert_eq!(
            rule.get("circle-fill-color"),
            Some(&StyleValue::var("fillColor"))
        );
        assert_eq!(
            rule.to_json(),
            json!({
                "stroke-width": 2,
                "circle-radius": 4,
                "circle-fill-color": ["var", "fillColor"]
            })
        );
    }

    #[test]
    fn test_single_rule_normalizes_to_one_descriptor() {
        let rule = StyleRule::new().with("fill-color", "red");
        let descriptors = LayerStyle::from(rule.clone()).normalize();
        assert_eq!(descriptors, vec![StyleRuleDescriptor::new(rule)]);
    }

    #[test]
    fn test_from_json_variants() {
        let single = LayerStyle::from_json(&json!({ "fill-color": "red" })).unwrap();
        assert!(matches!(single, LayerStyle::Rule(_)));

        let rules = LayerStyle::from_json(&json!([
            { "circle-radius": 4 },
            { "fill-color": "red" }
        ]))
        .unwrap();
        assert_eq!(rules.normalize().len(), 2);

        let filtered = LayerStyle::from_json(&json!([
            { "style": { "fill-color": "red" }, "filter": [">", ["get", "size"], ["var", "min"]] }
        ]))
        .unwrap();
        let descriptors = filtered.normalize();
        assert!(descriptors[0].filter.is_some());
        assert_eq!(descriptors[0].variable_references()[0].name, "min");

        assert!(LayerStyle::from_json(&json!("red")).is_err());
        assert!(LayerStyle::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_variable_references_prefer_direct() {
        let rule = StyleRule::try_from(json!({
            "circle-radius": ["*", ["var", "size"], 2],
            "stroke-width": ["var", "size"],
            "fill-color": ["var", "fillColor"]
        }))
        .unwrap();

        let references = rule.variable_references();
        assert_eq!(references.len(), 2);
        assert_eq!(references[0].name, "size");
        assert_eq!(references[0].property, "stroke-width");
        assert!(references[0].direct);
        assert_eq!(references[1].property, "fill-color");
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut rule = StyleRule::new().with("a", 1).with("b", 2);
        rule.set("a", 3);
        let names: Vec<&str> = rule.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(rule.get("a"), Some(&StyleValue::from(3)));
    }
}
