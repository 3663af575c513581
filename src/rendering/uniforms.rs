//! Late-bound uniform values for style variables.
//!
//! Every `["var", name]` reference in a style rule becomes a uniform named
//! `u_var_<name>`. Its accessor reads the layer's shared variable table on
//! each call, so variable updates are visible on the next draw without
//! rebuilding anything.

use crate::{
    constants::VARIABLE_UNIFORM_PREFIX,
    prelude::HashMap,
    style::{
        color::{color_from_slice, parse_color},
        variables::{SharedVariables, VariableValue},
    },
};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

/// Value bound to a shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Packs the value into one `vec4` slot; matrices keep their first column
    pub fn to_vec4(&self) -> [f32; 4] {
        match *self {
            Self::Float(v) => [v, 0.0, 0.0, 0.0],
            Self::Vec2([x, y]) => [x, y, 0.0, 0.0],
            Self::Vec3([x, y, z]) => [x, y, z, 0.0],
            Self::Vec4(v) => v,
            Self::Mat4(m) => [m[0], m[1], m[2], m[3]],
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Kind a variable value is converted to before it reaches the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    Color,
    Boolean,
    NumberArray,
    String,
}

impl ValueType {
    /// Infers the kind from the name of the property that references the value
    pub fn for_property(property: &str) -> Option<Self> {
        if property.ends_with("-color") {
            return Some(Self::Color);
        }

        const NUMERIC_SUFFIXES: [&str; 6] =
            ["-radius", "-width", "-opacity", "-size", "-rotation", "-scale"];
        if NUMERIC_SUFFIXES.iter().any(|suffix| property.ends_with(suffix)) {
            return Some(Self::Number);
        }

        if property.ends_with("-offset") || property.ends_with("-displacement") {
            return Some(Self::NumberArray);
        }

        None
    }

    /// Kind of a runtime value, used when the property gives no hint
    pub fn of_value(value: &VariableValue) -> Self {
        match value {
            VariableValue::Boolean(_) => Self::Boolean,
            VariableValue::Number(_) => Self::Number,
            VariableValue::NumberArray(_) => Self::NumberArray,
            VariableValue::String(s) if parse_color(s).is_ok() => Self::Color,
            VariableValue::String(_) => Self::String,
        }
    }

    /// Value used while the variable is not defined
    pub fn zero(&self) -> UniformValue {
        match self {
            Self::Color => UniformValue::Vec4([0.0; 4]),
            Self::NumberArray => UniformValue::Vec2([0.0; 2]),
            Self::Number | Self::Boolean | Self::String => UniformValue::Float(0.0),
        }
    }
}

/// Reads the current value of one uniform
pub type UniformAccessor = Arc<dyn Fn() -> UniformValue + Send + Sync>;

/// Uniform name for a style variable
pub fn variable_uniform_name(name: &str) -> String {
    format!("{VARIABLE_UNIFORM_PREFIX}{name}")
}

/// Builds an accessor that resolves `name` from `variables` on every call
pub fn variable_accessor(
    variables: SharedVariables,
    name: impl Into<String>,
    hint: Option<ValueType>,
) -> UniformAccessor {
    let name = name.into();
    Arc::new(move || match variables.get(&name) {
        Some(value) => to_uniform(&value, hint),
        None => hint.unwrap_or(ValueType::Number).zero(),
    })
}

/// Converts a variable value into a uniform value of the given kind
pub fn to_uniform(value: &VariableValue, hint: Option<ValueType>) -> UniformValue {
    let kind = hint.unwrap_or_else(|| ValueType::of_value(value));
    match (kind, value) {
        (ValueType::Color, VariableValue::String(s)) => match parse_color(s) {
            Ok(color) => UniformValue::Vec4(color.map(|c| c as f32)),
            Err(err) => {
                log::debug!("style variable is not a color: {err}");
                kind.zero()
            }
        },
        (ValueType::Color, VariableValue::NumberArray(values)) => color_from_slice(values)
            .map(|color| UniformValue::Vec4(color.map(|c| c as f32)))
            .unwrap_or_else(|| kind.zero()),
        (_, VariableValue::NumberArray(values)) => array_uniform(values),
        (_, VariableValue::String(s)) => match s.parse::<f64>() {
            Ok(number) if kind == ValueType::Number => UniformValue::Float(number as f32),
            _ => UniformValue::Float(string_to_id(s)),
        },
        (ValueType::Color, other) => {
            let v = other.as_f64().unwrap_or(0.0) as f32;
            UniformValue::Vec4([v, v, v, 1.0])
        }
        (_, other) => UniformValue::Float(other.as_f64().unwrap_or(0.0) as f32),
    }
}

fn array_uniform(values: &[f64]) -> UniformValue {
    let v = |i: usize| values.get(i).copied().unwrap_or(0.0) as f32;
    match values.len() {
        0 | 1 => UniformValue::Float(v(0)),
        2 => UniformValue::Vec2([v(0), v(1)]),
        3 => UniformValue::Vec3([v(0), v(1), v(2)]),
        _ => UniformValue::Vec4([v(0), v(1), v(2), v(3)]),
    }
}

static STRING_IDS: Lazy<Mutex<HashMap<String, f32>>> = Lazy::new(Default::default);

/// Stable numeric id for a string value, shared by every renderer in the process
pub fn string_to_id(value: &str) -> f32 {
    let mut ids = STRING_IDS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let next = ids.len() as f32 + 1.0;
    *ids.entry(value.to_string()).or_insert(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::variables::StyleVariables;

    #[test]
    fn test_property_hints() {
        assert_eq!(ValueType::for_property("circle-fill-color"), Some(ValueType::Color));
        assert_eq!(ValueType::for_property("circle-radius"), Some(ValueType::Number));
        assert_eq!(ValueType::for_property("stroke-width"), Some(ValueType::Number));
        assert_eq!(ValueType::for_property("fill-opacity"), Some(ValueType::Number));
        assert_eq!(ValueType::for_property("filter"), None);
    }

    #[test]
    fn test_accessor_reads_live_values() {
        let shared = SharedVariables::new(StyleVariables::new().with("fillColor", "red"));
        let accessor = variable_accessor(shared.clone(), "fillColor", Some(ValueType::Color));
        assert_eq!(accessor(), UniformValue::Vec4([255.0, 0.0, 0.0, 1.0]));

        shared.merge(StyleVariables::new().with("fillColor", "yellow"));
        assert_eq!(accessor(), UniformValue::Vec4([255.0, 255.0, 0.0, 1.0]));
    }

    #[test]
    fn test_missing_variable_is_zero() {
        let shared = SharedVariables::default();
        let color = variable_accessor(shared.clone(), "c", Some(ValueType::Color));
        let number = variable_accessor(shared.clone(), "n", None);
        assert_eq!(color(), UniformValue::Vec4([0.0; 4]));
        assert_eq!(number(), UniformValue::Float(0.0));

        shared.merge(StyleVariables::new().with("n", 7));
        assert_eq!(number(), UniformValue::Float(7.0));
    }

    #[test]
    fn test_runtime_inference() {
        assert_eq!(
            to_uniform(&VariableValue::from("rgba(0, 0, 255, 0.5)"), None),
            UniformValue::Vec4([0.0, 0.0, 255.0, 0.5])
        );
        assert_eq!(to_uniform(&VariableValue::Boolean(true), None), UniformValue::Float(1.0));
        assert_eq!(
            to_uniform(&VariableValue::from([1.0, 2.0]), None),
            UniformValue::Vec2([1.0, 2.0])
        );
        assert_eq!(
            to_uniform(&VariableValue::from("4.5"), Some(ValueType::Number)),
            UniformValue::Float(4.5)
        );
    }

    #[test]
    fn test_string_ids_are_stable() {
        let a = string_to_id("highway");
        let b = string_to_id("river");
        assert_ne!(a, b);
        assert_eq!(string_to_id("highway"), a);
        assert!(a >= 1.0);
    }
}
