//! Declarative vector styles and the variables they reference

pub mod color;
pub mod rule;
pub mod value;
pub mod variables;

pub use color::{parse_color, ColorArray};
pub use rule::{LayerStyle, StyleRule, StyleRuleDescriptor, VariableReference};
pub use value::StyleValue;
pub use variables::{SharedVariables, StyleVariables, VariableValue};
