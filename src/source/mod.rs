pub mod vector;

pub use vector::{Feature, VectorSource};
