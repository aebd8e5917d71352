//! Resource descriptors
//!
//! One descriptor per upstream collection: where it lives, how it is paged,
//! how its rows are keyed and which fields are kept on the way to the
//! warehouse.

mod transform;
mod types;

pub use transform::{parse_timestamp, transform};
pub use types::{FieldDef, FieldType, ResourceDescriptor};

#[cfg(test)]
mod tests;
