//! Storage side of a resource: attribute values, the per-table attribute model, records.

mod attribute;
mod model;
mod record;

pub use attribute::{AttributeValue, FieldValue, Item, STORED_DATETIME_FORMAT};
pub use model::{AttributeDescriptor, AttributeType, IndexIdentity, ModelIdentity, StorageModel};
pub use record::Record;
