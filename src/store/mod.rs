//! Record store collaborator: the query/scan/save/update/delete primitives the endpoints consume.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::schema::{AttributeValue, Item, ModelIdentity};
use crate::service::PaginationCursor;
use async_trait::async_trait;

/// Key-condition query on the table's primary key (`index_name: None`) or on a secondary index.
#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub hash_value: AttributeValue,
    pub index_name: Option<String>,
    pub cursor: Option<PaginationCursor>,
    pub limit: Option<usize>,
    /// Order by the sort key, highest first.
    pub descending: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ScanRequest {
    pub cursor: Option<PaginationCursor>,
    pub limit: Option<usize>,
}

/// One bounded page of items plus the continuation key, if the store stopped early.
#[derive(Clone, Debug, Default)]
pub struct ResultPage {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<PaginationCursor>,
}

/// Attribute-level SET. A `Null` value removes the attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetAction {
    pub attribute: String,
    pub value: AttributeValue,
}

impl SetAction {
    pub fn new(attribute: impl Into<String>, value: AttributeValue) -> Self {
        SetAction {
            attribute: attribute.into(),
            value,
        }
    }
}

/// The store client. Calls are single-shot: no retry, no timeout beyond the client's own.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, model: &ModelIdentity, request: QueryRequest) -> Result<ResultPage, StoreError>;

    async fn scan(&self, model: &ModelIdentity, request: ScanRequest) -> Result<ResultPage, StoreError>;

    /// Put the full item, replacing any item with the same key.
    async fn save(&self, model: &ModelIdentity, item: Item) -> Result<(), StoreError>;

    /// Apply SET actions to the item at `key` and return all of its attributes afterwards.
    async fn update(&self, model: &ModelIdentity, key: Item, actions: Vec<SetAction>) -> Result<Item, StoreError>;

    async fn delete(&self, model: &ModelIdentity, key: Item) -> Result<(), StoreError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
