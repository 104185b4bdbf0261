//! In-process store with DynamoDB paging semantics. Backs tests and the `memory` consumer mode.

use crate::error::StoreError;
use crate::schema::{AttributeValue, Item, ModelIdentity};
use crate::service::PaginationCursor;
use crate::store::{QueryRequest, RecordStore, ResultPage, ScanRequest, SetAction};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Item>>>,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of save/update/delete calls that reached the store.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(AtomicOrdering::SeqCst)
    }

    pub fn item_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    fn read_table(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let guard = self.tables.read().map_err(|_| lock_error())?;
        Ok(guard.get(table).cloned().unwrap_or_default())
    }
}

fn lock_error() -> StoreError {
    StoreError::Backend("store lock poisoned".into())
}

fn cmp_by(a: &Item, b: &Item, names: &[&str]) -> Ordering {
    for name in names {
        let ord = match (a.get(*name), b.get(*name)) {
            (Some(x), Some(y)) => x.key_cmp(y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn matches_key(item: &Item, key: &Item) -> bool {
    key.iter().all(|(k, v)| item.get(k) == Some(v))
}

fn require_key(identity: &ModelIdentity, item: &Item) -> Result<Item, StoreError> {
    let mut key = Item::new();
    for name in identity.key_names() {
        let v = item.get(name).ok_or_else(|| StoreError::MissingKey(name.to_string()))?;
        key.insert(name.to_string(), v.clone());
    }
    Ok(key)
}

/// Sort, skip past the cursor, cut to `limit`, and report the last key when more remain.
fn paginate(
    mut items: Vec<Item>,
    order: &[&str],
    descending: bool,
    cursor: Option<&PaginationCursor>,
    limit: Option<usize>,
    key_names: &[&str],
) -> ResultPage {
    items.sort_by(|a, b| {
        let ord = cmp_by(a, b, order);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    if let Some(cursor) = cursor {
        let start = &cursor.0;
        items.retain(|item| {
            let ord = cmp_by(item, start, order);
            if descending {
                ord == Ordering::Less
            } else {
                ord == Ordering::Greater
            }
        });
    }
    let limit = limit.unwrap_or(usize::MAX);
    let more = items.len() > limit;
    items.truncate(limit);
    let last_evaluated_key = if more {
        items.last().map(|last| {
            let key: Item = key_names
                .iter()
                .filter_map(|n| last.get(*n).map(|v| (n.to_string(), v.clone())))
                .collect();
            PaginationCursor(key)
        })
    } else {
        None
    };
    ResultPage {
        items,
        last_evaluated_key,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, model: &ModelIdentity, request: QueryRequest) -> Result<ResultPage, StoreError> {
        let items = self.read_table(&model.table_name)?;
        let mut key_names = model.key_names();
        let (hash_key, range_key) = match &request.index_name {
            Some(name) => {
                let index = model
                    .index_named(name)
                    .ok_or_else(|| StoreError::Backend(format!("index not found: {}", name)))?;
                key_names.push(index.hash_key.as_str());
                if let Some(r) = &index.range_key {
                    key_names.push(r.as_str());
                }
                (index.hash_key.as_str(), index.range_key.as_deref())
            }
            None => (model.hash_key.as_str(), model.range_key.as_deref()),
        };
        // Items lacking the index keys are not in the index.
        let matching: Vec<Item> = items
            .into_iter()
            .filter(|item| item.get(hash_key) == Some(&request.hash_value))
            .filter(|item| range_key.map(|r| item.contains_key(r)).unwrap_or(true))
            .collect();
        let mut order: Vec<&str> = Vec::new();
        if let Some(r) = range_key {
            order.push(r);
        }
        order.extend(model.key_names());
        let mut seen = HashSet::new();
        key_names.retain(|n| seen.insert(*n));
        Ok(paginate(
            matching,
            &order,
            request.descending,
            request.cursor.as_ref(),
            request.limit,
            &key_names,
        ))
    }

    async fn scan(&self, model: &ModelIdentity, request: ScanRequest) -> Result<ResultPage, StoreError> {
        let items = self.read_table(&model.table_name)?;
        let key_names = model.key_names();
        Ok(paginate(items, &key_names, false, request.cursor.as_ref(), request.limit, &key_names))
    }

    async fn save(&self, model: &ModelIdentity, item: Item) -> Result<(), StoreError> {
        let key = require_key(model, &item)?;
        let mut guard = self.tables.write().map_err(|_| lock_error())?;
        let table = guard.entry(model.table_name.clone()).or_default();
        table.retain(|existing| !matches_key(existing, &key));
        table.push(item);
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn update(&self, model: &ModelIdentity, key: Item, actions: Vec<SetAction>) -> Result<Item, StoreError> {
        let key = require_key(model, &key)?;
        if let Some(action) = actions.iter().find(|a| key.contains_key(&a.attribute)) {
            return Err(StoreError::Backend(format!(
                "cannot update key attribute '{}'",
                action.attribute
            )));
        }
        let mut guard = self.tables.write().map_err(|_| lock_error())?;
        let table = guard.entry(model.table_name.clone()).or_default();
        let pos = match table.iter().position(|existing| matches_key(existing, &key)) {
            Some(pos) => pos,
            None => {
                table.push(key.clone());
                table.len() - 1
            }
        };
        let item = &mut table[pos];
        for action in actions {
            match action.value {
                AttributeValue::Null(_) => {
                    item.remove(&action.attribute);
                }
                value => {
                    item.insert(action.attribute, value);
                }
            }
        }
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(item.clone())
    }

    async fn delete(&self, model: &ModelIdentity, key: Item) -> Result<(), StoreError> {
        let key = require_key(model, &key)?;
        let mut guard = self.tables.write().map_err(|_| lock_error())?;
        if let Some(table) = guard.get_mut(&model.table_name) {
            table.retain(|existing| !matches_key(existing, &key));
        }
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}
