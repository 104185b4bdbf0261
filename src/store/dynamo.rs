//! DynamoDB-backed store (aws-sdk-dynamodb).

use crate::error::StoreError;
use crate::schema::{AttributeValue, Item, ModelIdentity};
use crate::service::PaginationCursor;
use crate::store::{QueryRequest, RecordStore, ResultPage, ScanRequest, SetAction};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue as DynamoValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;

type DynamoItem = HashMap<String, DynamoValue>;

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        DynamoStore { client }
    }

    /// Client from the default AWS config chain; `endpoint_url` targets DynamoDB Local and the like.
    pub async fn from_env(endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        DynamoStore::new(Client::new(&config))
    }
}

fn backend<E: std::error::Error>(e: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(e).to_string())
}

fn to_dynamo(value: &AttributeValue) -> DynamoValue {
    match value {
        AttributeValue::S(s) => DynamoValue::S(s.clone()),
        AttributeValue::N(n) => DynamoValue::N(n.clone()),
        AttributeValue::Bool(b) => DynamoValue::Bool(*b),
        AttributeValue::Null(b) => DynamoValue::Null(*b),
        AttributeValue::M(m) => DynamoValue::M(m.iter().map(|(k, v)| (k.clone(), to_dynamo(v))).collect()),
        AttributeValue::L(l) => DynamoValue::L(l.iter().map(to_dynamo).collect()),
    }
}

fn from_dynamo(value: &DynamoValue) -> AttributeValue {
    match value {
        DynamoValue::S(s) => AttributeValue::S(s.clone()),
        DynamoValue::N(n) => AttributeValue::N(n.clone()),
        DynamoValue::Bool(b) => AttributeValue::Bool(*b),
        DynamoValue::Null(b) => AttributeValue::Null(*b),
        DynamoValue::M(m) => AttributeValue::M(m.iter().map(|(k, v)| (k.clone(), from_dynamo(v))).collect()),
        DynamoValue::L(l) => AttributeValue::L(l.iter().map(from_dynamo).collect()),
        DynamoValue::Ss(ss) => AttributeValue::L(ss.iter().cloned().map(AttributeValue::S).collect()),
        DynamoValue::Ns(ns) => AttributeValue::L(ns.iter().cloned().map(AttributeValue::N).collect()),
        DynamoValue::B(b) => AttributeValue::S(STANDARD.encode(b.as_ref())),
        DynamoValue::Bs(bs) => AttributeValue::L(bs.iter().map(|b| AttributeValue::S(STANDARD.encode(b.as_ref()))).collect()),
        _ => AttributeValue::Null(true),
    }
}

fn to_dynamo_item(item: &Item) -> DynamoItem {
    item.iter().map(|(k, v)| (k.clone(), to_dynamo(v))).collect()
}

fn from_dynamo_item(item: &DynamoItem) -> Item {
    item.iter().map(|(k, v)| (k.clone(), from_dynamo(v))).collect()
}

fn limit_i32(limit: Option<usize>) -> Option<i32> {
    limit.map(|l| l.min(i32::MAX as usize) as i32)
}

fn page(items: &[DynamoItem], last_key: Option<&DynamoItem>) -> ResultPage {
    ResultPage {
        items: items.iter().map(from_dynamo_item).collect(),
        last_evaluated_key: last_key.map(|k| PaginationCursor(from_dynamo_item(k))),
    }
}

/// `SET #a0 = :v0, #a1 = :v1 REMOVE #a2` with placeholder names, so reserved words are safe.
fn update_expression(actions: &[SetAction]) -> (String, HashMap<String, String>, HashMap<String, DynamoValue>) {
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    for (i, action) in actions.iter().enumerate() {
        let name = format!("#a{}", i);
        names.insert(name.clone(), action.attribute.clone());
        match &action.value {
            AttributeValue::Null(_) => removes.push(name),
            value => {
                let placeholder = format!(":v{}", i);
                sets.push(format!("{} = {}", name, placeholder));
                values.insert(placeholder, to_dynamo(value));
            }
        }
    }
    let mut expr = String::new();
    if !sets.is_empty() {
        expr.push_str("SET ");
        expr.push_str(&sets.join(", "));
    }
    if !removes.is_empty() {
        if !expr.is_empty() {
            expr.push(' ');
        }
        expr.push_str("REMOVE ");
        expr.push_str(&removes.join(", "));
    }
    (expr, names, values)
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn query(&self, model: &ModelIdentity, request: QueryRequest) -> Result<ResultPage, StoreError> {
        let hash_key = match &request.index_name {
            Some(name) => model
                .index_named(name)
                .map(|i| i.hash_key.clone())
                .ok_or_else(|| StoreError::Backend(format!("index not found: {}", name)))?,
            None => model.hash_key.clone(),
        };
        tracing::debug!(table = %model.table_name, index = ?request.index_name, limit = ?request.limit, "dynamodb query");
        let output = self
            .client
            .query()
            .table_name(&model.table_name)
            .set_index_name(request.index_name.clone())
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", hash_key)
            .expression_attribute_values(":pk", to_dynamo(&request.hash_value))
            .set_exclusive_start_key(request.cursor.as_ref().map(|c| to_dynamo_item(&c.0)))
            .set_limit(limit_i32(request.limit))
            .scan_index_forward(!request.descending)
            .send()
            .await
            .map_err(backend)?;
        Ok(page(output.items(), output.last_evaluated_key()))
    }

    async fn scan(&self, model: &ModelIdentity, request: ScanRequest) -> Result<ResultPage, StoreError> {
        tracing::debug!(table = %model.table_name, limit = ?request.limit, "dynamodb scan");
        let output = self
            .client
            .scan()
            .table_name(&model.table_name)
            .set_exclusive_start_key(request.cursor.as_ref().map(|c| to_dynamo_item(&c.0)))
            .set_limit(limit_i32(request.limit))
            .send()
            .await
            .map_err(backend)?;
        Ok(page(output.items(), output.last_evaluated_key()))
    }

    async fn save(&self, model: &ModelIdentity, item: Item) -> Result<(), StoreError> {
        for name in model.key_names() {
            if !item.contains_key(name) {
                return Err(StoreError::MissingKey(name.to_string()));
            }
        }
        tracing::debug!(table = %model.table_name, "dynamodb put_item");
        self.client
            .put_item()
            .table_name(&model.table_name)
            .set_item(Some(to_dynamo_item(&item)))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn update(&self, model: &ModelIdentity, key: Item, actions: Vec<SetAction>) -> Result<Item, StoreError> {
        let (expr, names, values) = update_expression(&actions);
        tracing::debug!(table = %model.table_name, expr = %expr, "dynamodb update_item");
        let output = self
            .client
            .update_item()
            .table_name(&model.table_name)
            .set_key(Some(to_dynamo_item(&key)))
            .update_expression(expr)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(if values.is_empty() { None } else { Some(values) })
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(backend)?;
        Ok(output.attributes().map(from_dynamo_item).unwrap_or(key))
    }

    async fn delete(&self, model: &ModelIdentity, key: Item) -> Result<(), StoreError> {
        tracing::debug!(table = %model.table_name, "dynamodb delete_item");
        self.client
            .delete_item()
            .table_name(&model.table_name)
            .set_key(Some(to_dynamo_item(&key)))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client.list_tables().limit(1).send().await.map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_expression_uses_placeholders() {
        let actions = vec![
            SetAction::new("name", AttributeValue::S("x".into())),
            SetAction::new("count", AttributeValue::N("2".into())),
            SetAction::new("old", AttributeValue::Null(true)),
        ];
        let (expr, names, values) = update_expression(&actions);
        assert_eq!(expr, "SET #a0 = :v0, #a1 = :v1 REMOVE #a2");
        assert_eq!(names.get("#a0").map(String::as_str), Some("name"));
        assert_eq!(names.get("#a2").map(String::as_str), Some("old"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_attribute_conversion_round_trip() {
        let mut nested = Item::new();
        nested.insert("k".into(), AttributeValue::L(vec![AttributeValue::N("1".into()), AttributeValue::Bool(false)]));
        let v = AttributeValue::M(nested);
        assert_eq!(from_dynamo(&to_dynamo(&v)), v);
    }

    #[test]
    fn test_string_sets_become_lists() {
        let v = DynamoValue::Ss(vec!["a".into(), "b".into()]);
        assert_eq!(
            from_dynamo(&v),
            AttributeValue::L(vec![AttributeValue::S("a".into()), AttributeValue::S("b".into())])
        );
    }
}
