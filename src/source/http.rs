//! HTTP implementation of [`PageSource`]
//!
//! Pagination travels as query parameters (`skip`/`take` by default). The id
//! and modification filters are encoded according to the entity's
//! [`FilterStyle`]: either more query parameters, or a JSON body of query
//! conditions for APIs that expose a search endpoint.

use super::types::{Page, PageSource, RequestDescription};
use crate::config::{ConnectorConfig, EntityConfig, FilterStyle, RunConfig};
use crate::error::{Error, Result};
use crate::fetch::FetchWindow;
use crate::http::{HttpClient, RequestConfig};
use crate::types::{JsonValue, Method, RawRecord};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

/// Page source backed by an HTTP API
#[derive(Debug)]
pub struct HttpPageSource {
    client: HttpClient,
    entities: HashMap<String, EntityConfig>,
}

impl HttpPageSource {
    /// Create a source serving the given entities
    pub fn new(client: HttpClient, entities: impl IntoIterator<Item = EntityConfig>) -> Self {
        Self {
            client,
            entities: entities
                .into_iter()
                .map(|e| (e.name.clone(), e))
                .collect(),
        }
    }

    /// Build a source from a connector definition and run configuration
    pub fn from_config(config: &ConnectorConfig, run: &RunConfig) -> Result<Self> {
        let client_config = config.http.to_client_config(&config.base_url, &run.headers);
        let client = HttpClient::with_config(client_config)?;
        Ok(Self::new(client, config.entities.iter().cloned()))
    }

    fn entity(&self, name: &str) -> Result<&EntityConfig> {
        self.entities.get(name).ok_or_else(|| Error::EntityNotFound {
            entity: name.to_string(),
        })
    }

    /// Build the request for a window
    fn build_request(&self, entity: &EntityConfig, window: &FetchWindow) -> RequestConfig {
        let mut request = RequestConfig::new()
            .query(&entity.skip_param, window.skip.to_string())
            .query(&entity.take_param, window.take.to_string());

        match &entity.filter {
            FilterStyle::QueryParams {
                id_param,
                modified_since_param,
                modified_until_param,
            } => {
                if let Some(id) = window.id_cursor {
                    request = request.query(id_param, id.to_string());
                }
                if let Some(since) = &window.modified_since {
                    request = request.query(modified_since_param, since);
                }
                if let Some(until) = &window.modified_until {
                    request = request.query(modified_until_param, until);
                }
            }
            FilterStyle::Conditions {
                sort_by,
                id_parameter,
                modified_parameter,
            } => {
                request = request.json(conditions_body(
                    sort_by.as_deref().unwrap_or(id_parameter),
                    id_parameter,
                    modified_parameter,
                    window,
                ));
            }
        }

        request
    }
}

/// Query-condition body understood by search-style endpoints
fn conditions_body(
    sort_by: &str,
    id_parameter: &str,
    modified_parameter: &str,
    window: &FetchWindow,
) -> JsonValue {
    let mut conditions = Vec::new();

    if let Some(id) = window.id_cursor {
        conditions.push(json!({
            "parameter": id_parameter,
            "operator": "GreaterThan",
            "value": id.to_string(),
        }));
    }
    if let Some(since) = &window.modified_since {
        conditions.push(json!({
            "parameter": modified_parameter,
            "operator": "OnOrAfter",
            "value": since,
        }));
    }
    if let Some(until) = &window.modified_until {
        conditions.push(json!({
            "parameter": modified_parameter,
            "operator": "OnOrBefore",
            "value": until,
        }));
    }

    let mut body = json!({
        "sortBy": sort_by,
        "descending": false,
    });
    if !conditions.is_empty() {
        body["groups"] = json!([{ "conditions": conditions }]);
    }
    body
}

/// Pull the record array out of a response body
///
/// With no explicit path, a bare array or a `{"list": [...]}` envelope is
/// accepted. A `null` list is an empty page. A missing or non-array list is
/// fatal; a single non-object item is retryable so shrinking can isolate it.
pub(crate) fn extract_records(body: &JsonValue, records_path: Option<&str>) -> Result<Vec<RawRecord>> {
    let path = records_path.unwrap_or("list");
    let located = match (records_path, body) {
        (None, JsonValue::Array(_)) => Some(body),
        _ => path.split('.').try_fold(body, |current, part| current.get(part)),
    };

    let items = match located {
        Some(JsonValue::Array(items)) => items,
        Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(other) => {
            return Err(Error::RecordExtraction {
                path: path.to_string(),
                message: format!("expected an array, found {}", json_type(other)),
            })
        }
        None => {
            return Err(Error::RecordExtraction {
                path: path.to_string(),
                message: "path not present in response".to_string(),
            })
        }
    };

    items
        .iter()
        .cloned()
        .map(|item| {
            let kind = json_type(&item);
            RawRecord::from_value(item).ok_or_else(|| Error::MalformedRecord {
                message: format!("expected records under '{path}' to be objects, found {kind}"),
            })
        })
        .collect()
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Read an explicit "more" flag, if the API sends one
fn more_flag(body: &JsonValue) -> Option<bool> {
    ["more", "hasMore", "has_more"]
        .iter()
        .find_map(|key| body.get(*key).and_then(JsonValue::as_bool))
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn query_page(&self, window: &FetchWindow) -> Result<Page> {
        let entity = self.entity(&window.entity_type)?;
        let request = self.build_request(entity, window);

        debug!(
            "Querying {}: skip={}, take={}, id_cursor={:?}",
            entity.name, window.skip, window.take, window.id_cursor
        );

        let body: JsonValue = self
            .client
            .request_json(entity.method.into(), &entity.path, &request)
            .await?;

        let records = extract_records(&body, entity.records_path.as_deref())?;
        let more = more_flag(&body).unwrap_or(records.len() as u64 >= window.take);

        Ok(Page::new(records, more))
    }

    fn describe(&self, window: &FetchWindow) -> RequestDescription {
        let Ok(entity) = self.entity(&window.entity_type) else {
            return RequestDescription {
                url: window.entity_type.clone(),
                body: None,
            };
        };

        let request = self.build_request(entity, window);
        let mut url = self.client.build_url(&entity.path);
        if let Ok(mut parsed) = url::Url::parse(&url) {
            parsed.query_pairs_mut().extend_pairs(&request.query);
            url = parsed.to_string();
        }

        RequestDescription {
            url,
            body: match entity.method {
                Method::POST => request.body,
                Method::GET => None,
            },
        }
    }
}
