//! Typed inbound event shapes.
//!
//! Header and query maps are kept as JSON maps so the event's own key order
//! survives until normalization folds header case.

use serde::Deserialize;
use serde_json::{Map, Value};

/// REST-style gateway event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV1Event {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub multi_value_headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub query_string_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub request_context: Option<GatewayV1Context>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV1Context {
    #[serde(default)]
    pub identity: Option<GatewayV1Identity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV1Identity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

/// HTTP-style gateway event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV2Event {
    pub raw_path: String,
    #[serde(default)]
    pub raw_query_string: Option<String>,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub query_string_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    pub request_context: GatewayV2Context,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV2Context {
    pub http: GatewayV2Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayV2Http {
    pub method: String,
    #[serde(default)]
    pub source_ip: Option<String>,
}

/// CDN edge request record, unwrapped from `Records[0].cf.request`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequestEvent {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub body: Option<EdgeRequestBody>,
}

/// Edge header entry: `{"key": "Host", "value": "example.com"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeHeader {
    #[serde(default)]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequestBody {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub input_truncated: bool,
}

/// Keep-alive ping sent by a scheduler.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmerEvent {
    /// Absent when the ping was flagged by header only.
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub warmer_id: Option<String>,
}
