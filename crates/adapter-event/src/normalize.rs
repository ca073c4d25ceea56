//! Event shape detection and normalization.

use adapter_core::{EventSource, Headers, InternalEvent, QueryParams};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::shapes::{EdgeHeader, EdgeRequestEvent, GatewayV1Event, GatewayV2Event, WarmerEvent};

/// Header flagging a warmer ping on an otherwise ordinary request.
pub const WARMER_HEADER: &str = "warmer";

/// Error type for event normalization. Always fatal for the invocation.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("event is not a JSON object")]
    NotAnObject,

    #[error("unrecognised event shape")]
    UnknownShape,

    #[error("malformed {shape} event: {message}")]
    Malformed { shape: &'static str, message: String },

    #[error("invalid base64 body: {0}")]
    InvalidBody(#[from] base64::DecodeError),
}

impl NormalizeError {
    fn malformed(shape: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            shape,
            message: message.into(),
        }
    }
}

/// Closed set of inbound event shapes.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    GatewayV1(GatewayV1Event),
    GatewayV2(GatewayV2Event),
    EdgeRequest(EdgeRequestEvent),
    Warmer(WarmerEvent),
}

/// Outcome of normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Keep-alive ping; answer `200 OK` and do nothing else.
    Warmer,
    /// A request for the framework or the image service.
    Request(InternalEvent),
}

impl InboundEvent {
    /// Detect the event shape by structural inspection.
    ///
    /// Detection order: warmer (`type` field or `warmer: true` header), edge request
    /// (`Records[0].cf.request`), gateway v2 (`requestContext.http` or
    /// `rawPath`), gateway v1 (`httpMethod`).
    pub fn detect(value: Value) -> Result<Self, NormalizeError> {
        let obj = value.as_object().ok_or(NormalizeError::NotAnObject)?;

        if obj.contains_key("type") || has_warmer_header(&value) {
            return parse("warmer", value).map(Self::Warmer);
        }
        if let Some(request) = value.pointer("/Records/0/cf/request") {
            return parse("edge-request", request.clone()).map(Self::EdgeRequest);
        }
        if value.pointer("/requestContext/http").is_some() || obj.contains_key("rawPath") {
            return parse("gateway-v2", value).map(Self::GatewayV2);
        }
        if obj.contains_key("httpMethod") {
            return parse("gateway-v1", value).map(Self::GatewayV1);
        }

        Err(NormalizeError::UnknownShape)
    }

    /// Get the name of the detected shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GatewayV1(_) => EventSource::GatewayV1.name(),
            Self::GatewayV2(_) => EventSource::GatewayV2.name(),
            Self::EdgeRequest(_) => EventSource::EdgeRequest.name(),
            Self::Warmer(_) => "warmer",
        }
    }

    /// Convert into the canonical request.
    pub fn into_normalized(self) -> Result<Normalized, NormalizeError> {
        let mut event = match self {
            Self::Warmer(warmer) => {
                debug!(warmer_id = ?warmer.warmer_id, "warmer ping");
                return Ok(Normalized::Warmer);
            }
            Self::GatewayV1(e) => from_gateway_v1(e)?,
            Self::GatewayV2(e) => from_gateway_v2(e)?,
            Self::EdgeRequest(e) => from_edge_request(e)?,
        };

        if event.header(WARMER_HEADER) == Some("true") {
            debug!(source = %event.source, "warmer ping via header");
            return Ok(Normalized::Warmer);
        }

        event.apply_forwarded_host();
        Ok(Normalized::Request(event))
    }
}

/// Detect and normalize a raw event in one step.
pub fn normalize(value: Value) -> Result<Normalized, NormalizeError> {
    InboundEvent::detect(value)?.into_normalized()
}

/// Top-level `headers` carries `warmer: "true"` under any key casing.
fn has_warmer_header(value: &Value) -> bool {
    value
        .get("headers")
        .and_then(Value::as_object)
        .is_some_and(|headers| {
            headers.iter().any(|(name, flag)| {
                name.eq_ignore_ascii_case(WARMER_HEADER) && flag.as_str() == Some("true")
            })
        })
}

fn parse<T: DeserializeOwned>(shape: &'static str, value: Value) -> Result<T, NormalizeError> {
    serde_json::from_value(value).map_err(|e| NormalizeError::malformed(shape, e.to_string()))
}

fn from_gateway_v1(e: GatewayV1Event) -> Result<InternalEvent, NormalizeError> {
    let mut event = InternalEvent::new(EventSource::GatewayV1, e.http_method, e.path);

    let mut headers = Headers::new();
    if let Some(map) = &e.headers {
        for (name, value) in string_entries(map) {
            headers.insert(name, value);
        }
    }
    if let Some(map) = &e.multi_value_headers {
        for (name, values) in multi_entries(map) {
            headers.insert(name, values.join(", "));
        }
    }

    let mut query = QueryParams::new();
    if let Some(map) = &e.query_string_parameters {
        query.extend(string_entries(map).map(|(k, v)| (k.to_string(), v)));
    }
    if let Some(map) = &e.multi_value_query_string_parameters {
        for (name, mut values) in multi_entries(map) {
            if let Some(last) = values.pop() {
                query.insert(name.to_string(), last);
            }
        }
    }

    event.cookies = headers.get("cookie").map(parse_cookie_header).unwrap_or_default();
    event.headers = headers;
    event.query = query;
    event.body = decode_body(e.body, e.is_base64_encoded)?;
    event.remote_address = e
        .request_context
        .and_then(|ctx| ctx.identity)
        .and_then(|identity| identity.source_ip);

    Ok(event)
}

fn from_gateway_v2(e: GatewayV2Event) -> Result<InternalEvent, NormalizeError> {
    let mut event =
        InternalEvent::new(EventSource::GatewayV2, e.request_context.http.method, e.raw_path);

    let mut headers: Headers = e
        .headers
        .as_ref()
        .map(|map| string_entries(map).collect())
        .unwrap_or_default();

    event.query = match (&e.query_string_parameters, e.raw_query_string.as_deref()) {
        (Some(map), _) => string_entries(map).map(|(k, v)| (k.to_string(), v)).collect(),
        (None, Some(raw)) => parse_query(raw),
        (None, None) => QueryParams::new(),
    };

    event.cookies = match e.cookies {
        Some(cookies) => {
            if !headers.contains("cookie") && !cookies.is_empty() {
                headers.insert("cookie", cookies.join("; "));
            }
            cookies
        }
        None => headers.get("cookie").map(parse_cookie_header).unwrap_or_default(),
    };
    event.headers = headers;
    event.body = decode_body(e.body, e.is_base64_encoded)?;
    event.remote_address = e.request_context.http.source_ip;

    Ok(event)
}

fn from_edge_request(e: EdgeRequestEvent) -> Result<InternalEvent, NormalizeError> {
    let mut event = InternalEvent::new(EventSource::EdgeRequest, e.method, e.uri);

    let mut headers = Headers::new();
    for (name, value) in &e.headers {
        let entries: Vec<EdgeHeader> = serde_json::from_value(value.clone()).map_err(|err| {
            NormalizeError::malformed("edge-request", format!("header '{}': {}", name, err))
        })?;
        let separator = if name.eq_ignore_ascii_case("cookie") { "; " } else { ", " };
        let joined: Vec<String> = entries.into_iter().map(|h| h.value).collect();
        headers.insert(name, joined.join(separator));
    }

    event.cookies = headers.get("cookie").map(parse_cookie_header).unwrap_or_default();
    event.headers = headers;
    event.query = parse_query(&e.querystring);
    event.remote_address = e.client_ip;
    event.body = match e.body {
        Some(body) if !body.data.is_empty() => {
            let is_base64 = body.encoding.as_deref() == Some("base64");
            decode_body(Some(body.data), is_base64)?
        }
        _ => None,
    };

    Ok(event)
}

/// String-valued entries of a JSON map; scalars are stringified, nulls skipped.
fn string_entries(map: &Map<String, Value>) -> impl Iterator<Item = (&str, String)> {
    map.iter().filter_map(|(k, v)| {
        let value = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        Some((k.as_str(), value))
    })
}

/// Array-valued entries of a JSON map; non-string elements are skipped.
fn multi_entries(map: &Map<String, Value>) -> Vec<(&str, Vec<String>)> {
    map.iter()
        .filter_map(|(k, v)| {
            let values: Vec<String> = v
                .as_array()?
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            Some((k.as_str(), values))
        })
        .collect()
}

/// Parse a raw query string. Repeated keys keep the last value.
pub fn parse_query(raw: &str) -> QueryParams {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Split a `cookie` header into `name=value` pairs.
pub fn parse_cookie_header(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_body(body: Option<String>, is_base64: bool) -> Result<Option<Vec<u8>>, NormalizeError> {
    match body {
        None => Ok(None),
        Some(data) if is_base64 => Ok(Some(STANDARD.decode(data.as_bytes())?)),
        Some(data) => Ok(Some(data.into_bytes())),
    }
}
