//! Thin transport to the Allegro SOAP services. One shared HTTP client with
//! a single timeout budget; the request-scoped session only passes through
//! here as an optional `ROClientIDHeader`.

use async_trait::async_trait;
use krefia::allegro::{AllegroGateway, Args, GatewayError, Operation, SessionId};
use krefia::config::AllegroConfig;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub(crate) struct SoapGateway {
    http: reqwest::Client,
    config: Arc<AllegroConfig>,
}

impl SoapGateway {
    pub(crate) fn new(config: Arc<AllegroConfig>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("Mijn Amsterdam Krefia API")
            .build()?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl AllegroGateway for SoapGateway {
    async fn call(
        &self,
        operation: Operation,
        session: Option<&SessionId>,
        args: Args,
    ) -> Result<Value, GatewayError> {
        let envelope = build_envelope(operation, session, &args);
        let url = self.config.service_endpoint(operation.service());
        debug!(operation = %operation, "calling Allegro");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("urn:{}#{}", operation.service(), operation.method()))
            .body(envelope)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!("http status {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let document = xml_to_value(&text).map_err(GatewayError::Malformed)?;
        response_body(&document, operation)
            .ok_or_else(|| GatewayError::Malformed("missing response body element".to_string()))
    }
}

fn response_element(operation: Operation) -> String {
    format!("{}___{}Response", operation.service(), operation.method())
}

fn response_body(document: &Value, operation: Operation) -> Option<Value> {
    document
        .pointer(&format!("/Envelope/Body/{}", response_element(operation)))
        .cloned()
}

/// Document-style request envelope. Parameters are positional, matching the
/// operation signatures the aggregator uses.
fn build_envelope(operation: Operation, session: Option<&SessionId>, args: &[Value]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
    );

    if let Some(session) = session {
        xml.push_str("<soap:Header><ROClientIDHeader><ID>");
        xml.push_str(&escape(session.as_str()));
        xml.push_str("</ID></ROClientIDHeader></soap:Header>");
    }

    let request_element = format!("{}___{}", operation.service(), operation.method());
    xml.push_str("<soap:Body>");
    xml.push_str(&format!("<{request_element}>"));
    for (index, arg) in args.iter().enumerate() {
        write_element(&mut xml, &format!("arg{index}"), arg);
    }
    xml.push_str(&format!("</{request_element}>"));
    xml.push_str("</soap:Body></soap:Envelope>");

    xml
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item);
            }
        }
        Value::Object(map) => {
            out.push_str(&format!("<{name}>"));
            for (key, item) in map {
                write_element(out, key, item);
            }
            out.push_str(&format!("</{name}>"));
        }
        Value::Null => out.push_str(&format!("<{name}/>")),
        Value::String(text) => {
            out.push_str(&format!("<{name}>{}</{name}>", escape(text.as_str())))
        }
        other => out.push_str(&format!("<{name}>{other}</{name}>")),
    }
}

/// Decodes a SOAP response document into the nested `Value` shape the
/// extractor works on: one child element per key, repeated sibling tags
/// promoted to arrays, `true`/`false` text to booleans, empty elements to
/// null. Namespace prefixes are dropped.
pub(crate) fn xml_to_value(xml: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Map<String, Value> = Map::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push((tag, Map::new(), String::new()));
            }
            Ok(Event::Empty(start)) => {
                let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                attach(&mut stack, &mut root, tag, Value::Null);
            }
            Ok(Event::Text(text)) => {
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&text.unescape().map_err(|err| err.to_string())?);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let (tag, children, text) = stack
                    .pop()
                    .ok_or_else(|| "unbalanced element close".to_string())?;
                let value = if children.is_empty() {
                    scalar(text)
                } else {
                    Value::Object(children)
                };
                attach(&mut stack, &mut root, tag, value);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.to_string()),
            Ok(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err("unclosed element".to_string());
    }

    Ok(Value::Object(root))
}

fn attach(
    stack: &mut [(String, Map<String, Value>, String)],
    root: &mut Map<String, Value>,
    tag: String,
    value: Value,
) {
    match stack.last_mut() {
        Some((_, children, _)) => insert_child(children, tag, value),
        None => insert_child(root, tag, value),
    }
}

/// A tag seen again under the same parent means the XML encodes a list.
fn insert_child(map: &mut Map<String, Value>, tag: String, value: Value) {
    match map.get_mut(&tag) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            map.insert(tag, Value::Array(vec![first, value]));
        }
        None => {
            map.insert(tag, value);
        }
    }
}

fn scalar(text: String) -> Value {
    match text.as_str() {
        "" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text),
    }
}
