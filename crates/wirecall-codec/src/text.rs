//! Hand-mapped JSON shape of the wire records.
//!
//! The text format is mapped explicitly instead of derived so the
//! `numeric_text` handshake flag can choose how 64-bit integers are spelled:
//! native JSON numbers, or decimal strings for decoders that lose precision
//! past 2^53. The decoder accepts both spellings regardless of the flag.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value as Json};

use wirecall_proto::{
    Failure, FailureKind, RequestEnvelope, ResponseEnvelope, Session, Status, Value,
};

use crate::error::{CodecError, Result};

pub fn value_to_json(value: &Value, numeric: bool) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => json!({ "bool": b }),
        Value::Int(n) => json!({ "int": int_repr(*n, numeric) }),
        Value::Float(f) => json!({ "float": f }),
        Value::Str(s) => json!({ "str": s }),
        Value::Bytes(bytes) => json!({ "bytes": bytes }),
        Value::Timestamp(ms) => json!({ "ts": int_repr(*ms, numeric) }),
        Value::List(items) => {
            let items: Vec<Json> = items.iter().map(|v| value_to_json(v, numeric)).collect();
            json!({ "list": items })
        }
        Value::Map(entries) => {
            let mut obj = Map::new();
            for (key, val) in entries {
                obj.insert(key.clone(), value_to_json(val, numeric));
            }
            json!({ "map": obj })
        }
    }
}

pub fn value_from_json(json: &Json) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    let obj = json
        .as_object()
        .ok_or_else(|| shape("value must be null or a single-key object"))?;
    if obj.len() != 1 {
        return Err(shape("value object must carry exactly one tag"));
    }
    let (tag, body) = obj.iter().next().ok_or_else(|| shape("empty value tag"))?;

    match tag.as_str() {
        "bool" => body
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| shape("bool tag expects a boolean")),
        "int" => parse_i64(body).map(Value::Int),
        "ts" => parse_i64(body).map(Value::Timestamp),
        "float" => body
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| shape("float tag expects a number")),
        "str" => body
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| shape("str tag expects a string")),
        "bytes" => {
            let items = body
                .as_array()
                .ok_or_else(|| shape("bytes tag expects an array"))?;
            let mut bytes = Vec::with_capacity(items.len());
            for item in items {
                let byte = item
                    .as_u64()
                    .filter(|b| *b <= u64::from(u8::MAX))
                    .ok_or_else(|| shape("bytes entries must be 0..=255"))?;
                bytes.push(byte as u8);
            }
            Ok(Value::Bytes(bytes))
        }
        "list" => {
            let items = body
                .as_array()
                .ok_or_else(|| shape("list tag expects an array"))?;
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                list.push(value_from_json(item)?);
            }
            Ok(Value::List(list))
        }
        "map" => {
            let entries = body
                .as_object()
                .ok_or_else(|| shape("map tag expects an object"))?;
            let mut map = BTreeMap::new();
            for (key, val) in entries {
                map.insert(key.clone(), value_from_json(val)?);
            }
            Ok(Value::Map(map))
        }
        other => Err(shape(&format!("unknown value tag '{other}'"))),
    }
}

pub fn request_to_json(request: &RequestEnvelope, numeric: bool) -> Json {
    let arguments: Vec<Json> = request
        .arguments
        .iter()
        .map(|v| value_to_json(v, numeric))
        .collect();
    json!({
        "method": request.method_identity,
        "session": session_to_json(&request.session),
        "arguments": arguments,
    })
}

pub fn request_from_json(json: &Json) -> Result<RequestEnvelope> {
    let obj = json
        .as_object()
        .ok_or_else(|| shape("request must be an object"))?;

    let method = str_field(obj, "method")?;
    let session = session_from_json(
        obj.get("session")
            .ok_or_else(|| shape("request missing 'session'"))?,
    )?;

    let arguments = match obj.get("arguments") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => {
            let mut args = Vec::with_capacity(items.len());
            for item in items {
                args.push(value_from_json(item)?);
            }
            args
        }
        Some(_) => return Err(shape("'arguments' must be an array")),
    };

    Ok(RequestEnvelope {
        method_identity: method,
        session,
        arguments,
    })
}

pub fn response_to_json(response: &ResponseEnvelope, numeric: bool) -> Json {
    let mut obj = Map::new();
    let status = match response.status {
        Status::Ok => "ok",
        Status::Error => "error",
    };
    obj.insert("status".to_string(), json!(status));
    if let Some(result) = &response.result {
        obj.insert("result".to_string(), value_to_json(result, numeric));
    }
    if let Some(failure) = &response.error {
        obj.insert("error".to_string(), failure_to_json(failure));
    }
    Json::Object(obj)
}

pub fn response_from_json(json: &Json) -> Result<ResponseEnvelope> {
    let obj = json
        .as_object()
        .ok_or_else(|| shape("response must be an object"))?;

    let status = match str_field(obj, "status")?.as_str() {
        "ok" => Status::Ok,
        "error" => Status::Error,
        other => return Err(shape(&format!("unknown status '{other}'"))),
    };

    let result = match obj.get("result") {
        None => None,
        Some(value) => Some(value_from_json(value)?),
    };
    let error = match obj.get("error") {
        None => None,
        Some(value) => Some(failure_from_json(value)?),
    };

    Ok(ResponseEnvelope {
        status,
        result,
        error,
    })
}

fn session_to_json(session: &Session) -> Json {
    json!({
        "username": session.username,
        "session_id": session.session_id,
        "client_app": session.client_app,
    })
}

fn session_from_json(json: &Json) -> Result<Session> {
    let obj = json
        .as_object()
        .ok_or_else(|| shape("session must be an object"))?;
    Ok(Session {
        username: str_field(obj, "username")?,
        session_id: str_field(obj, "session_id")?,
        client_app: str_field(obj, "client_app")?,
    })
}

fn failure_to_json(failure: &Failure) -> Json {
    let mut obj = Map::new();
    obj.insert("kind".to_string(), json!(kind_tag(failure.kind)));
    obj.insert("message".to_string(), json!(failure.message));
    if let Some(detail) = &failure.detail {
        obj.insert("detail".to_string(), json!(detail));
    }
    Json::Object(obj)
}

fn failure_from_json(json: &Json) -> Result<Failure> {
    let obj = json
        .as_object()
        .ok_or_else(|| shape("failure must be an object"))?;
    let kind = kind_from_tag(&str_field(obj, "kind")?)?;
    let message = str_field(obj, "message")?;
    let detail = match obj.get("detail") {
        None | Some(Json::Null) => None,
        Some(Json::String(s)) => Some(s.clone()),
        Some(_) => return Err(shape("'detail' must be a string")),
    };
    Ok(Failure {
        kind,
        message,
        detail,
    })
}

fn kind_tag(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NullRequest => "null_request",
        FailureKind::MethodNotFound => "method_not_found",
        FailureKind::ArityMismatch => "arity_mismatch",
        FailureKind::SessionRejected => "session_rejected",
        FailureKind::RemoteInvocation => "remote_invocation",
    }
}

fn kind_from_tag(tag: &str) -> Result<FailureKind> {
    match tag {
        "null_request" => Ok(FailureKind::NullRequest),
        "method_not_found" => Ok(FailureKind::MethodNotFound),
        "arity_mismatch" => Ok(FailureKind::ArityMismatch),
        "session_rejected" => Ok(FailureKind::SessionRejected),
        "remote_invocation" => Ok(FailureKind::RemoteInvocation),
        other => Err(shape(&format!("unknown failure kind '{other}'"))),
    }
}

fn int_repr(n: i64, numeric: bool) -> Json {
    if numeric {
        json!(n)
    } else {
        json!(n.to_string())
    }
}

fn parse_i64(json: &Json) -> Result<i64> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .ok_or_else(|| shape("integer out of i64 range")),
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|_| shape(&format!("'{s}' is not a valid integer"))),
        _ => Err(shape("integer tag expects a number or string")),
    }
}

fn str_field(obj: &Map<String, Json>, key: &str) -> Result<String> {
    obj.get(key)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| shape(&format!("missing or non-string field '{key}'")))
}

fn shape(message: &str) -> CodecError {
    CodecError::TextShape(message.to_string())
}
