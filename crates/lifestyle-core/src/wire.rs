//! Decoding of server responses.
//!
//! Everything here treats the body as untrusted: missing fields fall back to
//! empty/false/zero, and only a body we cannot use at all becomes an error.
//! Transports hand over the raw status and text; no transport type leaks in.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::api::{EVENTS_ENDPOINT, LIKES_ENDPOINT, RENDERS_ENDPOINT};
use crate::error::CoreError;
use crate::types::{LikeState, Render};

fn check_status(endpoint: &str, status: u16) -> Result<(), CoreError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Status {
            endpoint: endpoint.to_string(),
            status,
        })
    }
}

fn parse(endpoint: &str, body: &str) -> Result<Value, CoreError> {
    serde_json::from_str(body).map_err(|e| CoreError::UnexpectedShape {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Strings pass through; numbers are stringified; anything else is empty.
fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn count_field(obj: &Map<String, Value>, key: &str) -> u64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), Some(Value::Bool(true)))
}

/// Decode `GET /renders`, keeping at most `max` renders.
///
/// Non-object entries and entries without an id are dropped. A 2xx body
/// that is not an array (e.g. `{"error": ...}`) is an error.
pub fn decode_renders(status: u16, body: &str, max: usize) -> Result<Vec<Render>, CoreError> {
    check_status(RENDERS_ENDPOINT, status)?;
    let Value::Array(items) = parse(RENDERS_ENDPOINT, body)? else {
        return Err(CoreError::UnexpectedShape {
            endpoint: RENDERS_ENDPOINT.to_string(),
            message: "expected an array of renders".to_string(),
        });
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| Render {
            id: string_field(obj, "id"),
            image_url: string_field(obj, "image_url"),
            alt_text: string_field(obj, "alt_text"),
        })
        .filter(|r| !r.id.is_empty())
        .take(max)
        .collect())
}

/// Decode `POST /likes` into the authoritative like state.
pub fn decode_toggle(status: u16, body: &str) -> Result<LikeState, CoreError> {
    check_status(LIKES_ENDPOINT, status)?;
    let Value::Object(obj) = parse(LIKES_ENDPOINT, body)? else {
        return Err(CoreError::UnexpectedShape {
            endpoint: LIKES_ENDPOINT.to_string(),
            message: "expected an object".to_string(),
        });
    };
    Ok(LikeState::new(
        bool_field(&obj, "liked"),
        count_field(&obj, "total_likes"),
    ))
}

/// Decode `GET /likes` into a per-render map. Malformed entries are skipped.
pub fn decode_like_states(
    status: u16,
    body: &str,
) -> Result<HashMap<String, LikeState>, CoreError> {
    check_status(LIKES_ENDPOINT, status)?;
    let Value::Object(obj) = parse(LIKES_ENDPOINT, body)? else {
        return Err(CoreError::UnexpectedShape {
            endpoint: LIKES_ENDPOINT.to_string(),
            message: "expected an object keyed by render id".to_string(),
        });
    };
    Ok(obj
        .iter()
        .filter_map(|(id, v)| {
            let entry = v.as_object()?;
            let state = LikeState::new(bool_field(entry, "liked"), count_field(entry, "total"));
            Some((id.clone(), state))
        })
        .collect())
}

/// `POST /events` only needs a 2xx; the body is ignored.
pub fn decode_event_ack(status: u16) -> Result<(), CoreError> {
    check_status(EVENTS_ENDPOINT, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_happy_path() {
        let body = r#"[
            {"id":"render1","image_url":"https://example.com/image1.jpg","alt_text":"Test image 1"},
            {"id":"render2","image_url":"https://example.com/image2.jpg","alt_text":"Test image 2"}
        ]"#;
        let renders = decode_renders(200, body, 2).unwrap();
        assert_eq!(renders.len(), 2);
        assert_eq!(renders[0].id, "render1");
        assert_eq!(renders[0].image_url, "https://example.com/image1.jpg");
    }

    #[test]
    fn renders_truncated_to_max() {
        let body = r#"[{"id":"a"},{"id":"b"},{"id":"c"}]"#;
        let ids: Vec<_> = decode_renders(200, body, 2)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn renders_skip_junk_entries() {
        let body = r#"[42, null, {"alt_text":"no id"}, {"id":7,"image_url":null}]"#;
        let renders = decode_renders(200, body, 2).unwrap();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].id, "7");
        assert_eq!(renders[0].image_url, "");
    }

    #[test]
    fn renders_error_object_with_ok_status_is_unexpected() {
        let err = decode_renders(200, r#"{"error":"API Error"}"#, 2).unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedShape { .. }));
    }

    #[test]
    fn renders_non_success_status() {
        let err = decode_renders(500, r#"{"error":"API Error"}"#, 2).unwrap_err();
        assert!(matches!(err, CoreError::Status { status: 500, .. }));
    }

    #[test]
    fn renders_empty_array() {
        assert!(decode_renders(200, "[]", 2).unwrap().is_empty());
    }

    #[test]
    fn toggle_reads_total_likes() {
        let state = decode_toggle(200, r#"{"liked":true,"total_likes":5}"#).unwrap();
        assert_eq!(state, LikeState::new(true, 5));
    }

    #[test]
    fn toggle_missing_fields_default() {
        let state = decode_toggle(200, "{}").unwrap();
        assert_eq!(state, LikeState::default());
    }

    #[test]
    fn toggle_garbage_is_an_error() {
        assert!(decode_toggle(200, "<html>").is_err());
        assert!(decode_toggle(200, "[]").is_err());
        assert!(decode_toggle(404, r#"{"error":"SKU not found"}"#).is_err());
    }

    #[test]
    fn like_states_tolerate_bad_entries() {
        let body = r#"{"r1":{"liked":true,"total":3},"r2":"nope","r3":{"total":-1}}"#;
        let states = decode_like_states(200, body).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states["r1"], LikeState::new(true, 3));
        assert_eq!(states["r3"], LikeState::new(false, 0));
    }
}
