//! Tests for Event and EventBuilder

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Event, Headers};

#[test]
fn test_new_has_no_headers() {
    let event = Event::new("hello");
    assert!(event.headers().is_empty());
    assert_eq!(event.body().as_ref(), b"hello");
    assert_eq!(event.body_len(), 5);
}

#[test]
fn test_with_body_keeps_headers() {
    let mut headers = Headers::new();
    headers.insert("host".into(), "web-1".into());

    let event = Event::with_body(b"payload".to_vec(), headers);
    assert_eq!(event.header("host"), Some("web-1"));
    assert_eq!(event.header("missing"), None);
}

#[test]
fn test_builder_replaces_duplicate_header() {
    let event = Event::builder()
        .header("type", "info")
        .header("type", "error")
        .body(Bytes::from_static(b"x"))
        .build();

    assert_eq!(event.headers().len(), 1);
    assert_eq!(event.header("type"), Some("error"));
}

#[test]
fn test_builder_headers_from_iter() {
    let event = Event::builder()
        .headers([("a", "1"), ("b", "2")])
        .body("body")
        .build();

    let expected: HashMap<String, String> =
        [("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
            .into_iter()
            .collect();
    assert_eq!(event.headers(), &expected);
}

#[test]
fn test_clone_shares_body() {
    let event = Event::new(vec![0u8; 1024]);
    let copy = event.clone();

    assert_eq!(event, copy);
    assert_eq!(event.body().as_ptr(), copy.body().as_ptr());
}

#[test]
fn test_into_parts() {
    let event = Event::builder().header("k", "v").body("b").build();
    let (headers, body) = event.into_parts();
    assert_eq!(headers.get("k").map(String::as_str), Some("v"));
    assert_eq!(body, Bytes::from_static(b"b"));
}

#[test]
fn test_debug_omits_body() {
    let event = Event::new("secret");
    let debug = format!("{:?}", event);
    assert!(debug.contains("body_len: 6"));
    assert!(!debug.contains("secret"));
}
