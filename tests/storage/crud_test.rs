//! Storage CRUD operation tests

use crate::common::*;

#[test]
fn test_round_trip_nested_document() {
    let store = test_store();
    let doc = connection("Alice", "https://a.example.com");

    store.set("/connections/:1", &bytes(&doc)).unwrap();

    assert_document(&store, "/connections/:1", &doc);
}

#[test]
fn test_round_trip_scalars_and_empty_containers() {
    let store = test_store();
    let doc = json!({
        "null": null,
        "yes": true,
        "no": false,
        "int": 42,
        "neg": -17,
        "float": 3.25,
        "big": 12345678901234u64,
        "text": "hello / world. $100 #1 [x]",
        "emptyObj": {},
        "emptyArr": [],
        "unicode": "héllo ✓"
    });

    store.set("/values", &bytes(&doc)).unwrap();

    assert_document(&store, "/values", &doc);
}

#[test]
fn test_round_trip_keys_with_reserved_characters() {
    let store = test_store();
    let doc = json!({"a.b": 1, "c/d": {"e$f": 2}, "100%": [true], "#[x]": "y"});

    store.set("/weird", &bytes(&doc)).unwrap();

    assert_document(&store, "/weird", &doc);
}

#[test]
fn test_round_trip_arrays() {
    let store = test_store();
    let doc = json!({"list": (0..15).collect::<Vec<u32>>(), "matrix": [[1, 2], [3, [4, 5]]]});

    store.set("/arrays", &bytes(&doc)).unwrap();

    assert_document(&store, "/arrays", &doc);
}

#[test]
fn test_read_single_leaf_and_array_element() {
    let store = test_store();
    store
        .set("/connections/:1", &bytes(&connection("A", "https://a")))
        .unwrap();

    assert_document(
        &store,
        "/connections/:1/configuredProperties/url",
        &json!("https://a"),
    );
    assert_document(&store, "/connections/:1/tags/1", &json!("eu"));
}

#[test]
fn test_write_into_array_element_leaves_gap() {
    let store = test_store();
    store.set("/arr/0", b"\"a\"").unwrap();
    store.set("/arr/3", b"\"d\"").unwrap();

    assert_document(&store, "/arr", &json!(["a", null, null, "d"]));
}

#[test]
fn test_full_replace() {
    let store = test_store();
    store.set("/a", br#"{"x":1,"y":{"z":2}}"#).unwrap();

    store.set("/a", br#"{"w":3}"#).unwrap();

    assert_document(&store, "/a", &json!({"w": 3}));
    assert_absent(&store, "/a/x");
    assert_absent(&store, "/a/y/z");
}

#[test]
fn test_set_does_not_touch_sibling_prefix() {
    let store = test_store();
    store.set("/a/b", b"1").unwrap();
    store.set("/a/bc", b"2").unwrap();

    store.set("/a/b", br#"{"deep":true}"#).unwrap();

    assert_document(&store, "/a", &json!({"b": {"deep": true}, "bc": 2}));
}

#[test]
fn test_update_merges_and_preserves_other_leaves() {
    let store = test_store();
    store
        .set("/users/u1000", br#"{"name":"Alice","age":30}"#)
        .unwrap();

    store.update("/users/u1000", br#"{"age":31}"#).unwrap();

    assert_document(&store, "/users/u1000", &json!({"name": "Alice", "age": 31}));
}

#[test]
fn test_update_deep_merge() {
    let store = test_store();
    store
        .set("/connections/:1", &bytes(&connection("A", "https://a")))
        .unwrap();

    store
        .update(
            "/connections/:1",
            br#"{"configuredProperties":{"url":"https://b","retries":3},"tags":["dev"]}"#,
        )
        .unwrap();

    assert_document(
        &store,
        "/connections/:1",
        &json!({
            "name": "A",
            "connectorId": "http",
            "configuredProperties": {"url": "https://b", "timeout": 30, "retries": 3},
            "tags": ["dev"]
        }),
    );
}

#[test]
fn test_update_absent_document_is_not_found() {
    let store = test_store();

    let err = store.update("/users/nobody", br#"{"a":1}"#).unwrap_err();

    assert_eq!(err.error_code(), "NOT_FOUND");
    assert_absent(&store, "/users/nobody");
}

#[test]
fn test_update_non_object_is_invalid_json() {
    let store = test_store();
    store.set("/a", br#"{"x":1}"#).unwrap();

    for payload in [&b"1"[..], b"\"s\"", b"[1]", b"null"] {
        let err = store.update("/a", payload).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }
    assert_document(&store, "/a", &json!({"x": 1}));
}

#[test]
fn test_create_only_when_absent() {
    let store = test_store();

    store.create("/c/:1", br#"{"v":1}"#).unwrap();
    let err = store.create("/c/:1", br#"{"v":2}"#).unwrap_err();

    assert_eq!(err.error_code(), "CONFLICT");
    assert!(!err.is_retryable());
    assert_document(&store, "/c/:1", &json!({"v": 1}));
}

#[test]
fn test_push_keys_are_ordered_children() {
    let store = test_store();

    let keys: Vec<String> = (0..5)
        .map(|i| store.push("/events", &bytes(&json!({"n": i}))).unwrap())
        .collect();

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    assert_keys(&store, "/events", &GetOptions::default(), &key_refs);
    assert_document(&store, &format!("/events/{}", keys[2]), &json!({"n": 2}));
}

#[test]
fn test_delete_removes_subtree_only() {
    let store = test_store();
    store.set("/a", br#"{"b":{"c":1},"bc":2,"d":3}"#).unwrap();

    assert!(store.delete("/a/b").unwrap());

    assert_absent(&store, "/a/b");
    assert_absent(&store, "/a/b/c");
    assert_document(&store, "/a", &json!({"bc": 2, "d": 3}));
}

#[test]
fn test_delete_absent_returns_false() {
    let store = test_store();

    assert!(!store.delete("/nothing/here").unwrap());
}

#[test]
fn test_delete_then_get_is_none() {
    let store = test_store();
    store.set("/x", b"1").unwrap();

    store.delete("/x").unwrap();

    assert_absent(&store, "/x");
}

#[test]
fn test_invalid_paths_rejected() {
    let store = test_store();

    for path in ["/a//b", "/a/b.c", "/a/$x", "/a/[0]"] {
        let err = store.set(path, b"1").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PATH", "path {path}");
    }
}

#[test]
fn test_root_document() {
    let store = test_store();
    store.set("/a", b"1").unwrap();
    store.set("/b", br#"{"c":2}"#).unwrap();

    assert_document(&store, "/", &json!({"a": 1, "b": {"c": 2}}));
    assert!(store.delete("/").unwrap());
    assert!(read_json(&store, "/", &GetOptions::default()).is_none());
}

#[test]
fn test_number_text_round_trips_exactly() {
    let store = test_store();
    let text = r#"{"big":12345678901234567890123,"e":2E+3,"f":1.10,"neg":-0.50}"#;

    store.set("/n", text.as_bytes()).unwrap();

    assert_eq!(
        store.get_as_string("/n", &GetOptions::default()).unwrap().as_deref(),
        Some(text)
    );
    assert_eq!(
        store.get_as_string("/n/big", &GetOptions::default()).unwrap().as_deref(),
        Some("12345678901234567890123")
    );
}

#[test]
fn test_update_object_member_over_array() {
    let store = test_store();
    store.set("/d", br#"{"tags":["a","b"]}"#).unwrap();

    store.update("/d", br#"{"tags":{"x":1}}"#).unwrap();

    assert_document(&store, "/d", &json!({"tags": {"x": 1}}));
    assert_eq!(store.stats().unwrap().row_count, 1);
}

#[test]
fn test_set_key_inside_array() {
    let store = test_store();
    store.set("/d", br#"{"tags":["a","b"]}"#).unwrap();

    store.set("/d/tags/x", b"1").unwrap();

    assert_document(&store, "/d", &json!({"tags": {"x": 1}}));
}

#[test]
fn test_update_numeric_member_names_address_elements() {
    let store = test_store();
    store.set("/arr", br#"["a","b"]"#).unwrap();

    store.update("/arr", br#"{"0":"z"}"#).unwrap();

    assert_document(&store, "/arr", &json!(["z", "b"]));
}
