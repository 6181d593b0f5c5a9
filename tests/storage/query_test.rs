//! Range, depth, ordering and formatting tests

use crate::common::*;
use jsondb::{plan_operators, ListOperator, Order};

fn seeded() -> SqlJsonDb {
    let store = test_store();
    for id in 1..=5 {
        store
            .set(
                &format!("/connections/:{id}"),
                &bytes(&connection(&format!("c{id}"), &format!("https://{id}"))),
            )
            .unwrap();
    }
    store
}

#[test]
fn test_prefix_range_excludes_siblings() {
    let store = test_store();
    store.set("/a/b", br#"{"x":1}"#).unwrap();
    store.set("/a/bc", br#"{"y":2}"#).unwrap();
    store.set("/a/b0", br#"{"z":3}"#).unwrap();

    assert_document(&store, "/a/b", &json!({"x": 1}));
}

#[test]
fn test_depth_one_lists_children_as_true() {
    let store = seeded();

    let doc = read_json(&store, "/connections", &GetOptions::shallow()).unwrap();

    assert_eq!(
        doc,
        json!({":1": true, ":2": true, ":3": true, ":4": true, ":5": true})
    );
}

#[test]
fn test_depth_two_truncates_nested_containers() {
    let store = seeded();
    let options = GetOptions {
        depth: 2,
        ..Default::default()
    };

    let doc = read_json(&store, "/connections/:1", &options).unwrap();

    assert_eq!(
        doc,
        json!({
            "name": "c1",
            "connectorId": "http",
            "configuredProperties": {"url": "https://1", "timeout": 30},
            "tags": ["prod", "eu"]
        })
    );

    let shallow = read_json(&store, "/connections/:1", &GetOptions::shallow()).unwrap();
    assert_eq!(shallow["configuredProperties"], json!(true));
    assert_eq!(shallow["tags"], json!(true));
    assert_eq!(shallow["name"], json!("c1"));
}

#[test]
fn test_start_and_end_bounds() {
    let store = seeded();

    let options = GetOptions {
        depth: 1,
        start_at: Some(":2".into()),
        end_at: Some(":4".into()),
        ..Default::default()
    };
    assert_keys(&store, "/connections", &options, &[":2", ":3", ":4"]);

    let options = GetOptions {
        depth: 1,
        start_after: Some(":2".into()),
        end_before: Some(":4".into()),
        ..Default::default()
    };
    assert_keys(&store, "/connections", &options, &[":3"]);
}

#[test]
fn test_bounds_outside_children_return_none() {
    let store = seeded();
    let options = GetOptions {
        start_at: Some(":9".into()),
        ..Default::default()
    };

    assert!(read_json(&store, "/connections", &options).is_none());
}

#[test]
fn test_descending_order_with_limit() {
    let store = seeded();
    let options = GetOptions {
        depth: 1,
        order: Order::Desc,
        limit_to_first: Some(2),
        ..Default::default()
    };

    assert_keys(&store, "/connections", &options, &[":5", ":4"]);
}

#[test]
fn test_limit_counts_whole_children() {
    let store = seeded();
    let options = GetOptions {
        limit_to_first: Some(2),
        ..Default::default()
    };

    let doc = read_json(&store, "/connections", &options).unwrap();

    assert_eq!(doc.as_object().unwrap().len(), 2);
    assert_eq!(doc[":2"], connection("c2", "https://2"));
}

#[test]
fn test_pretty_print_and_callback() {
    let store = test_store();
    store.set("/a", br#"{"b":[1,2]}"#).unwrap();

    let pretty = GetOptions {
        pretty_print: true,
        ..Default::default()
    };
    let text = store.get_as_string("/a", &pretty).unwrap().unwrap();
    assert!(text.contains('\n'));
    assert_eq!(
        serde_json::from_str::<Value>(&text).unwrap(),
        json!({"b": [1, 2]})
    );

    let jsonp = GetOptions {
        callback: Some("cb".into()),
        ..Default::default()
    };
    assert_eq!(
        store.get_as_string("/a", &jsonp).unwrap().as_deref(),
        Some(r#"cb({"b":[1,2]})"#)
    );
}

#[test]
fn test_id_prefix_operator_pushes_down_range() {
    let store = test_store();
    for id in ["ab1", "ab2", "ac1", "b1"] {
        store
            .set(&format!("/items/:{id}"), &bytes(&json!({"id": id})))
            .unwrap();
    }

    let plan = plan_operators(vec![
        ListOperator::IdPrefix("ab".into()),
        ListOperator::Custom(Box::new(|items: Vec<Value>| {
            items.into_iter().filter(|i| i["id"] != "ab1").collect()
        })),
    ]);
    let doc = read_json(&store, "/items", &plan.options).unwrap();
    let items: Vec<Value> = doc.as_object().unwrap().values().cloned().collect();
    assert_eq!(items.len(), 2);

    let filtered = plan.apply(items);
    assert_eq!(filtered, vec![json!({"id": "ab2"})]);
}

#[test]
fn test_list_collection_reads_as_array() {
    let store = SqlJsonDb::in_memory()
        .unwrap()
        .with_list_collections(&["/metrics"])
        .unwrap();
    store.create_tables().unwrap();

    store.push("/metrics", br#"{"v":1}"#).unwrap();
    store.push("/metrics", br#"{"v":2}"#).unwrap();

    assert_document(&store, "/metrics", &json!([{"v": 1}, {"v": 2}]));
    // other collections keep their key map
    store.push("/events", br#"{"v":3}"#).unwrap();
    assert!(read_json(&store, "/events", &GetOptions::default())
        .unwrap()
        .is_object());
}

#[test]
fn test_exists_covers_subtree() {
    let store = seeded();

    assert!(store.exists("/connections").unwrap());
    assert!(store.exists("/connections/:3/configuredProperties/url").unwrap());
    assert!(!store.exists("/connections/:3/missing").unwrap());
    assert!(!store.exists("/connections/:30").unwrap());
}
