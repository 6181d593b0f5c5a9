//! Custom test assertions for stored documents

use jsondb::{GetOptions, JsonDb};
use serde_json::Value;

/// Read and parse the document at `path`
pub fn read_json(db: &dyn JsonDb, path: &str, options: &GetOptions) -> Option<Value> {
    db.get(path, options)
        .expect("Failed to read document")
        .map(|bytes| serde_json::from_slice(&bytes).expect("Store returned invalid JSON"))
}

/// Assert the document at `path` equals `expected`
pub fn assert_document(db: &dyn JsonDb, path: &str, expected: &Value) {
    let actual = read_json(db, path, &GetOptions::default());
    assert_eq!(
        actual.as_ref(),
        Some(expected),
        "Document at {path} does not match"
    );
}

/// Assert nothing is stored at `path`
pub fn assert_absent(db: &dyn JsonDb, path: &str) {
    assert!(
        !db.exists(path).expect("Failed to check existence"),
        "Expected nothing at {path}"
    );
    assert!(
        db.get(path, &GetOptions::default())
            .expect("Failed to read document")
            .is_none(),
        "Expected get({path}) to be None"
    );
}

/// Assert the keys of the object at `path`, in rendered order
pub fn assert_keys(db: &dyn JsonDb, path: &str, options: &GetOptions, expected: &[&str]) {
    let doc = read_json(db, path, options).expect("Expected a document");
    let keys: Vec<&str> = doc
        .as_object()
        .expect("Expected an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, expected, "Keys at {path} do not match");
}
