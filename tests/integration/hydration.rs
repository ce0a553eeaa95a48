//! Integration tests for row hydration and the query executors
//!
//! Covers array and model mode, positional select remapping, indexing,
//! empty results, and backend error wrapping with diagnostics.

mod common;

use aranguard::test_helpers::{DiagnosticEvent, MockExecutor};
use aranguard::{ActiveRecord, Condition, QueryError, Records};
use common::{setup, Post};
use serde_json::{json, Value};

#[test]
fn test_array_mode_returns_unwrapped_row_unchanged() {
    let document =
        json!({"_key": "10", "_id": "posts/10", "_rev": "_h1", "id": 10, "title": "Hello"});
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![document.clone()]));

    let rows = Post::find().as_array().all(&conn).unwrap().into_vec();

    assert_eq!(rows.len(), 1);
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_key", "_id", "_rev", "id", "title"]);
    assert_eq!(Value::Object(rows[0].clone()), document);
}

#[test]
fn test_positional_remap_of_object_rows() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![json!({"a": 1, "b": 2})]));
    let rows = Post::find().select(["x", "y"]).as_array().all(&conn).unwrap().into_vec();
    assert_eq!(Value::Object(rows[0].clone()), json!({"x": 1, "y": 2}));
}

#[test]
fn test_positional_remap_of_tuple_rows_keeps_row_order() {
    let (conn, executor, _) =
        setup(MockExecutor::new().with_rows(vec![json!([10, "a"]), json!([11, "b"])]));
    let posts = Post::find().select(["id", "title"]).all(&conn).unwrap().into_vec();

    assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10, 11]);
    assert_eq!(posts[1].title, "b");
    assert!(executor.statements()[0].aql().ends_with("RETURN [doc.`id`, doc.`title`]"));
}

#[test]
fn test_index_by_field_keeps_last_row() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![
        json!({"id": 1, "slug": "a"}),
        json!({"id": 2, "slug": "b"}),
        json!({"id": 3, "slug": "a"}),
    ]));
    let rows = Post::find().as_array().index_by_field("slug").all(&conn).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows.keys(), vec!["a", "b"]);
    assert_eq!(rows.get("a").and_then(|r| r.get("id")), Some(&json!(3)));
}

#[test]
fn test_index_by_closure_on_models() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![
        json!({"id": 1, "title": "x"}),
        json!({"id": 2, "title": "y"}),
        json!({"id": 3, "title": "x"}),
    ]));
    let posts = Post::find().index_by(|p: &Post| p.title.clone()).all(&conn).unwrap();

    match &posts {
        Records::Indexed(map) => {
            assert_eq!(map.len(), 2);
            assert_eq!(map["x"].id, 3);
            assert_eq!(map["y"].id, 2);
        }
        Records::List(_) => panic!("expected indexed records"),
    }
}

#[test]
fn test_models_are_marked_loaded() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![json!({"id": 1, "title": "x"})]));
    let post = Post::find().one(&conn).unwrap().expect("post");
    assert!(!post.is_new_record());
    assert_eq!(post.after_find_calls, 1);
}

#[test]
fn test_all_without_rows_is_empty_collection() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![]));
    let posts = Post::find().index_by_attribute("title").all(&conn).unwrap();
    assert!(posts.is_empty());
    assert!(posts.as_list().is_some());
}

#[test]
fn test_one_without_rows_is_none() {
    let (conn, executor, _) = setup(MockExecutor::new().with_rows(vec![]));
    assert!(Post::find().filter(Condition::eq("id", 99)).one(&conn).unwrap().is_none());
    assert!(executor.statements()[0].aql().contains("LIMIT 0, 1"));
}

#[test]
fn test_backend_error_is_wrapped_and_profile_closed_once() {
    let (conn, _, diagnostics) = setup(MockExecutor::new().with_error("AQL: syntax error", 1501));
    let err = Post::find().all(&conn).unwrap_err();

    match &err {
        QueryError::Execution { message, code, .. } => {
            assert_eq!(message, "AQL: syntax error");
            assert_eq!(*code, 1501);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(diagnostics.count(|e| matches!(e, DiagnosticEvent::BeginProfile { .. })), 1);
    assert_eq!(diagnostics.count(|e| matches!(e, DiagnosticEvent::EndProfile { .. })), 1);
}

#[test]
fn test_diagnostics_token_is_raw_aql() {
    let (conn, _, diagnostics) = setup(MockExecutor::new());
    Post::find().filter(Condition::eq("title", "x")).all(&conn).unwrap();

    let expected = "FOR doc IN `posts`\nFILTER doc.`title` == \"x\"\nRETURN doc";
    let events = diagnostics.events();
    assert_eq!(events.len(), 3);
    for event in events {
        let token = match event {
            DiagnosticEvent::Info { token, .. }
            | DiagnosticEvent::BeginProfile { token, .. }
            | DiagnosticEvent::EndProfile { token, .. } => token,
        };
        assert_eq!(token, expected);
    }
}

#[test]
fn test_count_and_exists() {
    let (conn, executor, _) =
        setup(MockExecutor::new().with_rows(vec![json!(4)]).with_rows(vec![json!(1)]));
    assert_eq!(Post::find().count(&conn).unwrap(), 4);
    assert!(Post::find().exists(&conn).unwrap());
    assert_eq!(executor.collections(), vec!["posts", "posts"]);
}

#[test]
fn test_hydration_error_names_model() {
    let (conn, _, _) = setup(
        MockExecutor::new().with_rows(vec![json!({"id": "not a number", "title": "x"})]),
    );
    let err = Post::find().all(&conn).unwrap_err();
    assert!(matches!(err, QueryError::Hydration { model: "posts", .. }));
}
