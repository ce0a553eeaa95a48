//! Integration tests for relation resolution
//!
//! These tests run relation queries against a scripted executor and check
//! both the loaded records and the exact sub-queries issued, in order.

mod common;

use aranguard::test_helpers::MockExecutor;
use aranguard::{
    ActiveQuery, ActiveRecord, Condition, ConnectionManager, LazyLoader, Link, QueryError,
    RecordState, Related, DEFAULT_CONNECTION,
};
use common::{
    author, comment, row, setup, tag, Author, BlogPost, BlogTag, Comment, Post, PostTag, Tag,
    BLOG_CONNECTION,
};
use serde_json::json;

// ============================================================================
// Lazy loading
// ============================================================================

#[test]
fn test_pivot_relation_dedups_pivot_keys() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 5, "post_id": 10}),
            ])
            .with_rows(vec![json!({"id": 10, "title": "Hello"})]),
    );
    let mut rust = tag(5, "rust");
    let mut loader = LazyLoader::new(&mut rust, &conn);
    let posts = loader.load_many::<Post>("posts").unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, 10);
    assert!(!posts[0].is_new_record());

    assert_eq!(executor.collections(), vec!["post_tag", "posts"]);
    let statements = executor.statements();
    assert!(statements[0].aql().contains("FILTER doc.`tag_id` IN @v0"));
    assert_eq!(statements[0].bind_vars()["v0"], json!([5]));
    assert!(statements[1].aql().contains("FILTER doc.`id` IN @v0"));
    assert_eq!(statements[1].bind_vars()["v0"], json!([10]));
}

#[test]
fn test_pivot_without_rows_matches_nothing() {
    let (conn, executor, _) = setup(MockExecutor::new().with_rows(vec![]));
    let mut rust = tag(5, "rust");
    let mut loader = LazyLoader::new(&mut rust, &conn);

    assert!(loader.load_many::<Post>("posts").unwrap().is_empty());
    assert_eq!(executor.collections(), vec!["post_tag"]);
}

#[test]
fn test_lazy_result_is_cached() {
    let (conn, executor, _) = setup(
        MockExecutor::new().with_rows(vec![json!({"id": 10, "title": "a", "author_id": 7})]),
    );
    let mut ann = author(7, "ann");
    {
        let mut loader = LazyLoader::new(&mut ann, &conn);
        assert_eq!(loader.load("posts").unwrap().len(), 1);
        assert_eq!(loader.load("posts").unwrap().len(), 1);
    }
    assert_eq!(executor.executed(), 1);
    assert!(ann.is_relation_populated("posts"));
    assert_eq!(ann.state().relations().many::<Post>("posts")[0].title, "a");
}

#[test]
fn test_direct_relation_filters_by_parent_key() {
    let (conn, executor, _) = setup(MockExecutor::new());
    let ann = author(7, "ann");
    let posts = ActiveQuery::<Post>::has_many(Link::new([("author_id", "id")]))
        .primary(&ann)
        .filter(Condition::eq("status", "published"))
        .all(&conn)
        .unwrap();

    assert!(posts.is_empty());
    let statement = &executor.statements()[0];
    assert_eq!(
        statement.aql(),
        "FOR doc IN @@collection\nFILTER doc.`status` == @v0\nFILTER doc.`author_id` IN @v1\nRETURN doc"
    );
    assert_eq!(statement.bind_vars()["v1"], json!([7]));
}

#[test]
fn test_named_via_caches_intermediate_records() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 5, "post_id": 11}),
            ])
            .with_rows(vec![json!({"id": 10, "title": "a"}), json!({"id": 11, "title": "b"})]),
    );
    let mut rust = tag(5, "rust");
    {
        let mut loader = LazyLoader::new(&mut rust, &conn);
        let posts = loader.load_many::<Post>("linked_posts").unwrap();
        assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10, 11]);
    }

    let links = rust.state().relations().many::<PostTag>("tag_links");
    assert_eq!(links.len(), 2);
    assert_eq!(executor.collections(), vec!["post_tag", "posts"]);
    assert_eq!(executor.statements()[1].bind_vars()["v0"], json!([10, 11]));
}

#[test]
fn test_named_via_single_record() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 10, "title": "x", "author_id": 7})])
            .with_rows(vec![json!({"id": 7, "name": "ann"})]),
    );
    let mut c = comment(1, 10, "hi");
    {
        let mut loader = LazyLoader::new(&mut c, &conn);
        let found = loader.load_one::<Author>("post_author").unwrap();
        assert_eq!(found.map(|a| a.name.as_str()), Some("ann"));
    }

    assert_eq!(c.state().relations().one::<Post>("post").map(|p| p.id), Some(10));
    let statements = executor.statements();
    assert!(statements[0].aql().contains("LIMIT 0, 1"));
    assert_eq!(statements[1].bind_vars()["v0"], json!([7]));
}

#[test]
fn test_named_via_single_record_absent() {
    let (conn, executor, _) = setup(MockExecutor::new().with_rows(vec![]));
    let mut c = comment(1, 10, "hi");
    {
        let mut loader = LazyLoader::new(&mut c, &conn);
        assert!(loader.load_one::<Author>("post_author").unwrap().is_none());
    }

    assert!(matches!(c.related("post"), Some(Related::One(None))));
    assert!(matches!(c.related("post_author"), Some(Related::One(None))));
    assert_eq!(executor.executed(), 1);
}

#[test]
fn test_named_via_over_pivot_relation() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"tag_id": 5, "post_id": 10})])
            .with_rows(vec![json!({"id": 10, "title": "a"})])
            .with_rows(vec![json!({"id": 100, "post_id": 10, "body": "hi"})]),
    );
    let mut rust = tag(5, "rust");
    {
        let mut loader = LazyLoader::new(&mut rust, &conn);
        let comments = loader.load_many::<Comment>("post_comments").unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "hi");
    }

    assert_eq!(rust.state().relations().many::<Post>("posts").len(), 1);
    assert_eq!(executor.collections(), vec!["post_tag", "posts", "comments"]);
    assert_eq!(executor.statements()[2].bind_vars()["v0"], json!([10]));
}

#[test]
fn test_lazy_unknown_relation() {
    let (conn, _, _) = setup(MockExecutor::new());
    let mut ann = author(7, "ann");
    let err = LazyLoader::new(&mut ann, &conn).load("books").unwrap_err();
    assert_eq!(
        err,
        QueryError::UnknownRelation {
            model: "authors",
            relation: "books".to_owned()
        }
    );
}

#[test]
fn test_lazy_error_is_not_cached() {
    let (conn, _, _) = setup(MockExecutor::new().with_error("collection or view not found", 1203));
    let mut ann = author(7, "ann");
    let err = LazyLoader::new(&mut ann, &conn).load("posts").unwrap_err();
    assert!(matches!(err, QueryError::Execution { code: 1203, .. }));
    assert!(!ann.is_relation_populated("posts"));
}

// ============================================================================
// Eager loading
// ============================================================================

#[test]
fn test_eager_pivot_relation() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![
                json!({"id": 5, "name": "rust"}),
                json!({"id": 6, "name": "go"}),
                json!({"id": 7, "name": "c"}),
            ])
            .with_rows(vec![
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 6, "post_id": 10}),
                json!({"tag_id": 6, "post_id": 11}),
            ])
            .with_rows(vec![json!({"id": 10, "title": "a"}), json!({"id": 11, "title": "b"})]),
    );
    let tags = Tag::find().with(["posts"]).all(&conn).unwrap().into_vec();

    let ids = |t: &Tag| -> Vec<i64> {
        t.state()
            .relations()
            .many::<Post>("posts")
            .iter()
            .map(|p| p.id)
            .collect()
    };
    assert_eq!(ids(&tags[0]), vec![10]);
    assert_eq!(ids(&tags[1]), vec![10, 11]);
    assert!(ids(&tags[2]).is_empty());

    assert_eq!(executor.collections(), vec!["tags", "post_tag", "posts"]);
    let statements = executor.statements();
    assert_eq!(statements[1].bind_vars()["v0"], json!([5, 6, 7]));
    assert_eq!(statements[2].bind_vars()["v0"], json!([10, 11]));
}

#[test]
fn test_eager_nested_direct_relations() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 1, "name": "ann"}), json!({"id": 2, "name": "bob"})])
            .with_rows(vec![
                json!({"id": 10, "title": "x", "author_id": 1}),
                json!({"id": 11, "title": "y", "author_id": 1}),
            ])
            .with_rows(vec![json!({"id": 100, "post_id": 11, "body": "hi"})]),
    );
    let authors = Author::find().with(["posts.comments"]).all(&conn).unwrap().into_vec();

    let ann_posts = authors[0].state().relations().many::<Post>("posts");
    assert_eq!(ann_posts.len(), 2);
    assert!(authors[1].state().relations().many::<Post>("posts").is_empty());
    assert!(ann_posts.iter().all(|p| p.after_find_calls == 1));

    assert!(ann_posts[0].state().relations().many::<Comment>("comments").is_empty());
    let comments = ann_posts[1].state().relations().many::<Comment>("comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body, "hi");

    assert_eq!(executor.collections(), vec!["authors", "posts", "comments"]);
    assert_eq!(executor.statements()[2].bind_vars()["v0"], json!([10, 11]));
}

#[test]
fn test_eager_has_one() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![
                json!({"id": 10, "title": "x", "author_id": 7}),
                json!({"id": 11, "title": "y", "author_id": null}),
            ])
            .with_rows(vec![json!({"id": 7, "name": "ann"})]),
    );
    let posts = Post::find().with(["author"]).all(&conn).unwrap().into_vec();

    assert_eq!(posts[0].state().relations().one::<Author>("author").map(|a| a.id), Some(7));
    assert!(matches!(posts[1].related("author"), Some(Related::One(None))));
    assert_eq!(executor.statements()[1].bind_vars()["v0"], json!([7]));
}

#[test]
fn test_eager_named_via_populates_both_relations() {
    let (conn, _, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 5, "name": "rust"}), json!({"id": 6, "name": "go"})])
            .with_rows(vec![
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 6, "post_id": 11}),
            ])
            .with_rows(vec![json!({"id": 10, "title": "a"}), json!({"id": 11, "title": "b"})]),
    );
    let tags = Tag::find().with(["linked_posts"]).all(&conn).unwrap().into_vec();

    assert_eq!(tags[0].state().relations().many::<PostTag>("tag_links").len(), 1);
    let linked: Vec<i64> = tags[1]
        .state()
        .relations()
        .many::<Post>("linked_posts")
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(linked, vec![11]);
}

#[test]
fn test_eager_named_via_over_pivot_relation() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 5, "name": "rust"}), json!({"id": 6, "name": "go"})])
            .with_rows(vec![
                json!({"tag_id": 5, "post_id": 10}),
                json!({"tag_id": 6, "post_id": 10}),
                json!({"tag_id": 6, "post_id": 11}),
            ])
            .with_rows(vec![json!({"id": 10, "title": "a"}), json!({"id": 11, "title": "b"})])
            .with_rows(vec![
                json!({"id": 100, "post_id": 10, "body": "x"}),
                json!({"id": 101, "post_id": 11, "body": "y"}),
            ]),
    );
    let tags = Tag::find().with(["post_comments"]).all(&conn).unwrap().into_vec();

    let ids = |t: &Tag| -> Vec<i64> {
        t.state()
            .relations()
            .many::<Comment>("post_comments")
            .iter()
            .map(|c| c.id)
            .collect()
    };
    assert_eq!(ids(&tags[0]), vec![100]);
    assert_eq!(ids(&tags[1]), vec![100, 101]);
    assert_eq!(tags[1].state().relations().many::<Post>("posts").len(), 2);

    assert_eq!(executor.collections(), vec!["tags", "post_tag", "posts", "comments"]);
    assert_eq!(executor.statements()[3].bind_vars()["v0"], json!([10, 11]));
}

#[test]
fn test_eager_in_array_mode_inlines_json() {
    let (conn, _, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 1, "name": "ann"}), json!({"id": 2, "name": "bob"})])
            .with_rows(vec![json!({"id": 10, "title": "x", "author_id": 1})]),
    );
    let rows = Author::find().with(["posts"]).as_array().all(&conn).unwrap().into_vec();

    assert_eq!(rows[0]["posts"], json!([{"id": 10, "title": "x", "author_id": 1}]));
    assert_eq!(rows[1]["posts"], json!([]));
}

#[test]
fn test_eager_unknown_relation() {
    let (conn, _, _) = setup(MockExecutor::new().with_rows(vec![json!({"id": 1, "name": "ann"})]));
    let err = Author::find().with(["books"]).all(&conn).unwrap_err();
    assert!(matches!(err, QueryError::UnknownRelation { ref relation, .. } if relation == "books"));
}

#[test]
fn test_eager_skipped_without_rows() {
    let (conn, executor, _) = setup(MockExecutor::new());
    assert!(Author::find().with(["books"]).all(&conn).unwrap().is_empty());
    assert_eq!(executor.executed(), 1);
}

// ============================================================================
// Connection resolution
// ============================================================================

#[test]
fn test_manager_resolves_model_connection() {
    let (conn, executor, _) =
        setup(MockExecutor::new().with_rows(vec![json!({"id": 1, "name": "ann"})]));
    let manager = ConnectionManager::new().with_connection(DEFAULT_CONNECTION, conn);
    assert_eq!(Author::find().all(&manager).unwrap().len(), 1);
    assert_eq!(executor.executed(), 1);
}

#[test]
fn test_pivot_relation_uses_model_connection() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"tag_id": 5, "post_id": 10})])
            .with_rows(vec![json!({"id": 10, "title": "Hello"})]),
    );
    let manager = ConnectionManager::new().with_connection(BLOG_CONNECTION, conn);
    let mut blog_tag = BlogTag {
        id: 5,
        state: RecordState::default(),
    };
    let mut loader = LazyLoader::new(&mut blog_tag, &manager);
    let posts = loader.load_many::<BlogPost>("posts").unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hello");
    assert_eq!(executor.collections(), vec!["post_tag", "posts"]);
}

#[test]
fn test_eager_pivot_relation_uses_model_connection() {
    let (conn, executor, _) = setup(
        MockExecutor::new()
            .with_rows(vec![json!({"id": 5})])
            .with_rows(vec![json!({"tag_id": 5, "post_id": 10})])
            .with_rows(vec![json!({"id": 10, "title": "Hello"})]),
    );
    let manager = ConnectionManager::new().with_connection(BLOG_CONNECTION, conn);
    let tags = BlogTag::find().with(["posts"]).all(&manager).unwrap().into_vec();

    assert_eq!(tags[0].state().relations().many::<BlogPost>("posts").len(), 1);
    assert_eq!(executor.collections(), vec!["tags", "post_tag", "posts"]);
}

#[test]
fn test_manager_without_connection() {
    let manager = ConnectionManager::new();
    let err = Author::find().count(&manager).unwrap_err();
    assert_eq!(err, QueryError::UnknownConnection("default".to_owned()));
}

#[test]
fn test_primary_accepts_plain_rows() {
    let (conn, executor, _) = setup(MockExecutor::new().with_rows(vec![json!(2)]));
    let parent = row(json!({"id": 7}));
    let count = ActiveQuery::<Post>::has_many(Link::new([("author_id", "id")]))
        .primary(&parent)
        .count(&conn)
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(executor.statements()[0].bind_vars()["v0"], json!([7]));
}
