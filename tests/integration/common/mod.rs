//! Shared models for the integration tests.
//!
//! Relationships:
//! - Tag has_many Posts through the `post_tag` pivot collection (`posts`)
//! - Tag has_many PostTag rows (`tag_links`), and Posts via those (`linked_posts`)
//! - Tag has_many Comments via its pivot `posts` relation (`post_comments`)
//! - Author has_many Posts (`posts`)
//! - Post has_one Author (`author`), has_many Comments (`comments`)
//! - Comment has_one Post (`post`), and the post's Author via it (`post_author`)
//! - BlogTag has_many BlogPosts through `post_tag`, both on the `blog` connection

#![allow(dead_code)]

use aranguard::test_helpers::{mock_connection, MockExecutor, RecordingDiagnostics};
use aranguard::{ActiveQuery, ActiveRecord, Connection, ErasedRelation, Link, RecordState, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(skip)]
    pub state: RecordState,
    #[serde(skip)]
    pub after_find_calls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTag {
    pub tag_id: i64,
    pub post_id: i64,
    #[serde(skip)]
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub body: String,
    #[serde(skip)]
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogTag {
    pub id: i64,
    #[serde(skip)]
    pub state: RecordState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    #[serde(skip)]
    pub state: RecordState,
}

pub const BLOG_CONNECTION: &str = "blog";

// ============================================================================
// ActiveRecord implementations
// ============================================================================

impl ActiveRecord for Tag {
    fn collection_name() -> &'static str {
        "tags"
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
    fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
        match name {
            "posts" => Some(
                ActiveQuery::<Post>::has_many(Link::new([("id", "post_id")]))
                    .via_collection("post_tag", Link::new([("tag_id", "id")]))
                    .boxed(),
            ),
            "tag_links" => {
                Some(ActiveQuery::<PostTag>::has_many(Link::new([("tag_id", "id")])).boxed())
            }
            "linked_posts" => Some(
                ActiveQuery::<Post>::has_many(Link::new([("id", "post_id")]))
                    .via("tag_links", Tag::relation("tag_links")?)
                    .boxed(),
            ),
            "post_comments" => Some(
                ActiveQuery::<Comment>::has_many(Link::new([("post_id", "id")]))
                    .via("posts", Tag::relation("posts")?)
                    .boxed(),
            ),
            _ => None,
        }
    }
}

impl ActiveRecord for Post {
    fn collection_name() -> &'static str {
        "posts"
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
    fn after_find(&mut self) {
        self.after_find_calls += 1;
    }
    fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
        match name {
            "author" => {
                Some(ActiveQuery::<Author>::has_one(Link::new([("id", "author_id")])).boxed())
            }
            "comments" => {
                Some(ActiveQuery::<Comment>::has_many(Link::new([("post_id", "id")])).boxed())
            }
            _ => None,
        }
    }
}

impl ActiveRecord for PostTag {
    fn collection_name() -> &'static str {
        "post_tag"
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
}

impl ActiveRecord for Author {
    fn collection_name() -> &'static str {
        "authors"
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
    fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
        match name {
            "posts" => {
                Some(ActiveQuery::<Post>::has_many(Link::new([("author_id", "id")])).boxed())
            }
            _ => None,
        }
    }
}

impl ActiveRecord for Comment {
    fn collection_name() -> &'static str {
        "comments"
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
    fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
        match name {
            "post" => Some(ActiveQuery::<Post>::has_one(Link::new([("id", "post_id")])).boxed()),
            "post_author" => Some(
                ActiveQuery::<Author>::has_one(Link::new([("id", "author_id")]))
                    .via("post", Comment::relation("post")?)
                    .boxed(),
            ),
            _ => None,
        }
    }
}

impl ActiveRecord for BlogTag {
    fn collection_name() -> &'static str {
        "tags"
    }
    fn connection_name() -> &'static str {
        BLOG_CONNECTION
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
    fn relation(name: &str) -> Option<Box<dyn ErasedRelation>> {
        match name {
            "posts" => Some(
                ActiveQuery::<BlogPost>::has_many(Link::new([("id", "post_id")]))
                    .via_collection("post_tag", Link::new([("tag_id", "id")]))
                    .boxed(),
            ),
            _ => None,
        }
    }
}

impl ActiveRecord for BlogPost {
    fn collection_name() -> &'static str {
        "posts"
    }
    fn connection_name() -> &'static str {
        BLOG_CONNECTION
    }
    fn state(&self) -> &RecordState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut RecordState {
        &mut self.state
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn tag(id: i64, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_owned(),
        state: RecordState::default(),
    }
}

pub fn author(id: i64, name: &str) -> Author {
    Author {
        id,
        name: name.to_owned(),
        state: RecordState::default(),
    }
}

pub fn comment(id: i64, post_id: i64, body: &str) -> Comment {
    Comment {
        id,
        post_id,
        body: body.to_owned(),
        state: RecordState::default(),
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object")
}

/// Connection over a scripted executor, with the executor and sink for assertions.
pub fn setup(
    executor: MockExecutor,
) -> (Connection, Arc<MockExecutor>, Arc<RecordingDiagnostics>) {
    let executor = Arc::new(executor);
    let (conn, diagnostics) = mock_connection(executor.clone());
    (conn, executor, diagnostics)
}
