//! Relations between models.
//!
//! A relation is an [`ActiveQuery`](crate::ActiveQuery) over the related model
//! carrying a [`Link`], a multiplicity, and an optional [`Via`] descriptor:
//! - direct: the related collection holds the keys of the parent
//! - pivot: keys are looked up in a pivot collection first
//! - named: keys come from the records of another, already declared relation
//!
//! # Architecture
//!
//! - **Def**: `Via` and `Link`
//! - **Cache**: resolved results (`Related`) keyed by relation name
//! - **Erased**: object-safe relation view used for via chains and eager loading
//! - **Helpers**: key extraction and bucket keys
//! - **Eager**: `with(...)` resolution over a whole result set
//! - **Lazy**: on-demand resolution for one parent

// Relation definitions
pub mod def;
#[doc(inline)]
pub use def::{Link, Via};

// Resolved relation results
pub mod cache;
#[doc(inline)]
pub use cache::{Related, RelationCache};

// Object-safe relation view
pub mod erased;
#[doc(inline)]
pub use erased::ErasedRelation;

// Key helpers
pub mod helpers;

// Eager loading
pub mod eager;
#[doc(inline)]
pub use eager::{find_with, normalize_relations};

// Lazy loading
pub mod lazy;
#[doc(inline)]
pub use lazy::LazyLoader;
