//! Query building and execution.
//!
//! # Architecture
//!
//! - **Condition**: filter tree and sort order (`Condition`, `Order`)
//! - **Builder**: base `Query` rendered into an AQL `Statement`
//! - **Execution**: base `all`/`one`/`count`/`exists` over a `Connection`
//! - **Hydrate**: unwrapping, positional remap, model instantiation, indexing
//! - **Records**: result collections and index extractors
//! - **Active**: `ActiveQuery`/`ArrayQuery`, relation-aware model queries
//! - **Error**: `QueryError`
//!
//! # Examples
//!
//! ```no_run
//! use aranguard::{ActiveRecord, Condition, ConnectionManager};
//! # use aranguard::RecordState;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize)]
//! # struct User { name: String, #[serde(skip)] state: RecordState }
//! # impl ActiveRecord for User {
//! #     fn collection_name() -> &'static str { "users" }
//! #     fn state(&self) -> &RecordState { &self.state }
//! #     fn state_mut(&mut self) -> &mut RecordState { &mut self.state }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ConnectionManager::load()?;
//!
//! // Find all users
//! let users = User::find().all(&db)?;
//!
//! // Find users with filters, as plain rows keyed by name
//! let active_users = User::find()
//!     .filter(Condition::eq("active", true))
//!     .as_array()
//!     .index_by_field("name")
//!     .all(&db)?;
//! # Ok(())
//! # }
//! ```

// Filter conditions
pub mod condition;
#[doc(inline)]
pub use condition::{CompareOp, Condition, Order};

// Base query and statements
pub mod builder;
#[doc(inline)]
pub use builder::{Query, Statement};

// Base query execution methods
pub mod execution;

// Row hydration
pub mod hydrate;

// Result collections
pub mod records;
#[doc(inline)]
pub use records::{by_attribute, by_field, IndexBy, Records};

// Model queries and relations
pub mod active;
#[doc(inline)]
pub use active::{ActiveQuery, ArrayQuery};

// Error type
pub mod error;
#[doc(inline)]
pub use error::QueryError;
