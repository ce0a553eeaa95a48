//! Relation definition types.

use crate::relation::erased::ErasedRelation;
use std::fmt;

/// Column pairs joining a related collection to its parent
///
/// Each pair is `(related column, parent column)`: for
/// `Link::new([("author_id", "_key")])` the related records are those whose
/// `author_id` equals the parent's `_key`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pairs: Vec<(String, String)>,
}

impl Link {
    pub fn new<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect(),
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Columns on the related side.
    pub fn related_columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|(related, _)| related.as_str()).collect()
    }

    /// Columns on the parent side.
    pub fn parent_columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|(_, parent)| parent.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// How a relation reaches its records
pub enum Via {
    /// Filter the related collection by the parent's own keys
    Direct,
    /// Look the keys up in a pivot collection first
    ///
    /// The boxed relation is linked to the parent; the outer link maps the
    /// related collection onto the pivot rows.
    Pivot(Box<dyn ErasedRelation>),
    /// Take the keys from the records of another relation of the parent
    ///
    /// Those records are stored in the parent's relation cache under `name`.
    Named {
        name: String,
        relation: Box<dyn ErasedRelation>,
    },
}

impl Via {
    pub fn is_direct(&self) -> bool {
        matches!(self, Via::Direct)
    }
}

impl Default for Via {
    fn default() -> Self {
        Via::Direct
    }
}

impl Clone for Via {
    fn clone(&self) -> Self {
        match self {
            Via::Direct => Via::Direct,
            Via::Pivot(relation) => Via::Pivot(relation.clone_box()),
            Via::Named { name, relation } => Via::Named {
                name: name.clone(),
                relation: relation.clone_box(),
            },
        }
    }
}

impl fmt::Debug for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Via::Direct => f.write_str("Direct"),
            Via::Pivot(relation) => f.debug_tuple("Pivot").field(relation).finish(),
            Via::Named { name, relation } => f
                .debug_struct("Named")
                .field("name", name)
                .field("relation", relation)
                .finish(),
        }
    }
}
