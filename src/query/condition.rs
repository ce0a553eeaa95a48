//! Filter conditions and sort order.
//!
//! Conditions are rendered into AQL `FILTER` expressions against the loop
//! variable `doc`; every value is bound as a bind variable.

use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub(crate) fn as_aql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn as_aql(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// Filter condition tree
///
/// # Example
///
/// ```
/// use aranguard::Condition;
///
/// let cond = Condition::all(vec![
///     Condition::eq("status", "published"),
///     Condition::is_in("author_id", vec![1.into(), 2.into()]),
/// ]);
/// assert!(!cond.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    NotIn {
        field: String,
        values: Vec<Value>,
    },
    /// `(f1, f2) IN [(a, b), (c, d)]`, rendered as an OR of ANDs
    InTuples {
        fields: Vec<String>,
        tuples: Vec<Vec<Value>>,
    },
    Like {
        field: String,
        pattern: String,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::In {
            field: field.into(),
            values,
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::NotIn {
            field: field.into(),
            values,
        }
    }

    pub fn in_tuples(fields: Vec<String>, tuples: Vec<Vec<Value>>) -> Self {
        Condition::InTuples { fields, tuples }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Condition::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::All(conditions)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Any(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// True for an empty `All` group, which filters nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Condition::All(items) if items.iter().all(Condition::is_empty))
    }

    /// Render against loop variable `var`, pushing values into `binds`.
    pub(crate) fn render(&self, var: &str, binds: &mut BindVars) -> String {
        match self {
            Condition::Compare { field, op, value } => {
                let bound = binds.push(value.clone());
                format!("{} {} {}", attribute_ref(var, field), op.as_aql(), bound)
            }
            Condition::In { field, values } => {
                let bound = binds.push(Value::Array(values.clone()));
                format!("{} IN {}", attribute_ref(var, field), bound)
            }
            Condition::NotIn { field, values } => {
                let bound = binds.push(Value::Array(values.clone()));
                format!("{} NOT IN {}", attribute_ref(var, field), bound)
            }
            Condition::InTuples { fields, tuples } => {
                if tuples.is_empty() {
                    return "false".to_owned();
                }
                let alternatives: Vec<String> = tuples
                    .iter()
                    .map(|tuple| {
                        let parts: Vec<String> = fields
                            .iter()
                            .zip(tuple)
                            .map(|(field, value)| {
                                let bound = binds.push(value.clone());
                                format!("{} == {}", attribute_ref(var, field), bound)
                            })
                            .collect();
                        format!("({})", parts.join(" && "))
                    })
                    .collect();
                format!("({})", alternatives.join(" || "))
            }
            Condition::Like { field, pattern } => {
                let bound = binds.push(Value::String(pattern.clone()));
                format!("LIKE({}, {})", attribute_ref(var, field), bound)
            }
            Condition::All(items) => render_group(items, var, binds, " && ", "true"),
            Condition::Any(items) => render_group(items, var, binds, " || ", "false"),
            Condition::Not(inner) => format!("!({})", inner.render(var, binds)),
        }
    }
}

fn render_group(
    items: &[Condition],
    var: &str,
    binds: &mut BindVars,
    joiner: &str,
    empty: &str,
) -> String {
    if items.is_empty() {
        return empty.to_owned();
    }
    let parts: Vec<String> = items.iter().map(|c| c.render(var, binds)).collect();
    format!("({})", parts.join(joiner))
}

/// `doc.a.b` with every segment quoted.
pub(crate) fn attribute_ref(var: &str, field: &str) -> String {
    let mut out = String::from(var);
    for segment in field.split('.') {
        out.push_str(".`");
        out.push_str(&segment.replace('`', "\\`"));
        out.push('`');
    }
    out
}

/// Positional bind variables `@v0, @v1, ...`
#[derive(Debug, Default)]
pub(crate) struct BindVars {
    values: Vec<Value>,
}

impl BindVars {
    pub(crate) fn push(&mut self, value: Value) -> String {
        let name = format!("@v{}", self.values.len());
        self.values.push(value);
        name
    }

    pub(crate) fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        self.values
            .into_iter()
            .enumerate()
            .map(|(pos, value)| (format!("v{pos}"), value))
    }
}
