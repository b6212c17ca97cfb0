//! The SPARQL-subset query AST.
//!
//! Queries are flat: a `SelectQuery` holds its WHERE patterns, OPTIONAL
//! blocks, and filters as plain vectors rather than a recursive algebra
//! tree. The executor's steps walk these vectors directly ("for each
//! pattern in order", "for each OPTIONAL block"), and the planner
//! reorders one vector in place — a nested tree would obscure exactly
//! the distinctions the executor (and its tests) care about.

use std::collections::HashMap;
use std::fmt;

/// One `(subject, predicate, object)` pattern. Slots hold terms in their
/// pre-expansion lexical form (`?x`, `<...>`, `"..."`, `prefix:local`, or
/// a bare word) until `expand_prefixes` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub s: String,
    pub p: String,
    pub o: String,
}

impl TriplePattern {
    pub fn new(s: impl Into<String>, p: impl Into<String>, o: impl Into<String>) -> Self {
        TriplePattern {
            s: s.into(),
            p: p.into(),
            o: o.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateExpression {
    pub function: AggregateFunction,
    pub variable: String,
    pub alias: String,
    pub distinct: bool,
}

/// Carries the raw, unparsed text of a `FILTER(...)` body — the
/// parenthesized expression, without the outer parens. Re-parsed by
/// `crate::filter` once per evaluated binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub expression: String,
}

impl Filter {
    pub fn new(expression: impl Into<String>) -> Self {
        Filter {
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub variable: String,
    pub descending: bool,
}

pub type Prefixes = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectQuery {
    /// Explicitly projected variables. Empty with `wildcard = true` means
    /// `SELECT *`.
    pub variables: Vec<String>,
    pub wildcard: bool,
    pub aggregates: Vec<AggregateExpression>,
    pub group_by: Vec<String>,
    pub having: Vec<Filter>,
    pub distinct: bool,
    pub where_clause: Vec<TriplePattern>,
    pub optional: Vec<Vec<TriplePattern>>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub prefixes: Prefixes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstructQuery {
    pub template: Vec<TriplePattern>,
    pub where_clause: Vec<TriplePattern>,
    pub optional: Vec<Vec<TriplePattern>>,
    pub filters: Vec<Filter>,
    pub prefixes: Prefixes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeQuery {
    pub resources: Vec<String>,
    pub where_clause: Option<Vec<TriplePattern>>,
    pub optional: Vec<Vec<TriplePattern>>,
    pub filters: Vec<Filter>,
    pub prefixes: Prefixes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Select(SelectQuery),
    Construct(ConstructQuery),
    Describe(DescribeQuery),
}

impl Query {
    pub fn prefixes(&self) -> &Prefixes {
        match self {
            Query::Select(q) => &q.prefixes,
            Query::Construct(q) => &q.prefixes,
            Query::Describe(q) => &q.prefixes,
        }
    }
}

/// Serializes a [`Query`] back to SPARQL-subset text such that
/// `parse(&format(q)).unwrap()` reconstructs an equal AST. Used by the
/// round-trip property in spec.md §8; not used by the executor, which
/// only ever consumes an already-parsed `Query`.
pub fn format(query: &Query) -> String {
    let mut out = String::new();
    write_prefixes(&mut out, query.prefixes());
    match query {
        Query::Select(q) => write_select(&mut out, q),
        Query::Construct(q) => write_construct(&mut out, q),
        Query::Describe(q) => write_describe(&mut out, q),
    }
    out
}

fn write_prefixes(out: &mut String, prefixes: &Prefixes) {
    let mut names: Vec<&String> = prefixes.keys().collect();
    names.sort();
    for name in names {
        out.push_str(&format!("PREFIX {name}: <{}> ", prefixes[name]));
    }
}

fn write_pattern_list(out: &mut String, patterns: &[TriplePattern]) {
    for p in patterns {
        out.push_str(&format!("{} {} {} . ", p.s, p.p, p.o));
    }
}

fn write_group_body(out: &mut String, patterns: &[TriplePattern], optional: &[Vec<TriplePattern>], filters: &[Filter]) {
    out.push_str("{ ");
    write_pattern_list(out, patterns);
    for block in optional {
        out.push_str("OPTIONAL { ");
        write_pattern_list(out, block);
        out.push_str("} ");
    }
    for filter in filters {
        out.push_str(&format!("FILTER({}) ", filter.expression));
    }
    out.push('}');
}

fn write_select(out: &mut String, q: &SelectQuery) {
    out.push_str("SELECT ");
    if q.distinct {
        out.push_str("DISTINCT ");
    }
    if q.wildcard {
        out.push_str("* ");
    } else {
        for v in &q.variables {
            out.push_str(&format!("?{v} "));
        }
        for a in &q.aggregates {
            let distinct = if a.distinct { "DISTINCT " } else { "" };
            out.push_str(&format!("({}({distinct}?{}) AS ?{}) ", a.function, a.variable, a.alias));
        }
    }
    out.push_str("WHERE ");
    write_group_body(out, &q.where_clause, &q.optional, &q.filters);
    out.push(' ');
    if !q.group_by.is_empty() {
        out.push_str("GROUP BY ");
        for v in &q.group_by {
            out.push_str(&format!("?{v} "));
        }
    }
    if !q.having.is_empty() {
        // `parse_select_body` eats the `FILTER` keyword once before the
        // HAVING loop, so only the first clause carries it; the rest are
        // bare parenthesized expressions.
        out.push_str("HAVING FILTER");
        for h in &q.having {
            out.push_str(&format!("({}) ", h.expression));
        }
    }
    if !q.order_by.is_empty() {
        out.push_str("ORDER BY ");
        for o in &q.order_by {
            if o.descending {
                out.push_str(&format!("DESC(?{}) ", o.variable));
            } else {
                out.push_str(&format!("?{} ", o.variable));
            }
        }
    }
    if let Some(limit) = q.limit {
        out.push_str(&format!("LIMIT {limit} "));
    }
    if let Some(offset) = q.offset {
        out.push_str(&format!("OFFSET {offset} "));
    }
    truncate_trailing_space(out);
}

fn write_construct(out: &mut String, q: &ConstructQuery) {
    out.push_str("CONSTRUCT { ");
    write_pattern_list(out, &q.template);
    out.push_str("} WHERE ");
    write_group_body(out, &q.where_clause, &q.optional, &q.filters);
    truncate_trailing_space(out);
}

fn write_describe(out: &mut String, q: &DescribeQuery) {
    out.push_str("DESCRIBE ");
    for r in &q.resources {
        out.push_str(&format!("{r} "));
    }
    if let Some(where_clause) = &q.where_clause {
        out.push_str("WHERE ");
        write_group_body(out, where_clause, &q.optional, &q.filters);
    }
    truncate_trailing_space(out);
}

fn truncate_trailing_space(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}
