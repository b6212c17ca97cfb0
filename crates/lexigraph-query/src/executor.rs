//! Executes a [`Query`] against a [`TripleStore`].
//!
//! Grounded in the teacher's `DefaultSparqlEvaluator`/`Algebra` match in
//! `fukurow-sparql::evaluator`, but complete: the teacher's evaluator
//! left several arms (`Group`, `Extend`, full `OrderBy`) as `TODO` or
//! `unimplemented!`, and logged every step with `println!("DEBUG: ...")`.
//! Every operator spec.md §4.6 lists is implemented here, and logging
//! goes through `tracing` spans instead — the convention the teacher's
//! own `fukurow-engine`/`fukurow-cli` crates use.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::Itertools;
use lexigraph_core::{term, Error, Result, Triple};
use lexigraph_store::{IndexStats, TripleStore};

use crate::ast::{AggregateFunction, ConstructQuery, DescribeQuery, Query, SelectQuery, TriplePattern};
use crate::filter::{self, Binding};
use crate::parser;
use crate::planner;

/// Executor-wide options, per spec.md §6.4 — nothing else is
/// configurable, and there are no environment variables or files.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub planning: bool,
    /// `Duration::ZERO` disables the timeout.
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            planning: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A cooperative cancellation flag. Cloning shares the same underlying
/// flag; `cancel()` from any clone is visible to every checkpoint.
#[derive(Debug, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call execution context: an optional caller-supplied cancellation
/// token, checked alongside the executor's own timeout deadline.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub cancellation: Option<CancellationToken>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    // PartialEq is implemented manually below, comparing only the
    // counts — Duration fields make exact equality useless in tests.
    pub parse_time: Duration,
    pub plan_time: Duration,
    pub execute_time: Duration,
    pub total_time: Duration,
    pub patterns_count: usize,
    pub result_count: usize,
}

impl fmt::Display for QueryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} patterns, {} results in {:?} (parse {:?}, plan {:?}, execute {:?})",
            self.patterns_count, self.result_count, self.total_time, self.parse_time, self.plan_time, self.execute_time
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub variables: Vec<String>,
    pub bindings: Vec<Binding>,
    pub count: usize,
    pub metrics: QueryMetrics,
}

impl PartialEq for QueryMetrics {
    fn eq(&self, other: &Self) -> bool {
        self.patterns_count == other.patterns_count && self.result_count == other.result_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructResult {
    pub triples: Vec<Triple>,
    pub count: usize,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeResult {
    pub triples: Vec<Triple>,
    pub count: usize,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Select(QueryResult),
    Construct(ConstructResult),
    Describe(DescribeResult),
}

/// Runs SELECT / CONSTRUCT / DESCRIBE queries against a shared
/// [`TripleStore`].
pub struct Executor {
    store: Arc<TripleStore>,
    config: ExecutorConfig,
    stats: std::sync::RwLock<IndexStats>,
}

impl Executor {
    pub fn new(store: Arc<TripleStore>, config: ExecutorConfig) -> Self {
        let stats = store.stats();
        Executor {
            store,
            config,
            stats: std::sync::RwLock::new(stats),
        }
    }

    pub fn store(&self) -> &Arc<TripleStore> {
        &self.store
    }

    /// Re-snapshots `IndexStats` from the live store. Planning uses
    /// whatever snapshot was current when this was last called — a
    /// write to the store between calls affects efficiency, not
    /// correctness.
    pub fn refresh_stats(&self) {
        let fresh = self.store.stats();
        *self.stats.write().expect("executor stats lock poisoned") = fresh;
    }

    pub fn execute(&self, query: &Query) -> Result<ExecutionOutcome> {
        self.execute_with(&ExecutionContext::default(), query)
    }

    pub fn execute_string(&self, text: &str) -> Result<ExecutionOutcome> {
        let parse_start = Instant::now();
        let parsed = parser::parse(text)?;
        let parse_time = parse_start.elapsed();
        let (mut outcome, metrics_mut) = self.execute_with_timing(&ExecutionContext::default(), &parsed)?;
        add_parse_time(&mut outcome, parse_time);
        let _ = metrics_mut;
        Ok(outcome)
    }

    pub fn execute_with(&self, ctx: &ExecutionContext, query: &Query) -> Result<ExecutionOutcome> {
        let (outcome, _) = self.execute_with_timing(ctx, query)?;
        Ok(outcome)
    }

    pub fn execute_select(&self, query: &Query) -> Result<QueryResult> {
        match self.execute(query)? {
            ExecutionOutcome::Select(r) => Ok(r),
            _ => Err(Error::UnsupportedQueryType("execute_select called with a non-SELECT query".to_string())),
        }
    }

    pub fn execute_construct(&self, query: &Query) -> Result<ConstructResult> {
        match self.execute(query)? {
            ExecutionOutcome::Construct(r) => Ok(r),
            _ => Err(Error::UnsupportedQueryType("execute_construct called with a non-CONSTRUCT query".to_string())),
        }
    }

    pub fn execute_describe(&self, query: &Query) -> Result<DescribeResult> {
        match self.execute(query)? {
            ExecutionOutcome::Describe(r) => Ok(r),
            _ => Err(Error::UnsupportedQueryType("execute_describe called with a non-DESCRIBE query".to_string())),
        }
    }

    fn execute_with_timing(&self, ctx: &ExecutionContext, query: &Query) -> Result<(ExecutionOutcome, QueryMetrics)> {
        let total_start = Instant::now();
        let deadline = if self.config.timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + self.config.timeout)
        };
        let expanded = parser::expand_prefixes(query);

        let plan_start = Instant::now();
        let planned = if self.config.planning {
            let stats = self.stats.read().expect("executor stats lock poisoned").clone();
            planner::plan(&expanded, &stats)
        } else {
            expanded
        };
        let plan_time = plan_start.elapsed();

        let _span = tracing::debug_span!("execute").entered();
        let execute_start = Instant::now();
        let outcome = match &planned {
            Query::Select(q) => ExecutionOutcome::Select(self.run_select(q, ctx, deadline)?),
            Query::Construct(q) => ExecutionOutcome::Construct(self.run_construct(q, ctx, deadline)?),
            Query::Describe(q) => ExecutionOutcome::Describe(self.run_describe(q, ctx, deadline)?),
        };
        let execute_time = execute_start.elapsed();
        let total_time = total_start.elapsed();

        let mut metrics = QueryMetrics {
            parse_time: Duration::ZERO,
            plan_time,
            execute_time,
            total_time,
            patterns_count: patterns_count(&planned),
            result_count: result_count(&outcome),
        };
        let outcome = stamp_metrics(outcome, &mut metrics);
        Ok((outcome, metrics))
    }

    fn checkpoint(&self, ctx: &ExecutionContext, deadline: Option<Instant>) -> Result<()> {
        if let Some(token) = &ctx.cancellation {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(Error::Cancelled);
            }
        }
        Ok(())
    }

    fn run_select(&self, query: &SelectQuery, ctx: &ExecutionContext, deadline: Option<Instant>) -> Result<QueryResult> {
        let bindings = self.bind(&query.where_clause, &query.optional, &query.filters, ctx, deadline)?;

        let (output_bindings, output_variables) = if !query.aggregates.is_empty() {
            let rows = aggregate(&bindings, query);
            let rows = apply_having(rows, &query.having);
            let rows = order_by_aggregate(rows, &query.order_by);
            let vars = aggregate_output_variables(query);
            let rows = apply_distinct(rows, false, &vars);
            (rows, vars)
        } else {
            let mut rows = order_by_select(bindings, &query.order_by);
            rows = apply_distinct(rows, query.wildcard, &query.variables);
            let vars = select_output_variables(&rows, query.wildcard, &query.variables);
            (rows, vars)
        };

        let windowed = apply_offset_limit(output_bindings, query.offset, query.limit);
        let count = windowed.len();
        Ok(QueryResult {
            variables: output_variables,
            bindings: windowed,
            count,
            metrics: QueryMetrics::default(),
        })
    }

    fn run_construct(&self, query: &ConstructQuery, ctx: &ExecutionContext, deadline: Option<Instant>) -> Result<ConstructResult> {
        let bindings = self.bind(&query.where_clause, &query.optional, &query.filters, ctx, deadline)?;
        let mut triples: Vec<Triple> = Vec::new();
        let mut seen = HashSet::new();
        for binding in &bindings {
            for pattern in &query.template {
                let Some(triple) = instantiate(pattern, binding) else {
                    continue;
                };
                if seen.insert(triple.clone()) {
                    triples.push(triple);
                }
            }
        }
        let count = triples.len();
        Ok(ConstructResult {
            triples,
            count,
            metrics: QueryMetrics::default(),
        })
    }

    fn run_describe(&self, query: &DescribeQuery, ctx: &ExecutionContext, deadline: Option<Instant>) -> Result<DescribeResult> {
        let mut resources: Vec<String> = Vec::new();
        if let Some(where_clause) = &query.where_clause {
            let bindings = self.bind(where_clause, &query.optional, &query.filters, ctx, deadline)?;
            for resource in &query.resources {
                if let term::TermKind::Variable(v) = term::classify(resource) {
                    for binding in &bindings {
                        if let Some(value) = binding.get(&v) {
                            resources.push(value.clone());
                        }
                    }
                } else {
                    resources.push(resource.clone());
                }
            }
        } else {
            resources.extend(query.resources.iter().cloned());
        }
        resources = resources.into_iter().unique().collect();

        let mut triples: Vec<Triple> = Vec::new();
        let mut seen = HashSet::new();
        for resource in &resources {
            self.checkpoint(ctx, deadline)?;
            for triple in self.store.find(resource, "", "") {
                if seen.insert(triple.clone()) {
                    triples.push(triple);
                }
            }
            for triple in self.store.find("", "", resource) {
                if seen.insert(triple.clone()) {
                    triples.push(triple);
                }
            }
        }
        let count = triples.len();
        Ok(DescribeResult {
            triples,
            count,
            metrics: QueryMetrics::default(),
        })
    }

    /// Steps 2-5 of spec.md §4.6's main loop, shared by SELECT,
    /// CONSTRUCT, and DESCRIBE-with-WHERE: join the WHERE patterns,
    /// left-outer-join each OPTIONAL block, then apply FILTERs.
    fn bind(
        &self,
        where_clause: &[TriplePattern],
        optional: &[Vec<TriplePattern>],
        filters: &[crate::ast::Filter],
        ctx: &ExecutionContext,
        deadline: Option<Instant>,
    ) -> Result<Vec<Binding>> {
        let mut bindings = vec![Binding::new()];
        for pattern in where_clause {
            self.checkpoint(ctx, deadline)?;
            bindings = self.join_one(&bindings, pattern);
            if bindings.is_empty() {
                return Ok(bindings);
            }
        }

        for block in optional {
            self.checkpoint(ctx, deadline)?;
            let mut next = Vec::with_capacity(bindings.len());
            for b in &bindings {
                let extended = self.join_block(std::slice::from_ref(b), block);
                if extended.is_empty() {
                    next.push(b.clone());
                } else {
                    next.extend(extended);
                }
            }
            bindings = next;
        }

        Ok(bindings.into_iter().filter(|b| filter::evaluate_all(filters, b)).collect())
    }

    fn join_block(&self, start: &[Binding], block: &[TriplePattern]) -> Vec<Binding> {
        let mut bindings = start.to_vec();
        for pattern in block {
            bindings = self.join_one(&bindings, pattern);
            if bindings.is_empty() {
                break;
            }
        }
        bindings
    }

    fn join_one(&self, bindings: &[Binding], pattern: &TriplePattern) -> Vec<Binding> {
        let mut extended = Vec::new();
        for binding in bindings {
            let s = resolve(&pattern.s, binding);
            let p = resolve(&pattern.p, binding);
            let o = resolve(&pattern.o, binding);
            let matches = self.store.find(&s, &p, &o);
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!(pattern = ?pattern, matches = matches.len(), "joined pattern");
            }
            for triple in matches {
                if let Some(next) = extend(binding, pattern, &triple) {
                    extended.push(next);
                }
            }
        }
        extended
    }
}

/// Substitutes a bound variable with its value, leaves a constant term
/// as-is, and turns an unbound variable into the store's wildcard.
fn resolve(raw: &str, binding: &Binding) -> String {
    if let term::TermKind::Variable(name) = term::classify(raw) {
        binding.get(&name).cloned().unwrap_or_default()
    } else {
        raw.to_string()
    }
}

fn extend(binding: &Binding, pattern: &TriplePattern, triple: &Triple) -> Option<Binding> {
    let mut next = binding.clone();
    for (slot, value) in [
        (&pattern.s, &triple.subject),
        (&pattern.p, &triple.predicate),
        (&pattern.o, &triple.object),
    ] {
        if let term::TermKind::Variable(name) = term::classify(slot) {
            match next.get(&name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    next.insert(name, value.clone());
                }
            }
        }
    }
    Some(next)
}

fn instantiate(pattern: &TriplePattern, binding: &Binding) -> Option<Triple> {
    let s = resolve_required(&pattern.s, binding)?;
    let p = resolve_required(&pattern.p, binding)?;
    let o = resolve_required(&pattern.o, binding)?;
    Some(Triple::new(s, p, o))
}

fn resolve_required(raw: &str, binding: &Binding) -> Option<String> {
    if let term::TermKind::Variable(name) = term::classify(raw) {
        binding.get(&name).cloned()
    } else {
        Some(raw.to_string())
    }
}

fn apply_having(rows: Vec<Binding>, having: &[crate::ast::Filter]) -> Vec<Binding> {
    rows.into_iter().filter(|row| filter::evaluate_all(having, row)).collect()
}

/// SELECT path: lexicographic string comparison only, even when both
/// sides parse as integers. Preserves the reference's S3 behavior
/// (`17, 5, 6` for numbers stored as strings `{5,6,17}`) — deliberately
/// different from the aggregate path's numeric-aware compare below.
fn order_by_select(mut rows: Vec<Binding>, order_by: &[crate::ast::OrderBy]) -> Vec<Binding> {
    rows.sort_by(|a, b| {
        for ob in order_by {
            let av = a.get(&ob.variable).map(String::as_str).unwrap_or("");
            let bv = b.get(&ob.variable).map(String::as_str).unwrap_or("");
            let ord = av.cmp(bv);
            let ord = if ob.descending { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    rows
}

/// Aggregate path: numeric comparison when both sides parse as
/// integers, else lexicographic. Matches S5's `DESC(?count)` producing
/// `3, 2, 1` numerically.
fn order_by_aggregate(mut rows: Vec<Binding>, order_by: &[crate::ast::OrderBy]) -> Vec<Binding> {
    rows.sort_by(|a, b| {
        for ob in order_by {
            let av = a.get(&ob.variable).map(String::as_str).unwrap_or("");
            let bv = b.get(&ob.variable).map(String::as_str).unwrap_or("");
            let ord = match (parse_int(av), parse_int(bv)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => av.cmp(bv),
            };
            let ord = if ob.descending { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    rows
}

fn parse_int(raw: &str) -> Option<i64> {
    let unquoted = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(raw);
    unquoted.parse::<i64>().ok()
}

fn apply_distinct(rows: Vec<Binding>, wildcard: bool, variables: &[String]) -> Vec<Binding> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(projection_key(row, wildcard, variables)))
        .collect()
}

fn projection_key(row: &Binding, wildcard: bool, variables: &[String]) -> Vec<(String, String)> {
    if wildcard {
        let mut keys: Vec<(String, String)> = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        keys.sort();
        keys
    } else {
        variables
            .iter()
            .map(|v| (v.clone(), row.get(v).cloned().unwrap_or_default()))
            .collect()
    }
}

fn select_output_variables(rows: &[Binding], wildcard: bool, variables: &[String]) -> Vec<String> {
    if wildcard {
        let mut all: HashSet<String> = HashSet::new();
        for row in rows {
            all.extend(row.keys().cloned());
        }
        let mut vars: Vec<String> = all.into_iter().collect();
        vars.sort();
        vars
    } else {
        variables.to_vec()
    }
}

fn aggregate_output_variables(query: &SelectQuery) -> Vec<String> {
    let mut vars = query.group_by.clone();
    vars.extend(query.aggregates.iter().map(|a| a.alias.clone()));
    vars
}

fn apply_offset_limit(rows: Vec<Binding>, offset: Option<usize>, limit: Option<usize>) -> Vec<Binding> {
    let skipped: Vec<Binding> = match offset {
        Some(n) => rows.into_iter().skip(n).collect(),
        None => rows,
    };
    match limit {
        Some(n) => skipped.into_iter().take(n).collect(),
        None => skipped,
    }
}

fn aggregate(bindings: &[Binding], query: &SelectQuery) -> Vec<Binding> {
    let mut groups: HashMap<Vec<String>, Vec<&Binding>> = HashMap::new();
    for binding in bindings {
        let key: Vec<String> = query
            .group_by
            .iter()
            .map(|v| binding.get(v).cloned().unwrap_or_default())
            .collect();
        groups.entry(key).or_default().push(binding);
    }

    groups
        .into_iter()
        .map(|(key, rows)| {
            let mut out = Binding::new();
            for (var, value) in query.group_by.iter().zip(key.iter()) {
                out.insert(var.clone(), value.clone());
            }
            for agg in &query.aggregates {
                out.insert(agg.alias.clone(), evaluate_aggregate(agg, &rows));
            }
            out
        })
        .collect()
}

fn evaluate_aggregate(agg: &crate::ast::AggregateExpression, rows: &[&Binding]) -> String {
    let values: Vec<&str> = rows.iter().filter_map(|r| r.get(&agg.variable).map(String::as_str)).collect();
    match agg.function {
        AggregateFunction::Count => {
            if agg.distinct {
                values.iter().copied().unique().count().to_string()
            } else {
                values.len().to_string()
            }
        }
        AggregateFunction::Sum => {
            let sum: i64 = values.iter().map(|v| parse_int(v).unwrap_or(0)).sum();
            sum.to_string()
        }
        AggregateFunction::Avg => {
            if values.is_empty() {
                "0".to_string()
            } else {
                let sum: i64 = values.iter().map(|v| parse_int(v).unwrap_or(0)).sum();
                (sum / values.len() as i64).to_string()
            }
        }
        AggregateFunction::Min => numeric_or_lexicographic_extreme(&values, true),
        AggregateFunction::Max => numeric_or_lexicographic_extreme(&values, false),
    }
}

fn numeric_or_lexicographic_extreme(values: &[&str], min: bool) -> String {
    if values.is_empty() {
        return String::new();
    }
    let all_numeric = values.iter().all(|v| parse_int(v).is_some());
    if all_numeric {
        let nums: Vec<i64> = values.iter().map(|v| parse_int(v).unwrap()).collect();
        let extreme = if min { *nums.iter().min().unwrap() } else { *nums.iter().max().unwrap() };
        extreme.to_string()
    } else {
        let extreme = if min {
            values.iter().min()
        } else {
            values.iter().max()
        };
        extreme.unwrap_or(&"").to_string()
    }
}

fn patterns_count(query: &Query) -> usize {
    match query {
        Query::Select(q) => q.where_clause.len() + q.optional.iter().map(Vec::len).sum::<usize>(),
        Query::Construct(q) => q.where_clause.len() + q.optional.iter().map(Vec::len).sum::<usize>(),
        Query::Describe(q) => {
            q.where_clause.as_ref().map(Vec::len).unwrap_or(0) + q.optional.iter().map(Vec::len).sum::<usize>()
        }
    }
}

fn result_count(outcome: &ExecutionOutcome) -> usize {
    match outcome {
        ExecutionOutcome::Select(r) => r.count,
        ExecutionOutcome::Construct(r) => r.count,
        ExecutionOutcome::Describe(r) => r.count,
    }
}

fn stamp_metrics(outcome: ExecutionOutcome, metrics: &mut QueryMetrics) -> ExecutionOutcome {
    match outcome {
        ExecutionOutcome::Select(mut r) => {
            r.metrics = metrics.clone();
            ExecutionOutcome::Select(r)
        }
        ExecutionOutcome::Construct(mut r) => {
            r.metrics = metrics.clone();
            ExecutionOutcome::Construct(r)
        }
        ExecutionOutcome::Describe(mut r) => {
            r.metrics = metrics.clone();
            ExecutionOutcome::Describe(r)
        }
    }
}

fn add_parse_time(outcome: &mut ExecutionOutcome, parse_time: Duration) {
    match outcome {
        ExecutionOutcome::Select(r) => {
            r.metrics.parse_time = parse_time;
            r.metrics.total_time += parse_time;
        }
        ExecutionOutcome::Construct(r) => {
            r.metrics.parse_time = parse_time;
            r.metrics.total_time += parse_time;
        }
        ExecutionOutcome::Describe(r) => {
            r.metrics.parse_time = parse_time;
            r.metrics.total_time += parse_time;
        }
    }
}
