//! Converts SPARQL-subset query text into a [`Query`] AST.
//!
//! The teacher's `fukurow-sparql` crate wires up `winnow` combinators and
//! a `logos` token enum as infrastructure, but its shipped
//! `DefaultSparqlParser::parse` never actually calls them — it is a
//! hand-rolled line scanner underneath. This parser follows the winnow
//! half through: keyword recognition is a combinator (`literal` over
//! `Caseless`), and the surrounding cursor is the same "function over
//! `&mut &str`" shape winnow parsers use, so the lexing rules below read
//! the way a combinator grammar would even where balanced-brace/paren
//! counting is easiest to just write by hand.

use std::collections::HashMap;

use lexigraph_core::{term, Error, Result};
use winnow::ascii::Caseless;
use winnow::token::literal;
use winnow::Parser;

use crate::ast::{
    AggregateExpression, AggregateFunction, ConstructQuery, DescribeQuery, Filter, OrderBy,
    Prefixes, Query, SelectQuery, TriplePattern,
};

/// Parses a full query string.
pub fn parse(text: &str) -> Result<Query> {
    let mut sc = Scanner::new(text);
    if sc.is_empty() {
        return Err(Error::ParseError("empty query".to_string()));
    }

    let prefixes = parse_prefixes(&mut sc)?;

    if sc.eat_keyword("SELECT") {
        parse_select_body(&mut sc, prefixes).map(Query::Select)
    } else if sc.eat_keyword("CONSTRUCT") {
        parse_construct_body(&mut sc, prefixes).map(Query::Construct)
    } else if sc.eat_keyword("DESCRIBE") {
        parse_describe_body(&mut sc, prefixes).map(Query::Describe)
    } else {
        let word = sc.read_word().unwrap_or("").to_string();
        Err(Error::ParseError(format!("unsupported query type: {word}")))
    }
}

/// Replaces every `prefix:local` term throughout `query` with its
/// expanded `<base+local>` form. Idempotent: variables, URIs, literals,
/// and bare words (already expanded or never prefixed) pass through
/// unchanged, so running this twice is a no-op the second time.
pub fn expand_prefixes(query: &Query) -> Query {
    match query {
        Query::Select(q) => {
            let mut q = q.clone();
            q.where_clause = expand_patterns(&q.where_clause, &q.prefixes);
            q.optional = q
                .optional
                .iter()
                .map(|block| expand_patterns(block, &q.prefixes))
                .collect();
            Query::Select(q)
        }
        Query::Construct(q) => {
            let mut q = q.clone();
            q.template = expand_patterns(&q.template, &q.prefixes);
            q.where_clause = expand_patterns(&q.where_clause, &q.prefixes);
            q.optional = q
                .optional
                .iter()
                .map(|block| expand_patterns(block, &q.prefixes))
                .collect();
            Query::Construct(q)
        }
        Query::Describe(q) => {
            let mut q = q.clone();
            q.resources = q
                .resources
                .iter()
                .map(|r| expand_term(r, &q.prefixes))
                .collect();
            q.where_clause = q
                .where_clause
                .as_ref()
                .map(|patterns| expand_patterns(patterns, &q.prefixes));
            q.optional = q
                .optional
                .iter()
                .map(|block| expand_patterns(block, &q.prefixes))
                .collect();
            Query::Describe(q)
        }
    }
}

fn expand_patterns(patterns: &[TriplePattern], prefixes: &Prefixes) -> Vec<TriplePattern> {
    patterns
        .iter()
        .map(|t| {
            TriplePattern::new(
                expand_term(&t.s, prefixes),
                expand_term(&t.p, prefixes),
                expand_term(&t.o, prefixes),
            )
        })
        .collect()
}

fn expand_term(raw: &str, prefixes: &Prefixes) -> String {
    if let term::TermKind::Prefixed(prefix, local) = term::classify(raw) {
        if let Some(base) = prefixes.get(&prefix) {
            return format!("<{base}{local}>");
        }
    }
    raw.to_string()
}

/// Checks a parsed query's invariants and returns every violation found
/// (never just the first). Not called by `execute`; callers opt in.
pub fn validate(query: &Query) -> Vec<String> {
    let mut errors = Vec::new();
    match query {
        Query::Select(q) => {
            let bound = bound_variables(&q.where_clause, &q.optional);
            if !q.wildcard {
                for v in &q.variables {
                    if !q.aggregates.is_empty() {
                        if !q.group_by.contains(v) {
                            errors.push(format!("projected variable ?{v} is not in GROUP BY"));
                        }
                    } else if !bound.contains(v.as_str()) {
                        errors.push(format!("projected variable ?{v} is never bound"));
                    }
                }
            }
            for agg in &q.aggregates {
                if !bound.contains(agg.variable.as_str()) {
                    errors.push(format!(
                        "aggregate source variable ?{} is never bound",
                        agg.variable
                    ));
                }
            }
            let alias_or_group: Vec<&str> = q
                .group_by
                .iter()
                .map(String::as_str)
                .chain(q.aggregates.iter().map(|a| a.alias.as_str()))
                .collect();
            for ob in &q.order_by {
                let ok = if q.aggregates.is_empty() {
                    q.variables.contains(&ob.variable) || q.wildcard
                } else {
                    alias_or_group.contains(&ob.variable.as_str())
                };
                if !ok {
                    errors.push(format!("ORDER BY variable ?{} is not projected", ob.variable));
                }
            }
        }
        Query::Construct(q) => {
            let bound = bound_variables(&q.where_clause, &q.optional);
            for t in &q.template {
                for slot in [&t.s, &t.p, &t.o] {
                    if let term::TermKind::Variable(v) = term::classify(slot) {
                        if !bound.contains(v.as_str()) {
                            errors.push(format!("template variable ?{v} is never bound"));
                        }
                    }
                }
            }
        }
        Query::Describe(q) => {
            if let Some(where_clause) = &q.where_clause {
                let bound = bound_variables(where_clause, &q.optional);
                for r in &q.resources {
                    if let term::TermKind::Variable(v) = term::classify(r) {
                        if !bound.contains(v.as_str()) {
                            errors.push(format!("DESCRIBE resource ?{v} is never bound"));
                        }
                    }
                }
            }
        }
    }
    errors
}

fn bound_variables(where_clause: &[TriplePattern], optional: &[Vec<TriplePattern>]) -> std::collections::HashSet<String> {
    let mut vars = std::collections::HashSet::new();
    let mut collect = |patterns: &[TriplePattern]| {
        for t in patterns {
            for slot in [&t.s, &t.p, &t.o] {
                if let term::TermKind::Variable(v) = term::classify(slot) {
                    vars.insert(v);
                }
            }
        }
    };
    collect(where_clause);
    for block in optional {
        collect(block);
    }
    vars
}

fn parse_prefixes(sc: &mut Scanner) -> Result<Prefixes> {
    let mut prefixes = HashMap::new();
    while sc.eat_keyword("PREFIX") {
        let name = sc
            .read_word()
            .ok_or_else(|| Error::ParseError("expected prefix name after PREFIX".to_string()))?;
        let name = name.strip_suffix(':').unwrap_or(name).to_string();
        let iri = sc
            .read_word()
            .ok_or_else(|| Error::ParseError("expected IRI after PREFIX name".to_string()))?;
        let base = iri
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(|| Error::ParseError(format!("malformed PREFIX IRI: {iri}")))?;
        prefixes.insert(name, base.to_string());
    }
    Ok(prefixes)
}

fn parse_select_body(sc: &mut Scanner, prefixes: Prefixes) -> Result<SelectQuery> {
    let mut query = SelectQuery {
        prefixes,
        ..Default::default()
    };

    if sc.eat_keyword("DISTINCT") {
        query.distinct = true;
    }

    if sc.eat_char('*') {
        query.wildcard = true;
    } else {
        loop {
            if sc.eat_char('(') {
                let func_name = sc
                    .read_word()
                    .ok_or_else(|| Error::ParseError("expected aggregate function name".to_string()))?;
                let function = AggregateFunction::from_name(func_name)
                    .ok_or_else(|| Error::ParseError(format!("unknown aggregate function: {func_name}")))?;
                if !sc.eat_char('(') {
                    return Err(Error::ParseError("expected '(' after aggregate function".to_string()));
                }
                let distinct = sc.eat_keyword("DISTINCT");
                let variable = sc
                    .read_word()
                    .and_then(strip_variable)
                    .ok_or_else(|| Error::ParseError("expected variable in aggregate".to_string()))?;
                if !sc.eat_char(')') {
                    return Err(Error::ParseError("expected ')' closing aggregate argument".to_string()));
                }
                if !sc.eat_keyword("AS") {
                    return Err(Error::ParseError("expected AS in aggregate expression".to_string()));
                }
                let alias = sc
                    .read_word()
                    .and_then(strip_variable)
                    .ok_or_else(|| Error::ParseError("expected alias variable after AS".to_string()))?;
                if !sc.eat_char(')') {
                    return Err(Error::ParseError("expected ')' closing aggregate expression".to_string()));
                }
                query.aggregates.push(AggregateExpression {
                    function,
                    variable,
                    alias,
                    distinct,
                });
            } else {
                let var = sc
                    .read_word()
                    .and_then(strip_variable)
                    .ok_or_else(|| Error::ParseError("expected projected variable".to_string()))?;
                query.variables.push(var);
            }

            if sc.peek_keyword("WHERE") || sc.is_empty() {
                break;
            }
        }
    }

    if !sc.eat_keyword("WHERE") {
        return Err(Error::ParseError("missing WHERE".to_string()));
    }
    let group = parse_group(sc)?;
    query.where_clause = group.patterns;
    query.optional = group.optional;
    query.filters = group.filters;

    if sc.eat_keyword("GROUP") {
        if !sc.eat_keyword("BY") {
            return Err(Error::ParseError("expected BY after GROUP".to_string()));
        }
        while let Some(var) = sc.try_read_variable() {
            query.group_by.push(var);
        }
    }

    if sc.eat_keyword("HAVING") {
        sc.eat_keyword("FILTER");
        while let Some(expr) = sc.read_balanced_parens() {
            query.having.push(Filter::new(expr));
        }
    }

    if sc.eat_keyword("ORDER") {
        if !sc.eat_keyword("BY") {
            return Err(Error::ParseError("expected BY after ORDER".to_string()));
        }
        loop {
            if sc.is_empty() || sc.peek_keyword("LIMIT") || sc.peek_keyword("OFFSET") {
                break;
            }
            let descending = if sc.eat_keyword("DESC") {
                true
            } else {
                sc.eat_keyword("ASC");
                false
            };
            if sc.peek_char() == Some('(') {
                sc.eat_char('(');
                let var = sc
                    .try_read_variable()
                    .ok_or_else(|| Error::ParseError("expected variable in ORDER BY".to_string()))?;
                if !sc.eat_char(')') {
                    return Err(Error::ParseError("expected ')' closing ORDER BY term".to_string()));
                }
                query.order_by.push(OrderBy { variable: var, descending });
            } else if let Some(var) = sc.try_read_variable() {
                query.order_by.push(OrderBy { variable: var, descending });
            } else {
                break;
            }
        }
    }

    finish_limit_offset(sc, query)
}

/// `[Limit] [Offset]` — fixed order per the grammar, so two sequential
/// checks are enough; no need to loop.
fn finish_limit_offset(sc: &mut Scanner, mut query: SelectQuery) -> Result<SelectQuery> {
    if sc.eat_keyword("LIMIT") {
        let n = sc
            .read_word()
            .and_then(|w| w.parse::<usize>().ok())
            .ok_or_else(|| Error::ParseError("expected non-negative integer after LIMIT".to_string()))?;
        query.limit = Some(n);
    }
    if sc.eat_keyword("OFFSET") {
        let n = sc
            .read_word()
            .and_then(|w| w.parse::<usize>().ok())
            .ok_or_else(|| Error::ParseError("expected non-negative integer after OFFSET".to_string()))?;
        query.offset = Some(n);
    }
    Ok(query)
}

fn parse_construct_body(sc: &mut Scanner, prefixes: Prefixes) -> Result<ConstructQuery> {
    if !sc.eat_char('{') {
        return Err(Error::ParseError("expected '{' opening CONSTRUCT template".to_string()));
    }
    let template = parse_pattern_list(sc)?;
    if !sc.eat_char('}') {
        return Err(Error::ParseError("unbalanced braces in CONSTRUCT template".to_string()));
    }
    if !sc.eat_keyword("WHERE") {
        return Err(Error::ParseError("missing WHERE".to_string()));
    }
    let group = parse_group(sc)?;
    Ok(ConstructQuery {
        template,
        where_clause: group.patterns,
        optional: group.optional,
        filters: group.filters,
        prefixes,
    })
}

fn parse_describe_body(sc: &mut Scanner, prefixes: Prefixes) -> Result<DescribeQuery> {
    let mut resources = Vec::new();
    loop {
        if sc.peek_keyword("WHERE") || sc.is_empty() {
            break;
        }
        let term = sc
            .read_word()
            .ok_or_else(|| Error::ParseError("expected DESCRIBE resource".to_string()))?;
        resources.push(term.to_string());
    }
    if resources.is_empty() {
        return Err(Error::ParseError("DESCRIBE requires at least one resource".to_string()));
    }
    let mut where_clause = None;
    let mut optional = Vec::new();
    let mut filters = Vec::new();
    if sc.eat_keyword("WHERE") {
        let group = parse_group(sc)?;
        where_clause = Some(group.patterns);
        optional = group.optional;
        filters = group.filters;
    }
    Ok(DescribeQuery {
        resources,
        where_clause,
        optional,
        filters,
        prefixes,
    })
}

struct GroupContents {
    patterns: Vec<TriplePattern>,
    optional: Vec<Vec<TriplePattern>>,
    filters: Vec<Filter>,
}

/// `Group := { Triple "." | Optional | Filter }`
fn parse_group(sc: &mut Scanner) -> Result<GroupContents> {
    if !sc.eat_char('{') {
        return Err(Error::ParseError("expected '{' opening group".to_string()));
    }
    let mut patterns = Vec::new();
    let mut optional = Vec::new();
    let mut filters = Vec::new();
    loop {
        if sc.eat_char('}') {
            break;
        }
        if sc.is_empty() {
            return Err(Error::ParseError("unbalanced braces: missing '}'".to_string()));
        }
        if sc.eat_keyword("OPTIONAL") {
            if !sc.eat_char('{') {
                return Err(Error::ParseError("expected '{' opening OPTIONAL".to_string()));
            }
            let block = parse_pattern_list(sc)?;
            if !sc.eat_char('}') {
                return Err(Error::ParseError("unbalanced braces in OPTIONAL".to_string()));
            }
            optional.push(block);
        } else if sc.eat_keyword("FILTER") {
            let expr = sc
                .read_balanced_parens()
                .ok_or_else(|| Error::ParseError("expected '(' after FILTER".to_string()))?;
            filters.push(Filter::new(expr));
        } else {
            patterns.extend(parse_triple_pattern(sc)?);
            sc.eat_char('.');
        }
    }
    Ok(GroupContents {
        patterns,
        optional,
        filters,
    })
}

fn parse_pattern_list(sc: &mut Scanner) -> Result<Vec<TriplePattern>> {
    let mut patterns = Vec::new();
    loop {
        if sc.peek_char() == Some('}') || sc.is_empty() {
            break;
        }
        patterns.extend(parse_triple_pattern(sc)?);
        sc.eat_char('.');
    }
    Ok(patterns)
}

/// `Triple := Term Term Term { ";" Term Term }` — the semicolon reuses
/// the first triple's subject for each additional predicate/object pair.
fn parse_triple_pattern(sc: &mut Scanner) -> Result<Vec<TriplePattern>> {
    let subject = parse_term(sc)?;
    let predicate = parse_term(sc)?;
    let object = parse_term(sc)?;
    let mut out = vec![TriplePattern::new(subject.clone(), predicate, object)];
    while sc.eat_char(';') {
        let predicate = parse_term(sc)?;
        let object = parse_term(sc)?;
        out.push(TriplePattern::new(subject.clone(), predicate, object));
    }
    Ok(out)
}

fn parse_term(sc: &mut Scanner) -> Result<String> {
    let word = sc
        .read_word()
        .ok_or_else(|| Error::ParseError("expected term".to_string()))?;
    if word == "a" {
        Ok("rdf:type".to_string())
    } else {
        Ok(word.to_string())
    }
}

fn strip_variable(word: &str) -> Option<String> {
    word.strip_prefix('?').map(|s| s.to_string())
}

/// A cursor over raw query text. Methods never leave `rest` partially
/// advanced on failure.
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner { rest: src }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn is_empty(&mut self) -> bool {
        self.skip_ws();
        self.rest.is_empty()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest.chars().next()
    }

    fn eat_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest.starts_with(c) {
            self.rest = &self.rest[c.len_utf8()..];
            true
        } else {
            false
        }
    }

    /// Matches `kw` case-insensitively as a whole word, consuming it on
    /// success. Uses `winnow`'s `literal`/`Caseless` combinator for the
    /// match itself; the surrounding word-boundary check and rollback
    /// are plain control flow since winnow has no notion of "this
    /// language's identifier boundary".
    fn eat_keyword(&mut self, kw: &'static str) -> bool {
        self.skip_ws();
        let saved = self.rest;
        let mut input = self.rest;
        if literal(Caseless(kw)).parse_next(&mut input).is_ok() {
            if input.chars().next().map_or(true, |c| !is_word_char(c)) {
                self.rest = input;
                return true;
            }
        }
        self.rest = saved;
        false
    }

    fn peek_keyword(&mut self, kw: &'static str) -> bool {
        let saved = self.rest;
        let matched = self.eat_keyword(kw);
        self.rest = saved;
        matched
    }

    fn try_read_variable(&mut self) -> Option<String> {
        self.skip_ws();
        if !self.rest.starts_with('?') {
            return None;
        }
        self.read_word().and_then(strip_variable)
    }

    /// Reads one lexical word: an angle-bracketed IRI, a quoted literal,
    /// or an unbroken run of non-structural characters (variables,
    /// prefixed names, bare words).
    fn read_word(&mut self) -> Option<&'a str> {
        self.skip_ws();
        if self.rest.is_empty() {
            return None;
        }
        let first = self.rest.chars().next()?;
        let end = match first {
            '<' => find_closing(self.rest, '>')?,
            '"' => find_closing(self.rest, '"')?,
            _ => {
                let mut end = 0;
                for (i, c) in self.rest.char_indices() {
                    if is_structural(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                }
                if end == 0 {
                    return None;
                }
                end
            }
        };
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Reads a parenthesized span starting at the current `(`, honoring
    /// nesting and treating anything inside `"..."` as opaque, returning
    /// the content with the outer parens stripped.
    fn read_balanced_parens(&mut self) -> Option<&'a str> {
        self.skip_ws();
        if !self.rest.starts_with('(') {
            return None;
        }
        let mut depth = 0i32;
        let mut in_str = false;
        let mut end = None;
        for (i, c) in self.rest.char_indices() {
            match c {
                '"' => in_str = !in_str,
                '(' if !in_str => depth += 1,
                ')' if !in_str => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end?;
        let full = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(&full[1..full.len() - 1])
    }
}

fn find_closing(s: &str, close: char) -> Option<usize> {
    let mut chars = s.char_indices();
    chars.next()?; // skip the opening delimiter itself
    for (i, c) in chars {
        if c == close {
            return Some(i + c.len_utf8());
        }
    }
    None
}

fn is_structural(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '.' | ';' | ',')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let q = parse("SELECT ?a WHERE { ?a rdf:type reg:Article . }").unwrap();
        match q {
            Query::Select(s) => {
                assert_eq!(s.variables, vec!["a".to_string()]);
                assert_eq!(s.where_clause.len(), 1);
                assert_eq!(s.where_clause[0], TriplePattern::new("?a", "rdf:type", "reg:Article"));
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_rdf_type_shorthand() {
        let q = parse("SELECT ?a WHERE { ?a a reg:Article . }").unwrap();
        match q {
            Query::Select(s) => assert_eq!(s.where_clause[0].p, "rdf:type"),
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_prefix_and_distinct() {
        let q = parse(
            "PREFIX reg: <http://example.org/reg#> SELECT DISTINCT ?c WHERE { ?a reg:partOf ?c . }",
        )
        .unwrap();
        match q {
            Query::Select(s) => {
                assert!(s.distinct);
                assert_eq!(s.prefixes.get("reg").map(String::as_str), Some("http://example.org/reg#"));
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_filter_with_nested_parens() {
        let q = parse(
            r#"SELECT ?a ?t WHERE { ?a rdf:type reg:Article . ?a reg:title ?t . FILTER(CONTAINS(?t, "erasure")) }"#,
        )
        .unwrap();
        match q {
            Query::Select(s) => {
                assert_eq!(s.filters.len(), 1);
                assert_eq!(s.filters[0].expression, r#"CONTAINS(?t, "erasure")"#);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_optional_block() {
        let q = parse("SELECT ?a ?t WHERE { ?a rdf:type reg:Article . OPTIONAL { ?a reg:title ?t . } }").unwrap();
        match q {
            Query::Select(s) => assert_eq!(s.optional.len(), 1),
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_aggregate_with_group_by_and_order_by() {
        let q = parse(
            "SELECT ?chapter (COUNT(?article) AS ?count) WHERE { ?article rdf:type reg:Article . ?article reg:partOf ?chapter . } GROUP BY ?chapter ORDER BY DESC(?count)",
        )
        .unwrap();
        match q {
            Query::Select(s) => {
                assert_eq!(s.aggregates.len(), 1);
                assert_eq!(s.aggregates[0].function, AggregateFunction::Count);
                assert_eq!(s.aggregates[0].alias, "count");
                assert_eq!(s.group_by, vec!["chapter".to_string()]);
                assert_eq!(s.order_by[0].variable, "count");
                assert!(s.order_by[0].descending);
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_limit_and_offset() {
        let q = parse("SELECT ?a WHERE { ?a rdf:type reg:Article . } LIMIT 5 OFFSET 2").unwrap();
        match q {
            Query::Select(s) => {
                assert_eq!(s.limit, Some(5));
                assert_eq!(s.offset, Some(2));
            }
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn parses_construct() {
        let q = parse(
            "CONSTRUCT { ?a rdf:type reg:Article . } WHERE { ?a rdf:type reg:Article . }",
        )
        .unwrap();
        match q {
            Query::Construct(c) => assert_eq!(c.template.len(), 1),
            _ => panic!("expected CONSTRUCT"),
        }
    }

    #[test]
    fn parses_describe_without_where() {
        let q = parse("DESCRIBE <http://example.org/reg#Art6>").unwrap();
        match q {
            Query::Describe(d) => {
                assert_eq!(d.resources, vec!["<http://example.org/reg#Art6>".to_string()]);
                assert!(d.where_clause.is_none());
            }
            _ => panic!("expected DESCRIBE"),
        }
    }

    #[test]
    fn rejects_unsupported_query_type() {
        let err = parse("INSERT DATA { ?a ?b ?c }").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn rejects_empty_query() {
        let err = parse("   ").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn expand_prefixes_is_idempotent() {
        let q = parse(
            "PREFIX reg: <http://example.org/reg#> SELECT ?a WHERE { ?a rdf:type reg:Article . }",
        )
        .unwrap();
        let once = expand_prefixes(&q);
        let twice = expand_prefixes(&once);
        assert_eq!(once, twice);
        if let Query::Select(s) = &once {
            assert_eq!(s.where_clause[0].o, "<http://example.org/reg#Article>");
        }
    }

    #[test]
    fn validate_flags_unbound_projection() {
        let q = parse("SELECT ?missing WHERE { ?a rdf:type reg:Article . }").unwrap();
        let errors = validate(&q);
        assert!(!errors.is_empty());
    }

    #[test]
    fn validate_accepts_well_formed_query() {
        let q = parse("SELECT ?a WHERE { ?a rdf:type reg:Article . }").unwrap();
        assert!(validate(&q).is_empty());
    }
}
