//! Property: `parse(format(ast)) == ast` for any `SelectQuery`/
//! `ConstructQuery`/`DescribeQuery` the formatter in `ast::format` can
//! emit. Built directly from AST constructors rather than random text,
//! since the property is about the formatter's output, not the
//! parser's acceptance of arbitrary text.

use std::collections::HashMap;

use lexigraph_query::{
    format, parse, AggregateExpression, AggregateFunction, ConstructQuery, DescribeQuery, Filter,
    OrderBy, Query, SelectQuery, TriplePattern,
};
use proptest::prelude::*;

fn var_name() -> impl Strategy<Value = String> {
    proptest::sample::select(vec!["a", "b", "article", "chapter", "x"]).prop_map(|s| s.to_string())
}

fn triple_pattern() -> impl Strategy<Value = TriplePattern> {
    (var_name(), var_name()).prop_map(|(s, o)| TriplePattern::new(format!("?{s}"), "rdf:type", format!("?{o}")))
}

fn filter_expr() -> impl Strategy<Value = Filter> {
    (var_name()).prop_map(|v| Filter::new(format!("?{v} > 10")))
}

fn select_query() -> impl Strategy<Value = SelectQuery> {
    (
        proptest::collection::vec(var_name(), 1..3),
        any::<bool>(),
        proptest::collection::vec(triple_pattern(), 1..3),
        proptest::collection::vec(filter_expr(), 0..2),
        proptest::option::of(1usize..100),
        proptest::option::of(0usize..10),
        any::<bool>(),
    )
        .prop_map(|(variables, distinct, where_clause, filters, limit, offset, order_desc)| {
            let order_by = vec![OrderBy {
                variable: variables[0].clone(),
                descending: order_desc,
            }];
            SelectQuery {
                variables,
                wildcard: false,
                aggregates: Vec::new(),
                group_by: Vec::new(),
                having: Vec::new(),
                distinct,
                where_clause,
                optional: Vec::new(),
                filters,
                order_by,
                limit,
                offset,
                prefixes: HashMap::new(),
            }
        })
}

proptest! {
    #[test]
    fn select_query_round_trips(q in select_query()) {
        let ast = Query::Select(q);
        let text = format(&ast);
        let reparsed = parse(&text).unwrap();
        prop_assert_eq!(ast, reparsed);
    }
}

#[test]
fn construct_query_round_trips() {
    let ast = Query::Construct(ConstructQuery {
        template: vec![TriplePattern::new("?a", "<reg:isArticle>", "<true>")],
        where_clause: vec![TriplePattern::new("?a", "rdf:type", "<reg:Article>")],
        optional: vec![vec![TriplePattern::new("?a", "<reg:title>", "?t")]],
        filters: vec![Filter::new("?a != <reg:none>")],
        prefixes: HashMap::new(),
    });
    let text = format(&ast);
    let reparsed = parse(&text).unwrap();
    assert_eq!(ast, reparsed);
}

#[test]
fn describe_query_round_trips_with_where_clause() {
    let ast = Query::Describe(DescribeQuery {
        resources: vec!["<GDPR:Art17>".to_string()],
        where_clause: Some(vec![TriplePattern::new("<GDPR:Art17>", "rdf:type", "?t")]),
        optional: Vec::new(),
        filters: Vec::new(),
        prefixes: HashMap::new(),
    });
    let text = format(&ast);
    let reparsed = parse(&text).unwrap();
    assert_eq!(ast, reparsed);
}

#[test]
fn describe_query_round_trips_without_where_clause() {
    let ast = Query::Describe(DescribeQuery {
        resources: vec!["<GDPR:Art17>".to_string(), "<GDPR:Art6>".to_string()],
        where_clause: None,
        optional: Vec::new(),
        filters: Vec::new(),
        prefixes: HashMap::new(),
    });
    let text = format(&ast);
    let reparsed = parse(&text).unwrap();
    assert_eq!(ast, reparsed);
}

#[test]
fn select_with_aggregates_and_group_by_round_trips() {
    let ast = Query::Select(SelectQuery {
        variables: Vec::new(),
        wildcard: false,
        aggregates: vec![AggregateExpression {
            function: AggregateFunction::Count,
            variable: "article".to_string(),
            alias: "count".to_string(),
            distinct: true,
        }],
        group_by: vec!["chapter".to_string()],
        having: vec![Filter::new("?count > 1"), Filter::new("?count < 100")],
        distinct: false,
        where_clause: vec![TriplePattern::new("?article", "<reg:partOf>", "?chapter")],
        optional: Vec::new(),
        filters: Vec::new(),
        order_by: vec![OrderBy {
            variable: "count".to_string(),
            descending: true,
        }],
        limit: Some(10),
        offset: None,
        prefixes: HashMap::new(),
    });
    let text = format(&ast);
    let reparsed = parse(&text).unwrap();
    assert_eq!(ast, reparsed);
}

#[test]
fn prefixed_query_round_trips() {
    let mut prefixes = HashMap::new();
    prefixes.insert("reg".to_string(), "http://example.org/reg#".to_string());
    let ast = Query::Select(SelectQuery {
        variables: vec!["a".to_string()],
        wildcard: false,
        aggregates: Vec::new(),
        group_by: Vec::new(),
        having: Vec::new(),
        distinct: true,
        where_clause: vec![TriplePattern::new("?a", "rdf:type", "reg:Article")],
        optional: Vec::new(),
        filters: Vec::new(),
        order_by: Vec::new(),
        limit: None,
        offset: None,
        prefixes,
    });
    let text = format(&ast);
    let reparsed = parse(&text).unwrap();
    assert_eq!(ast, reparsed);
}
