// query.rs - Filter expressions: parsed once into a predicate tree, evaluated per document

use std::cmp::Ordering;

use crate::document::Document;
use crate::scan;

/// A parsed filter expression.
///
/// Parsing is tolerant and infallible: text the grammar cannot make sense of
/// collapses into either [`Filter::MatchAll`] (nothing recognizable to
/// require) or [`Filter::MatchNone`] (a requirement that cannot hold), never
/// an error. `{}` and the empty string match every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    MatchAll,
    MatchNone,
    /// Implicit AND over field predicates: `{"name":"Alice","age":"25"}`.
    Fields(Vec<FieldPredicate>),
    /// `{"$or":[ ... ]}` — at least one sub-filter must hold.
    Or(Vec<Filter>),
    /// `{"$and":[ ... ]}` — every sub-filter must hold.
    And(Vec<Filter>),
}

/// One `"field": condition` pair inside an implicit-AND object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: String,
    pub condition: Condition,
}

/// The right-hand side of a field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Bare scalar: equality with the integer refinement.
    Equals(String),
    /// Operator object: every clause must hold.
    Operators(Vec<OperatorClause>),
    /// An object carrying no recognized operator. Documented behaviour:
    /// matches nothing.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorClause {
    Eq(String),
    Gt(String),
    Lt(String),
    Like(String),
    In(Vec<String>),
}

impl Filter {
    /// Builds the predicate tree from filter text.
    ///
    /// Only the *first* top-level key can select a `$or`/`$and` combinator;
    /// a combinator key appearing later is an ordinary field name. Sub-filters
    /// inside a combinator array are always implicit-AND objects — a nested
    /// combinator key inside one is a field name there too.
    pub fn parse(text: &str) -> Filter {
        let query = scan::trim(text);
        if query.is_empty() || query == "{}" {
            return Filter::MatchAll;
        }

        if query.starts_with('{') {
            if let Some((first_key, after_key)) = first_object_key(query) {
                if first_key == "$or" {
                    return parse_combinator(query, after_key, true);
                }
                if first_key == "$and" {
                    return parse_combinator(query, after_key, false);
                }
            }
        }

        parse_field_object(query)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::MatchNone => false,
            Filter::Fields(predicates) => predicates.iter().all(|p| p.matches(doc)),
            Filter::Or(subs) => subs.iter().any(|f| f.matches(doc)),
            Filter::And(subs) => subs.iter().all(|f| f.matches(doc)),
        }
    }
}

impl FieldPredicate {
    fn matches(&self, doc: &Document) -> bool {
        // _id is a pseudo-field resolving to the document id
        let raw = if self.field == "_id" {
            Some(doc.id())
        } else {
            doc.get_field(&self.field)
        };
        let value = match raw {
            Some(v) => scan::trim(v),
            // absent field: the predicate (and hence the AND) fails
            None => return false,
        };
        self.condition.matches(value)
    }
}

impl Condition {
    fn matches(&self, value: &str) -> bool {
        match self {
            Condition::Equals(expected) => scan::values_equal(value, expected),
            Condition::Operators(clauses) => clauses.iter().all(|c| c.matches(value)),
            Condition::Unsupported => false,
        }
    }

    fn parse(raw: &str) -> Condition {
        let t = scan::trim(raw);
        if !t.starts_with('{') {
            // bare scalar (possibly quoted): implicit equality
            return Condition::Equals(scan::unquote(t).to_string());
        }

        let content = strip_outer_braces(t);
        let pairs = match scan::object_pairs(content) {
            Some(pairs) => pairs,
            None => return Condition::Unsupported,
        };

        let mut clauses = Vec::new();
        for (key, raw_value) in pairs {
            match key.as_str() {
                "$eq" | "$gt" | "$lt" | "$like" => {
                    let scalar = scan::unquote(&raw_value).to_string();
                    // an operator whose value is empty counts as absent
                    if scalar.is_empty() {
                        continue;
                    }
                    clauses.push(match key.as_str() {
                        "$eq" => OperatorClause::Eq(scalar),
                        "$gt" => OperatorClause::Gt(scalar),
                        "$lt" => OperatorClause::Lt(scalar),
                        _ => OperatorClause::Like(scalar),
                    });
                }
                "$in" => {
                    let array = scan::trim(&raw_value);
                    if !(array.starts_with('[') && array.ends_with(']')) {
                        // $in without an array can never be satisfied
                        return Condition::Unsupported;
                    }
                    let inner = &array[1..array.len() - 1];
                    let items = if inner.is_empty() {
                        Vec::new()
                    } else {
                        inner
                            .split(',')
                            .map(|item| scan::unquote(item).to_string())
                            .collect()
                    };
                    clauses.push(OperatorClause::In(items));
                }
                // unrecognized keys are ignored
                _ => {}
            }
        }

        if clauses.is_empty() {
            Condition::Unsupported
        } else {
            Condition::Operators(clauses)
        }
    }
}

impl OperatorClause {
    fn matches(&self, value: &str) -> bool {
        match self {
            OperatorClause::Eq(rhs) => scan::values_equal(value, rhs),
            OperatorClause::Gt(rhs) => scan::values_cmp(value, rhs) == Ordering::Greater,
            OperatorClause::Lt(rhs) => scan::values_cmp(value, rhs) == Ordering::Less,
            OperatorClause::Like(pattern) => scan::like_match(value, pattern),
            OperatorClause::In(items) => items.iter().any(|item| scan::values_equal(value, item)),
        }
    }
}

/// First top-level key of an object and the byte index just past its closing
/// quote.
fn first_object_key(query: &str) -> Option<(&str, usize)> {
    let bytes = query.as_bytes();
    let open = scan::find_from(bytes, 0, b'"')?;
    let close = scan::find_from(bytes, open + 1, b'"')?;
    Some((&query[open + 1..close], close + 1))
}

fn strip_outer_braces(t: &str) -> &str {
    let content = t.strip_prefix('{').unwrap_or(t);
    content.strip_suffix('}').unwrap_or(content)
}

/// Implicit-AND object over field predicates.
fn parse_field_object(query: &str) -> Filter {
    let content = if query.starts_with('{') {
        strip_outer_braces(query)
    } else {
        query
    };
    match scan::object_pairs(content) {
        None => Filter::MatchNone,
        Some(pairs) if pairs.is_empty() => Filter::MatchAll,
        Some(pairs) => Filter::Fields(
            pairs
                .into_iter()
                .map(|(field, raw_value)| FieldPredicate {
                    field,
                    condition: Condition::parse(&raw_value),
                })
                .collect(),
        ),
    }
}

/// `{"$or":[...]}` / `{"$and":[...]}`. The array is delimited by bracket
/// matching; each element is one brace-matched sub-object. An empty or
/// missing array matches nothing.
fn parse_combinator(query: &str, after_key: usize, is_or: bool) -> Filter {
    let bytes = query.as_bytes();

    let colon = match scan::find_from(bytes, after_key, b':') {
        Some(index) => index,
        None => return Filter::MatchNone,
    };
    let mut open = colon + 1;
    while open < bytes.len() && matches!(bytes[open], b' ' | b'\t' | b'\n' | b'\r') {
        open += 1;
    }
    if open >= bytes.len() || bytes[open] != b'[' {
        return Filter::MatchNone;
    }
    let close = match scan::find_matching(query, open) {
        Some(index) => index,
        None => return Filter::MatchNone,
    };
    let array_content = &query[open + 1..close];

    let mut subs = Vec::new();
    let inner = array_content.as_bytes();
    let mut pos = 0usize;
    while pos < inner.len() {
        let start = match scan::find_from(inner, pos, b'{') {
            Some(index) => index,
            None => break,
        };
        let end = match scan::find_matching(array_content, start) {
            Some(index) => index,
            None => return Filter::MatchNone,
        };
        subs.push(parse_field_object(scan::trim(&array_content[start..=end])));
        pos = end + 1;
    }

    if subs.is_empty() {
        Filter::MatchNone
    } else if is_or {
        Filter::Or(subs)
    } else {
        Filter::And(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, &str)]) -> Document {
        let mut d = Document::new("1");
        for (k, v) in pairs {
            d.add_field(k, *v);
        }
        d
    }

    fn matches(filter: &str, pairs: &[(&str, &str)]) -> bool {
        Filter::parse(filter).matches(&doc(pairs))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches("", &[("a", "b")]));
        assert!(matches("{}", &[]));
        assert!(matches("  { }  ", &[("a", "b")]));
    }

    #[test]
    fn test_implicit_equality() {
        assert!(matches(r#"{"name":"Alice"}"#, &[("name", "Alice")]));
        assert!(!matches(r#"{"name":"Alice"}"#, &[("name", "Bob")]));
        // absent field fails the whole AND
        assert!(!matches(r#"{"name":"Alice"}"#, &[("city", "NY")]));
        // multiple keys form an implicit AND
        assert!(matches(
            r#"{"name":"Alice","age":"25"}"#,
            &[("name", "Alice"), ("age", "25")]
        ));
        assert!(!matches(
            r#"{"name":"Alice","age":"26"}"#,
            &[("name", "Alice"), ("age", "25")]
        ));
    }

    #[test]
    fn test_equality_integer_refinement() {
        assert!(matches(r#"{"age":25}"#, &[("age", "25")]));
        assert!(matches(r#"{"age":"007"}"#, &[("age", "7")]));
        assert!(!matches(r#"{"age":"7.0"}"#, &[("age", "7")]));
    }

    #[test]
    fn test_id_pseudo_field() {
        assert!(matches(r#"{"_id":"1"}"#, &[("name", "Alice")]));
        assert!(!matches(r#"{"_id":"2"}"#, &[("name", "Alice")]));
        // refinement applies to _id as well
        assert!(matches(r#"{"_id":"01"}"#, &[]));
    }

    #[test]
    fn test_gt_lt_numeric_and_lexicographic() {
        let f = r#"{"age":{"$gt":"20"}}"#;
        assert!(matches(f, &[("age", "25")]));
        assert!(matches(f, &[("age", "100")]));
        assert!(!matches(f, &[("age", "7")]));

        assert!(matches(r#"{"age":{"$lt":"20"}}"#, &[("age", "7")]));

        // one side non-numeric: lexicographic byte comparison
        assert!(matches(r#"{"name":{"$gt":"alice"}}"#, &[("name", "bob")]));
        assert!(!matches(r#"{"name":{"$lt":"alice"}}"#, &[("name", "bob")]));
    }

    #[test]
    fn test_operator_conjunction_within_object() {
        let f = r#"{"age":{"$gt":"20","$lt":"30"}}"#;
        assert!(matches(f, &[("age", "25")]));
        assert!(!matches(f, &[("age", "35")]));
        assert!(!matches(f, &[("age", "15")]));
    }

    #[test]
    fn test_explicit_eq() {
        assert!(matches(r#"{"age":{"$eq":"25"}}"#, &[("age", "25")]));
        assert!(matches(r#"{"age":{"$eq":25}}"#, &[("age", "025")]));
        assert!(!matches(r#"{"age":{"$eq":"25"}}"#, &[("age", "26")]));
    }

    #[test]
    fn test_like_patterns() {
        assert!(matches(r#"{"name":{"$like":"al%"}}"#, &[("name", "alice")]));
        assert!(matches(r#"{"name":{"$like":"al%"}}"#, &[("name", "alex")]));
        assert!(!matches(r#"{"name":{"$like":"al%"}}"#, &[("name", "bob")]));
        assert!(matches(r#"{"name":{"$like":"%_"}}"#, &[("name", "x")]));
        assert!(matches(r#"{"name":{"$like":"a_c"}}"#, &[("name", "abc")]));
        assert!(!matches(r#"{"name":{"$like":"a_c"}}"#, &[("name", "abbc")]));
    }

    #[test]
    fn test_in_operator() {
        let f = r#"{"city":{"$in":["NY","LA"]}}"#;
        assert!(matches(f, &[("city", "NY")]));
        assert!(matches(f, &[("city", "LA")]));
        assert!(!matches(f, &[("city", "SF")]));

        // integer refinement applies per element
        assert!(matches(r#"{"age":{"$in":[25,"30"]}}"#, &[("age", "030")]));

        // empty array never matches
        assert!(!matches(r#"{"age":{"$in":[]}}"#, &[("age", "25")]));

        // $in without an array can never be satisfied
        assert!(!matches(r#"{"age":{"$in":"25"}}"#, &[("age", "25")]));
    }

    #[test]
    fn test_unrecognized_operator_object_matches_nothing() {
        assert!(!matches(r#"{"age":{"$unknown":"25"}}"#, &[("age", "25")]));
        // recognized operator with an empty value counts as absent
        assert!(!matches(r#"{"age":{"$eq":""}}"#, &[("age", "25")]));
        // unknown keys alongside a recognized operator are ignored
        assert!(matches(
            r#"{"age":{"$noise":"x","$gt":"20"}}"#,
            &[("age", "25")]
        ));
    }

    #[test]
    fn test_or_combinator() {
        let f = r#"{"$or":[{"city":"NY"},{"age":{"$gt":"35"}}]}"#;
        assert!(matches(f, &[("city", "NY"), ("age", "20")]));
        assert!(matches(f, &[("city", "LA"), ("age", "40")]));
        assert!(!matches(f, &[("city", "SF"), ("age", "30")]));
    }

    #[test]
    fn test_and_combinator() {
        let f = r#"{"$and":[{"city":"NY"},{"age":{"$gt":"18"}}]}"#;
        assert!(matches(f, &[("city", "NY"), ("age", "20")]));
        assert!(!matches(f, &[("city", "NY"), ("age", "10")]));
        assert!(!matches(f, &[("city", "LA"), ("age", "20")]));
    }

    #[test]
    fn test_empty_combinators_match_nothing() {
        assert!(!matches(r#"{"$or":[]}"#, &[("a", "b")]));
        assert!(!matches(r#"{"$and":[]}"#, &[("a", "b")]));
        assert!(!matches(r#"{"$or":5}"#, &[("a", "b")]));
    }

    #[test]
    fn test_empty_subfilter_inside_or_matches_everything() {
        assert!(matches(r#"{"$or":[{}]}"#, &[("a", "b")]));
    }

    #[test]
    fn test_combinator_only_as_first_key() {
        // $or in second position is an ordinary (absent) field name
        assert!(!matches(
            r#"{"city":"NY","$or":[{"age":"1"}]}"#,
            &[("city", "NY")]
        ));
    }

    #[test]
    fn test_subfilters_are_implicit_and_not_nested_combinators() {
        // "$and" inside an $or sub-filter is a field lookup, which fails
        assert!(!matches(
            r#"{"$or":[{"$and":[{"city":"NY"}]}]}"#,
            &[("city", "NY")]
        ));
    }

    #[test]
    fn test_nested_array_inside_subfilter_does_not_confuse_combinator() {
        let f = r#"{"$or":[{"city":{"$in":["NY","LA"]}},{"age":"30"}]}"#;
        assert!(matches(f, &[("city", "LA")]));
        assert!(matches(f, &[("city", "SF"), ("age", "30")]));
        assert!(!matches(f, &[("city", "SF"), ("age", "31")]));
    }

    #[test]
    fn test_document_values_are_trimmed_before_comparison() {
        assert!(matches(r#"{"age":{"$gt":"20"}}"#, &[("age", " 25 ")]));
    }

    #[test]
    fn test_malformed_filter_matches_nothing() {
        assert!(!matches(r#"{"name":"Alice"#, &[("name", "Alice")]));
        assert!(!matches(r#"{"name":{"$gt":}}"#, &[("name", "Alice")]));
    }
}
