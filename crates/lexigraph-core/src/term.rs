//! RDF term classification and normalization.
//!
//! A term is just a raw lexical string until something needs to reason
//! about its kind (variable, URI, literal, prefixed name, or a bare
//! identifier). Classification is purely syntactic — no namespace lookup,
//! no schema — matching the store boundary's "strings are the universal
//! term type" design (see the crate root docs).

use std::fmt;

/// A raw RDF term as it appears in a triple or a triple pattern, before
/// any prefix expansion.
///
/// `Term` is a thin wrapper around the lexical string. It does not own a
/// parsed representation of its contents; callers ask for a [`TermKind`]
/// when they need to branch on what the term is, and use the `strip_*`
/// helpers or [`TermKind`]'s fields to get at the unwrapped body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(String);

impl Term {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Term(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Classify this term by syntactic inspection of its raw lexical form.
    pub fn kind(&self) -> TermKind {
        classify(&self.0)
    }

    pub fn is_variable(&self) -> bool {
        is_variable(&self.0)
    }

    pub fn is_uri(&self) -> bool {
        is_uri(&self.0)
    }

    pub fn is_literal(&self) -> bool {
        is_literal(&self.0)
    }

    pub fn is_prefixed(&self) -> bool {
        is_prefixed(&self.0)
    }

    /// The store-lookup key for this term: an unbound variable becomes the
    /// empty-string wildcard; every other term is its raw lexical form.
    pub fn lookup_key(&self) -> &str {
        if self.is_variable() {
            ""
        } else {
            &self.0
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term(s)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term(s.to_string())
    }
}

impl std::ops::Deref for Term {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// The classification of a raw term string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// `?name` — the name does not include the leading `?`.
    Variable(String),
    /// `<...>` — the body does not include the angle brackets.
    Uri(String),
    /// `"..."` — the body does not include the surrounding quotes.
    Literal(String),
    /// `prefix:local` with a non-empty prefix and local part.
    Prefixed(String, String),
    /// Anything else: a raw identifier with no recognized wrapping.
    Bare(String),
}

/// Classify a raw term string. See [`TermKind`] for the precedence of
/// the checks: variable, then URI, then literal, then prefixed name,
/// else bare.
pub fn classify(raw: &str) -> TermKind {
    if is_variable(raw) {
        return TermKind::Variable(strip_variable(raw).to_string());
    }
    if is_uri(raw) {
        return TermKind::Uri(strip_uri(raw).to_string());
    }
    if is_literal(raw) {
        return TermKind::Literal(strip_literal(raw).to_string());
    }
    if is_prefixed(raw) {
        let (prefix, local) = split_prefixed(raw).expect("is_prefixed implies a single ':'");
        return TermKind::Prefixed(prefix.to_string(), local.to_string());
    }
    TermKind::Bare(raw.to_string())
}

/// True iff `raw` is a variable reference: starts with `?` and has at
/// least one character after it.
pub fn is_variable(raw: &str) -> bool {
    raw.len() > 1 && raw.starts_with('?')
}

/// True iff `raw` is a URI reference: wrapped in `<...>` with a
/// non-empty body.
pub fn is_uri(raw: &str) -> bool {
    raw.len() > 2 && raw.starts_with('<') && raw.ends_with('>')
}

/// True iff `raw` is a quoted literal: wrapped in `"..."` with a
/// non-empty body.
pub fn is_literal(raw: &str) -> bool {
    raw.len() > 2 && raw.starts_with('"') && raw.ends_with('"')
}

/// True iff `raw` is a prefixed name: contains exactly one `:` with a
/// non-empty prefix and local part, and is none of the other term kinds.
pub fn is_prefixed(raw: &str) -> bool {
    if is_variable(raw) || is_uri(raw) || is_literal(raw) {
        return false;
    }
    split_prefixed(raw).is_some()
}

fn split_prefixed(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find(':')?;
    let (prefix, rest) = raw.split_at(idx);
    let local = &rest[1..];
    if prefix.is_empty() || local.is_empty() {
        None
    } else {
        Some((prefix, local))
    }
}

/// Strip the leading `?` from a variable reference. No-op on other forms.
pub fn strip_variable(raw: &str) -> &str {
    raw.strip_prefix('?').unwrap_or(raw)
}

/// Strip the surrounding `<` `>` from a URI reference. No-op on other forms.
pub fn strip_uri(raw: &str) -> &str {
    raw.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw)
}

/// Strip the surrounding `"` `"` from a literal. No-op on other forms.
pub fn strip_literal(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}
