//! Identifier normalization between column names and host field names.
//!
//! Columns are conventionally spelled in `snake_case`, host fields in
//! `camelCase`. A column matches a field when the field name equals either the
//! column name itself or its camelCase conversion; the exact spelling wins
//! when both are present.

/// How a field name matched a column.
///
/// Ordered by priority: `Exact` sorts before `CamelCase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    /// The field name equals the column name.
    Exact,
    /// The field name equals the camelCase form of the column name.
    CamelCase,
}

/// Host identifier spellings accepted for one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateSet {
    exact: String,
    /// None when the conversion is empty or identical to `exact`.
    camel: Option<String>,
}

impl CandidateSet {
    /// Returns the exact column name.
    #[must_use]
    pub fn exact(&self) -> &str {
        &self.exact
    }

    /// Returns the camelCase spelling, if it differs from the exact name.
    #[must_use]
    pub fn camel_case(&self) -> Option<&str> {
        self.camel.as_deref()
    }

    /// Checks a host identifier against this set.
    #[must_use]
    pub fn matches(&self, ident: &str) -> Option<MatchKind> {
        if self.exact == ident {
            Some(MatchKind::Exact)
        } else if self.camel.as_deref() == Some(ident) {
            Some(MatchKind::CamelCase)
        } else {
            None
        }
    }

    /// Returns true if `ident` is an accepted spelling.
    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.matches(ident).is_some()
    }

    /// Iterates the accepted spellings, exact first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.exact.as_str()).chain(self.camel.as_deref())
    }

    /// Returns the number of distinct spellings.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + usize::from(self.camel.is_some())
    }

    /// Never true; a set always holds the exact column name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Computes the accepted host spellings of a column name.
#[must_use]
pub fn candidates(column: &str) -> CandidateSet {
    let camel = to_camel_case(column);
    let camel = (!camel.is_empty() && camel != column).then_some(camel);
    CandidateSet {
        exact: column.to_string(),
        camel,
    }
}

/// Converts a `snake_case` column name to `camelCase`.
///
/// Splits on `_`, lowercases the first segment, capitalizes the initial of
/// each following segment and lowercases the rest. Empty segments are
/// dropped. Characters without a case mapping pass through unchanged.
#[must_use]
pub fn to_camel_case(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    for segment in column.split('_').filter(|s| !s.is_empty()) {
        if out.is_empty() {
            out.extend(segment.chars().flat_map(char::to_lowercase));
        } else {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.extend(chars.flat_map(char::to_lowercase));
            }
        }
    }
    out
}

/// Converts a `camelCase` host identifier to `snake_case`.
///
/// An underscore is inserted before each uppercase letter that follows a
/// lowercase letter or digit, and before an uppercase letter that starts a
/// new word after an acronym (`HTTPServer` becomes `http_server`). Digits
/// stay attached to the preceding word.
#[must_use]
pub fn to_snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
