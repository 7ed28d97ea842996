//! CQL literal and identifier rendering.

use std::{borrow::Cow, collections::BTreeMap, fmt};

use crate::error::RenderError;

/// Doubles every single quote so `text` can sit inside a `'...'` literal.
pub fn escape(text: &str) -> Cow<'_, str> {
    if text.contains('\'') {
        Cow::Owned(text.replace('\'', "''"))
    } else {
        Cow::Borrowed(text)
    }
}

/// A string constant: `'it''s'`.
#[derive(Debug, Clone, Copy)]
pub struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", escape(self.0))
    }
}

/// Keywords the CQL grammar never accepts as an unquoted name. Sorted.
pub const RESERVED_KEYWORDS: [&str; 56] = [
    "add",
    "allow",
    "alter",
    "and",
    "apply",
    "asc",
    "authorize",
    "batch",
    "begin",
    "by",
    "columnfamily",
    "create",
    "delete",
    "desc",
    "describe",
    "drop",
    "entries",
    "execute",
    "from",
    "full",
    "grant",
    "if",
    "in",
    "index",
    "infinity",
    "insert",
    "into",
    "keyspace",
    "limit",
    "modify",
    "nan",
    "norecursive",
    "not",
    "null",
    "of",
    "on",
    "or",
    "order",
    "primary",
    "rename",
    "replace",
    "revoke",
    "schema",
    "select",
    "set",
    "table",
    "to",
    "token",
    "truncate",
    "unlogged",
    "update",
    "use",
    "using",
    "view",
    "where",
    "with",
];

/// A name as it must appear in a statement.
///
/// Unquoted CQL identifiers are case-folded by the server and may not be
/// reserved keywords, so anything but a plain lowercase non-keyword name is
/// wrapped in double quotes.
#[derive(Debug, Clone, Copy)]
pub struct Ident<'a>(pub &'a str);

impl Ident<'_> {
    fn is_plain(&self) -> bool {
        let mut chars = self.0.chars();
        matches!(chars.next(), Some('a'..='z'))
            && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
            && RESERVED_KEYWORDS.binary_search(&self.0).is_err()
    }
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            f.write_str(self.0)
        } else {
            write!(f, "\"{}\"", self.0.replace('"', "\"\""))
        }
    }
}

/// A `map<text, text>` constant: `{'class': 'SimpleStrategy'}`.
#[derive(Debug, Clone, Copy)]
pub struct MapLiteral<'a>(pub &'a BTreeMap<String, String>);

impl fmt::Display for MapLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", Quoted(key), Quoted(value))?;
        }
        f.write_str("}")
    }
}

/// Renders a probability without losing precision, always as a float literal.
pub fn chance(property: &'static str, value: f64) -> Result<String, RenderError> {
    if !value.is_finite() {
        return Err(RenderError::NotFinite { property, value });
    }

    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    Ok(text)
}
