// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Lucene-compatible composite field naming (spec §6.4).
//!
//! Field identifiers use three separators: `%` between a base field and an
//! annotation name, `@` between an annotation and a sensitivity tag, and `#`
//! between a field/annotation and a bookkeeping subfield (content-store id,
//! forward-index id, token-length). A name like `contents%word@i` parses to
//! `(base="contents", annotation=Some("word"), sensitivity=Some("i"),
//! bookkeeping=None)`.
//!
//! Parsing never fails on well-formed XML element names; the indexer (out
//! of scope, §1) is responsible for sanitizing anything else before it
//! reaches the core.

use crate::error::ConfigError;
use std::fmt;

/// A sensitivity under which terms are collated and sorted (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensitivity {
    /// Case-, diacritics-sensitive: exact byte comparison after Unicode
    /// canonicalization.
    Sensitive,
    /// Case-, diacritics-insensitive: the sensitivity most prefix/fuzzy
    /// queries and grouping use.
    Insensitive,
}

impl Sensitivity {
    /// Parse the one-letter tag used in composite field names: `s` or `i`.
    pub fn parse_tag(tag: &str) -> std::result::Result<Self, ConfigError> {
        match tag {
            "s" => Ok(Sensitivity::Sensitive),
            "i" => Ok(Sensitivity::Insensitive),
            other => Err(ConfigError::UnknownSensitivity(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Sensitivity::Sensitive => "s",
            Sensitivity::Insensitive => "i",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A bookkeeping subfield attached after `#` (content-store id, forward-index
/// id, token-length). The core only needs to recognize these, not interpret
/// them — content-store plumbing is out of scope (§1, §9 open question 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bookkeeping {
    ContentStoreId,
    ForwardIndexId,
    TokenLength,
}

impl Bookkeeping {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "cid" => Some(Bookkeeping::ContentStoreId),
            "fiid" => Some(Bookkeeping::ForwardIndexId),
            "length_tokens" => Some(Bookkeeping::TokenLength),
            _ => None,
        }
    }
}

/// A parsed composite field name: `(base, annotation?, sensitivity?, bookkeeping?)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldName {
    pub base: String,
    pub annotation: Option<String>,
    pub sensitivity: Option<Sensitivity>,
    pub bookkeeping: Option<Bookkeeping>,
}

impl FieldName {
    /// Parse a composite field name of the form
    /// `base[%annotation[@sensitivity]][#bookkeeping]`.
    pub fn parse(name: &str) -> std::result::Result<Self, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::InvalidFieldName(name.to_string()));
        }

        // Split off bookkeeping first: it's always the last segment.
        let (main, bookkeeping) = match name.split_once('#') {
            Some((main, bk)) => {
                let parsed = Bookkeeping::parse(bk)
                    .ok_or_else(|| ConfigError::InvalidFieldName(name.to_string()))?;
                (main, Some(parsed))
            }
            None => (name, None),
        };

        if main.is_empty() {
            return Err(ConfigError::InvalidFieldName(name.to_string()));
        }

        let (base_and_annot, sensitivity) = match main.split_once('@') {
            Some((rest, sens)) => (rest, Some(Sensitivity::parse_tag(sens)?)),
            None => (main, None),
        };

        let (base, annotation) = match base_and_annot.split_once('%') {
            Some((base, annot)) => {
                if base.is_empty() || annot.is_empty() {
                    return Err(ConfigError::InvalidFieldName(name.to_string()));
                }
                (base, Some(annot.to_string()))
            }
            None => (base_and_annot, None),
        };

        // A sensitivity tag without an annotation is meaningless (there's
        // nothing to collate) but we don't reject it here: the caller (the
        // terms service) will reject an unknown (base, annotation) pair
        // with ConfigError::UnknownField, which is the more informative
        // error for that case.
        if base.is_empty() {
            return Err(ConfigError::InvalidFieldName(name.to_string()));
        }

        Ok(FieldName {
            base: base.to_string(),
            annotation,
            sensitivity,
            bookkeeping,
        })
    }

    /// Re-render this field name in canonical form.
    pub fn render(&self) -> String {
        let mut s = self.base.clone();
        if let Some(annot) = &self.annotation {
            s.push('%');
            s.push_str(annot);
            if let Some(sens) = self.sensitivity {
                s.push('@');
                s.push_str(sens.tag());
            }
        }
        if let Some(bk) = self.bookkeeping {
            s.push('#');
            s.push_str(match bk {
                Bookkeeping::ContentStoreId => "cid",
                Bookkeeping::ForwardIndexId => "fiid",
                Bookkeeping::TokenLength => "length_tokens",
            });
        }
        s
    }

    /// The `(base, annotation)` pair used to key the forward index, e.g.
    /// `contents%word` regardless of sensitivity/bookkeeping suffix.
    pub fn annotated_field(&self) -> String {
        match &self.annotation {
            Some(a) => format!("{}%{}", self.base, a),
            None => self.base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_only() {
        let f = FieldName::parse("contents").unwrap();
        assert_eq!(f.base, "contents");
        assert_eq!(f.annotation, None);
        assert_eq!(f.sensitivity, None);
        assert_eq!(f.bookkeeping, None);
    }

    #[test]
    fn parses_full_composite_name() {
        let f = FieldName::parse("contents%word@i").unwrap();
        assert_eq!(f.base, "contents");
        assert_eq!(f.annotation.as_deref(), Some("word"));
        assert_eq!(f.sensitivity, Some(Sensitivity::Insensitive));
    }

    #[test]
    fn parses_bookkeeping_suffix() {
        let f = FieldName::parse("contents%word#fiid").unwrap();
        assert_eq!(f.annotation.as_deref(), Some("word"));
        assert_eq!(f.bookkeeping, Some(Bookkeeping::ForwardIndexId));
    }

    #[test]
    fn round_trips_through_render() {
        for name in ["contents", "contents%word", "contents%word@s", "contents%word#cid"] {
            let parsed = FieldName::parse(name).unwrap();
            assert_eq!(parsed.render(), name);
        }
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(FieldName::parse("").is_err());
        assert!(FieldName::parse("contents%").is_err());
        assert!(FieldName::parse("%word").is_err());
        assert!(FieldName::parse("contents%word@x").is_err());
        assert!(FieldName::parse("contents#bogus").is_err());
    }

    #[test]
    fn annotated_field_drops_sensitivity_and_bookkeeping() {
        let f = FieldName::parse("contents%word@i#fiid").unwrap();
        assert_eq!(f.annotated_field(), "contents%word");
    }
}
