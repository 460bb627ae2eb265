//! Hierarchical identifier keys.
//!
//! A key is an ordered chain of name parts, compared case-insensitively,
//! flattened to a single string by escaping each part ([`codec`]) and
//! joining with a divider. [`FieldKey`] identifies a column path (`A/B` is
//! column `B` reached through a lookup on column `A`); [`SchemaKey`]
//! identifies a nested schema path.
//!
//! The two key kinds deliberately carry different escape tables: field paths
//! persist the legacy six-entry table in saved URLs and filters, schema
//! paths use the full table because their divider `.` must itself be
//! escapable.

pub mod codec;

use crate::error::OntodbError;
use compact_str::CompactString;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Divider and escape table for one key kind.
pub trait KeyKind {
    const DIVIDER: char;
    const CODEC: codec::Codec;
}

/// Column-path keys: `/` divider, legacy escape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field;

/// Schema-path keys: `.` divider, full escape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema;

impl KeyKind for Field {
    const DIVIDER: char = '/';
    const CODEC: codec::Codec = codec::LEGACY_FIELD;
}

impl KeyKind for Schema {
    const DIVIDER: char = '.';
    const CODEC: codec::Codec = codec::FULL;
}

/// A non-empty root-to-leaf chain of name parts. Immutable once built.
#[derive(Debug, Clone)]
pub struct QueryKey<K: KeyKind> {
    parts: Vec<CompactString>,
    _kind: PhantomData<K>,
}

pub type FieldKey = QueryKey<Field>;
pub type SchemaKey = QueryKey<Schema>;

impl<K: KeyKind> QueryKey<K> {
    /// Builds a key from ordered, already-unescaped parts. At least one part
    /// is required.
    pub fn from_parts<I, S>(parts: I) -> Result<Self, OntodbError>
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let parts: Vec<CompactString> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() {
            return Err(OntodbError::invalid_key("key requires at least one part"));
        }
        Ok(Self {
            parts,
            _kind: PhantomData,
        })
    }

    /// Wraps `parent` with a new leaf part.
    pub fn child(parent: Option<Self>, name: impl Into<CompactString>) -> Self {
        let mut parts = parent.map(|p| p.parts).unwrap_or_default();
        parts.push(name.into());
        Self {
            parts,
            _kind: PhantomData,
        }
    }

    /// Splits an encoded string on the divider (preserving empty tokens),
    /// decodes each token, and folds the result into a chain. Never fails:
    /// malformed escapes decode as literal characters.
    pub fn parse(s: &str) -> Self {
        let parts = s
            .split(K::DIVIDER)
            .map(|token| CompactString::from(K::CODEC.decode_part(token)))
            .collect();
        Self {
            parts,
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.parts.last().map(|p| p.as_str()).unwrap_or("")
    }

    pub fn parent(&self) -> Option<Self> {
        if self.parts.len() < 2 {
            return None;
        }
        Some(Self {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
            _kind: PhantomData,
        })
    }

    /// Root-to-leaf part names.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// True iff `prefix`'s parts are a case-insensitive leading subsequence
    /// of this key's parts.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        if prefix.parts.len() > self.parts.len() {
            return false;
        }
        self.parts
            .iter()
            .zip(&prefix.parts)
            .all(|(a, b)| eq_ci(a, b))
    }

    /// Escapes each part and joins with the divider (same as `to_string`),
    /// then percent-encodes the result for URL embedding.
    pub fn encode(&self) -> String {
        codec::percent_encode(&self.to_string())
    }

    /// Heuristic check that `s` contains illegal characters outside of valid
    /// escape tokens; see [`codec::Codec::needs_encoding`].
    pub fn needs_encoding(s: &str) -> bool {
        K::CODEC.needs_encoding(s, K::DIVIDER)
    }
}

impl<K: KeyKind> std::fmt::Display for QueryKey<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", K::DIVIDER)?;
            }
            f.write_str(&K::CODEC.encode_part(part))?;
        }
        Ok(())
    }
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn cmp_name(a: &str, b: &str, case_insensitive: bool) -> Ordering {
    if case_insensitive {
        a.to_lowercase().cmp(&b.to_lowercase())
    } else {
        a.cmp(b)
    }
}

/// Parent chains compare before leaf names, and a missing parent sorts
/// before any parent. The effect is the siblings-before-descendants order
/// schema-tree enumeration depends on.
fn cmp_hierarchical(a: &[CompactString], b: &[CompactString], case_insensitive: bool) -> Ordering {
    let (pa, na) = a.split_at(a.len() - 1);
    let (pb, nb) = b.split_at(b.len() - 1);
    let parents = match (pa.is_empty(), pb.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => cmp_hierarchical(pa, pb, case_insensitive),
    };
    parents.then_with(|| cmp_name(&na[0], &nb[0], case_insensitive))
}

impl<K: KeyKind> PartialEq for QueryKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.parts.len() == other.parts.len()
            && self.parts.iter().zip(&other.parts).all(|(a, b)| eq_ci(a, b))
    }
}

impl<K: KeyKind> Eq for QueryKey<K> {}

impl<K: KeyKind> Hash for QueryKey<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for part in &self.parts {
            part.to_lowercase().hash(state);
        }
    }
}

impl SchemaKey {
    /// Pure case-insensitive order over the flattened string form.
    pub fn compare_str(a: &Self, b: &Self) -> Ordering {
        a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase())
    }

    /// Case-insensitive hierarchical order: siblings before descendants.
    pub fn compare_hierarchical(a: &Self, b: &Self) -> Ordering {
        cmp_hierarchical(&a.parts, &b.parts, true)
    }

    /// Case-sensitive variant of [`compare_hierarchical`].
    ///
    /// [`compare_hierarchical`]: SchemaKey::compare_hierarchical
    pub fn compare_hierarchical_cs(a: &Self, b: &Self) -> Ordering {
        cmp_hierarchical(&a.parts, &b.parts, false)
    }
}

impl Ord for QueryKey<Schema> {
    fn cmp(&self, other: &Self) -> Ordering {
        SchemaKey::compare_hierarchical(self, other)
    }
}

impl PartialOrd for QueryKey<Schema> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKey, SchemaKey};
    use proptest::prelude::*;
    use std::cmp::Ordering;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn field(parts: &[&str]) -> FieldKey {
        FieldKey::from_parts(parts.iter().copied()).expect("parts")
    }

    fn schema(parts: &[&str]) -> SchemaKey {
        SchemaKey::from_parts(parts.iter().copied()).expect("parts")
    }

    #[test]
    fn from_parts_rejects_empty_list() {
        assert!(FieldKey::from_parts(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn parts_roundtrip() {
        let key = field(&["Subject", "Visit", "Label"]);
        assert_eq!(
            key.parts().collect::<Vec<_>>(),
            vec!["Subject", "Visit", "Label"]
        );
        assert_eq!(key.name(), "Label");
        assert_eq!(key.parent().expect("parent").name(), "Visit");
    }

    #[test]
    fn display_escapes_and_parse_decodes() {
        let key = field(&["A/B", "C$D"]);
        let flat = key.to_string();
        assert_eq!(flat, "A$SB/C$DD");
        assert_eq!(FieldKey::parse(&flat), key);
    }

    #[test]
    fn plain_strings_roundtrip_verbatim() {
        for s in ["a", "a/b", "Participant/Visit/Label", "x-y_z 1"] {
            assert_eq!(FieldKey::parse(s).to_string(), s);
        }
    }

    #[test]
    fn empty_tokens_are_preserved() {
        let key = FieldKey::parse("a//b");
        assert_eq!(key.parts().collect::<Vec<_>>(), vec!["a", "", "b"]);
        assert_eq!(key.to_string(), "a//b");
    }

    #[test]
    fn schema_key_escapes_its_own_divider() {
        let key = SchemaKey::child(None, "assay.general");
        assert_eq!(key.to_string(), "assay$Pgeneral");
        assert_eq!(SchemaKey::parse("assay$Pgeneral"), key);
        assert_eq!(key.len(), 1);
    }

    #[test]
    fn field_key_leaves_dots_alone() {
        let key = field(&["a.b"]);
        assert_eq!(key.to_string(), "a.b");
    }

    #[test]
    fn equality_and_hash_are_case_insensitive() {
        let a = field(&["A", "B"]);
        let b = field(&["a", "b"]);
        assert_eq!(a, b);
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
        assert_ne!(a, field(&["a", "b", "c"]));
    }

    #[test]
    fn starts_with_is_case_insensitive_prefix() {
        let key = field(&["Subject", "Visit", "Label"]);
        assert!(key.starts_with(&field(&["subject"])));
        assert!(key.starts_with(&field(&["SUBJECT", "visit"])));
        assert!(!key.starts_with(&field(&["Visit"])));
        assert!(!field(&["Subject"]).starts_with(&key));
    }

    #[test]
    fn url_encoding_percent_escapes() {
        let key = field(&["a b", "c/d"]);
        assert_eq!(key.encode(), "a%20b%2Fc%24Sd");
    }

    #[test]
    fn needs_encoding_heuristic_per_kind() {
        assert!(SchemaKey::needs_encoding("a.b.c$"));
        assert!(!SchemaKey::needs_encoding("a$Pb"));
        assert!(!FieldKey::needs_encoding("a.b"));
        assert!(FieldKey::needs_encoding("a,b"));
    }

    #[test]
    fn sibling_sorts_before_descendant() {
        let parent = schema(&["a"]);
        let child = schema(&["a", "b"]);
        assert_eq!(SchemaKey::compare_hierarchical(&parent, &child), Ordering::Less);
        assert!(parent < child);
    }

    #[test]
    fn string_and_hierarchical_orders_interleave_differently() {
        let a = schema(&["a"]);
        let b = schema(&["b"]);
        let a_b = schema(&["a", "b"]);

        // string order: "a" < "a.b" < "b"
        assert_eq!(SchemaKey::compare_str(&a, &a_b), Ordering::Less);
        assert_eq!(SchemaKey::compare_str(&a_b, &b), Ordering::Less);

        // hierarchical order: "a" < "b" < "a.b"
        assert_eq!(SchemaKey::compare_hierarchical(&a, &b), Ordering::Less);
        assert_eq!(SchemaKey::compare_hierarchical(&b, &a_b), Ordering::Less);
    }

    #[test]
    fn case_sensitive_hierarchical_order_distinguishes_case() {
        let upper = schema(&["A"]);
        let lower = schema(&["a"]);
        assert_eq!(SchemaKey::compare_hierarchical(&upper, &lower), Ordering::Equal);
        assert_ne!(
            SchemaKey::compare_hierarchical_cs(&upper, &lower),
            Ordering::Equal
        );
    }

    proptest! {
        #[test]
        fn parse_tostring_roundtrip(
            parts in prop::collection::vec("\\PC{1,16}", 1..5)
        ) {
            let key = FieldKey::from_parts(parts).expect("non-empty");
            let reparsed = FieldKey::parse(&key.to_string());
            prop_assert_eq!(reparsed, key);
        }

        #[test]
        fn schema_parse_tostring_roundtrip(
            parts in prop::collection::vec("\\PC{1,16}", 1..5)
        ) {
            let key = SchemaKey::from_parts(parts).expect("non-empty");
            let reparsed = SchemaKey::parse(&key.to_string());
            prop_assert_eq!(reparsed, key);
        }
    }
}
