//! Area records and the tree they form.
//!
//! Field names on the wire follow the upstream feed (`today.confirm`,
//! `extData.noSymptom`, ...). Every counter and every nested object is
//! optional there: absent or `null` values decode to zero / empty, and
//! unknown fields are ignored.

use crate::error::ParseError;
use serde::{Deserialize, Deserializer, Serialize};

/// Decodes `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// New cases reported today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayStats {
    /// New confirmed cases.
    #[serde(rename = "confirm", default, deserialize_with = "null_as_default")]
    pub confirmed: i64,

    /// New recoveries.
    #[serde(rename = "heal", default, deserialize_with = "null_as_default")]
    pub healed: i64,

    /// New deaths.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dead: i64,

    /// New locally transmitted confirmed cases.
    #[serde(rename = "storeConfirm", default, deserialize_with = "null_as_default")]
    pub locally_confirmed: i64,

    /// New imported cases.
    #[serde(rename = "input", default, deserialize_with = "null_as_default")]
    pub imported: i64,
}

/// Cumulative counts since records began.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalStats {
    /// Total confirmed cases.
    #[serde(rename = "confirm", default, deserialize_with = "null_as_default")]
    pub confirmed: i64,

    /// Total deaths.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dead: i64,

    /// Total recoveries.
    #[serde(rename = "heal", default, deserialize_with = "null_as_default")]
    pub healed: i64,

    /// Total imported cases.
    #[serde(rename = "input", default, deserialize_with = "null_as_default")]
    pub imported: i64,
}

/// Supplementary asymptomatic counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedStats {
    /// Current asymptomatic carriers.
    #[serde(rename = "noSymptom", default, deserialize_with = "null_as_default")]
    pub asymptomatic: i64,

    /// New asymptomatic carriers today.
    #[serde(rename = "incrNoSymptom", default, deserialize_with = "null_as_default")]
    pub new_asymptomatic: i64,
}

/// One geographic unit (country, province, city, district) and its figures.
///
/// A record exclusively owns its children; there are no parent links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaRecord {
    /// Area name. Unique among siblings only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Opaque timestamp the feed attaches to this node.
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_update_time: String,

    /// Today's new cases.
    #[serde(default, deserialize_with = "null_as_default")]
    pub today: TodayStats,

    /// Cumulative counts.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: TotalStats,

    /// Asymptomatic counters.
    #[serde(rename = "extData", default, deserialize_with = "null_as_default")]
    pub extended: ExtendedStats,

    /// Sub-areas, in feed order. Empty for leaves.
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<AreaRecord>,
}

impl AreaRecord {
    /// Creates a record with the given name and zeroed figures.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a child, builder style.
    pub fn with_child(mut self, child: AreaRecord) -> Self {
        self.children.push(child);
        self
    }

    /// `true` when the record has no sub-areas.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Active cases: confirmed minus deaths minus recoveries, saturating at
    /// the `i64` bounds.
    pub fn currently_confirmed(&self) -> i64 {
        // Cumulative deaths and recoveries, not today's.
        self.total
            .confirmed
            .saturating_sub(self.total.dead)
            .saturating_sub(self.total.healed)
    }

    /// Number of records in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(AreaRecord::subtree_len).sum::<usize>()
    }
}

/// The root-level collection of a statistics payload.
///
/// Never empty. By convention it holds country-level units and lookups start
/// at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaTree {
    roots: Vec<AreaRecord>,
}

impl AreaTree {
    /// Wraps a root collection.
    ///
    /// # Errors
    ///
    /// [`ParseError::EmptyAreaTree`] when `roots` is empty.
    pub fn new(roots: Vec<AreaRecord>) -> Result<Self, ParseError> {
        if roots.is_empty() {
            return Err(ParseError::EmptyAreaTree);
        }
        Ok(Self { roots })
    }

    /// The record lookups start from.
    pub fn root(&self) -> &AreaRecord {
        // `new` guarantees at least one element
        &self.roots[0]
    }

    /// All root-level records, in feed order.
    pub fn roots(&self) -> &[AreaRecord] {
        &self.roots
    }

    /// Consumes the tree, returning the first root.
    pub fn into_root(self) -> AreaRecord {
        let mut roots = self.roots;
        roots.swap_remove(0)
    }
}
