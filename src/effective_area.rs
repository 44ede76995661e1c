//! Effective areas used to correct isolation sums for pile-up
//!
//! An effective area is a per-variable, per-|η| bin coefficient. Multiplied by
//! the event's pile-up energy density ρ, it estimates how much of a neutral
//! isolation sum is due to pile-up.
//!
//! Tables are kept in an ordered collection, and the table used by a given
//! identification is the first one whose key appears anywhere in the
//! identification's name. This is not an exact match, so the order of the
//! keys matters when several of them appear in the same name.

use crate::{
    error::{Error, Result},
    numeric::Float,
};
use log::warn;
use prefix_num_ops::real::*;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Isolation variable computed in a ΔR < 0.3 cone
pub const CONE_03: &str = "03";

/// Effective area of one |η| bin
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct EtaBin {
    /// Lower |η| edge (inclusive)
    pub eta_min: Float,

    /// Upper |η| edge (exclusive)
    pub eta_max: Float,

    /// Effective area for this bin
    pub area: Float,
}

/// Effective areas of a set of isolation variables
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EffectiveAreaTable {
    variables: BTreeMap<String, Vec<EtaBin>>,
}
//
impl EffectiveAreaTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the |η| bins of an isolation variable, sorted by increasing |η|
    pub fn with_variable(mut self, variable: &str, mut bins: Vec<EtaBin>) -> Self {
        bins.sort_by(|a, b| a.eta_min.total_cmp(&b.eta_min));
        self.variables.insert(variable.to_owned(), bins);
        self
    }

    /// |η| bins of an isolation variable, if known
    pub fn bins(&self, variable: &str) -> Option<&[EtaBin]> {
        self.variables.get(variable).map(Vec::as_slice)
    }

    /// Look up the effective area of a variable at a given pseudo-rapidity
    ///
    /// Values of |η| beyond the last bin use that last bin.
    ///
    fn area(&self, variable: &str, eta: Float) -> Option<Float> {
        let bins = self.bins(variable)?;
        let abs_eta = abs(eta);
        let bin = bins
            .iter()
            .find(|bin| bin.eta_min <= abs_eta && abs_eta < bin.eta_max)
            .or_else(|| {
                let last = bins.iter().max_by(|a, b| a.eta_max.total_cmp(&b.eta_max))?;
                warn!(
                    "|eta| = {abs_eta} is outside of the tabulated range of '{variable}', \
                     using the last bin"
                );
                Some(last)
            })?;
        Some(bin.area)
    }
}

/// Effective-area table, tagged with the key used to select it
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KeyedTable {
    /// Key which is searched for in identification names
    pub key: String,

    /// Effective areas
    pub table: EffectiveAreaTable,
}

/// Ordered collection of effective-area tables
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EffectiveAreas {
    tables: Vec<KeyedTable>,
}
//
impl EffectiveAreas {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table at the end of the collection
    pub fn with_table(mut self, key: &str, table: EffectiveAreaTable) -> Self {
        self.tables.push(KeyedTable {
            key: key.to_owned(),
            table,
        });
        self
    }

    /// Keys of the tables, in lookup order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.iter().map(|t| t.key.as_str())
    }

    /// Select the table used by an identification
    ///
    /// Keys are tried in collection order and the first one that is a
    /// substring of `id_name` wins, even if a later key would be a closer
    /// match.
    ///
    pub fn resolve(&self, id_name: &str) -> Result<&KeyedTable> {
        self.tables
            .iter()
            .find(|t| id_name.contains(t.key.as_str()))
            .ok_or_else(|| Error::NoEffectiveAreaKey {
                id_name: id_name.to_owned(),
            })
    }

    /// Effective area of an isolation variable for an identification
    pub fn effective_area(&self, id_name: &str, variable: &str, eta: Float) -> Result<Float> {
        let keyed = self.resolve(id_name)?;
        keyed
            .table
            .area(variable, eta)
            .ok_or_else(|| Error::MissingEffectiveArea {
                key: keyed.key.clone(),
                variable: variable.to_owned(),
            })
    }
}
