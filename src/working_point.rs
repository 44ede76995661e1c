//! Working points of MVA identifications
//!
//! A working point is a per-category threshold on the MVA score. Thresholds
//! are formulas of the electron's transverse momentum, written in the
//! configuration as strings such as `"2.84 - exp(-pt / 3.32) * 9.38"`, and
//! stored under keys of the form `cutCategory<N>`.

use crate::{
    electron::Electron,
    error::{Error, Result},
    expr::CompiledExpr,
    numeric::{functions::logistic_transform, Float},
};
use std::collections::BTreeMap;

/// Prefix of the keys under which category thresholds are stored
pub const CATEGORY_KEY_PREFIX: &str = "cutCategory";

/// Free variable of threshold formulas
pub const PT_VARIABLE: &str = "pt";

/// Extract the category index out of a `cutCategory<N>` key
///
/// `N` is written in base 10 without leading zeros, so that each category
/// has exactly one key.
///
pub fn parse_category_key(key: &str) -> Result<usize> {
    key.strip_prefix(CATEGORY_KEY_PREFIX)
        .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
        .filter(|index| *index == "0" || !index.starts_with('0'))
        .and_then(|index| index.parse().ok())
        .ok_or_else(|| Error::MalformedCategoryKey(key.to_owned()))
}

/// Threshold on the MVA score, as a function of transverse momentum
#[derive(Clone, Debug)]
pub struct ThresholdFormula(CompiledExpr);
//
impl ThresholdFormula {
    /// Compile a threshold formula, where `pt` is the only variable
    pub fn parse(formula: &str) -> Result<Self> {
        CompiledExpr::compile(formula, &[PT_VARIABLE]).map(Self)
    }

    /// Evaluate the threshold at a given transverse momentum
    pub fn eval(&self, pt: Float) -> Float {
        self.0.eval(&[pt])
    }

    /// Original text of the formula
    pub fn source(&self) -> &str {
        self.0.source()
    }
}

/// Per-category thresholds of one working point
pub type CategoryThresholds = BTreeMap<usize, ThresholdFormula>;

/// Set of working points of an MVA identification
#[derive(Clone, Debug)]
pub struct WorkingPointEvaluator {
    /// Name of the estimator
    name: String,

    /// Version tag of the identification
    tag: String,

    /// Thresholds, by working point then category
    working_points: BTreeMap<String, CategoryThresholds>,

    /// Whether scores go through the logistic transform before comparison
    logistic_transform: bool,
}
//
impl WorkingPointEvaluator {
    /// Compile working point definitions
    ///
    /// Definitions map working point names to `cutCategory<N>` keys and their
    /// threshold formulas. Malformed keys and formulas are reported here,
    /// rather than when the working point is first used.
    ///
    pub fn new<W, C, K, F>(name: &str, tag: &str, definitions: W, logistic_transform: bool) -> Result<Self>
    where
        W: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = (K, F)>,
        K: AsRef<str>,
        F: AsRef<str>,
    {
        let working_points: BTreeMap<String, CategoryThresholds> = definitions
            .into_iter()
            .map(|(wp_name, cuts)| -> Result<(String, CategoryThresholds)> {
                let mut thresholds = CategoryThresholds::new();
                for (key, formula) in cuts {
                    let category = parse_category_key(key.as_ref())?;
                    let formula = ThresholdFormula::parse(formula.as_ref())?;
                    if thresholds.insert(category, formula).is_some() {
                        return Err(Error::InvalidConfiguration(format!(
                            "category {category} of working point '{wp_name}' is defined twice"
                        )));
                    }
                }
                Ok((wp_name, thresholds))
            })
            .collect::<Result<_>>()?;
        Ok(WorkingPointEvaluator {
            name: name.to_owned(),
            tag: tag.to_owned(),
            working_points,
            logistic_transform,
        })
    }

    /// Name of the estimator
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version tag of the identification
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether scores go through the logistic transform
    pub fn uses_logistic_transform(&self) -> bool {
        self.logistic_transform
    }

    /// Names of the available working points
    pub fn working_point_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.working_points.keys().map(String::as_str)
    }

    /// Thresholds of a working point, by category
    pub fn categories(&self, wp: &str) -> Result<&CategoryThresholds> {
        self.working_points
            .get(wp)
            .ok_or_else(|| Error::UnknownWorkingPoint {
                evaluator: format!("{}{}", self.name, self.tag),
                working_point: wp.to_owned(),
            })
    }

    /// Threshold of a working point for a given category and pT
    pub fn threshold(&self, wp: &str, category: usize, pt: Float) -> Result<Float> {
        let formula = self
            .categories(wp)?
            .get(&category)
            .ok_or_else(|| Error::MissingCategory {
                working_point: wp.to_owned(),
                category,
            })?;
        Ok(formula.eval(pt))
    }

    /// Tell whether an electron with a given MVA score and category passes a
    /// working point
    pub fn passed<E: Electron + ?Sized>(&self, electron: &E, mva: Float, category: usize, wp: &str) -> Result<bool> {
        let threshold = self.threshold(wp, category, electron.pt())?;
        let score = if self.logistic_transform {
            logistic_transform(mva)
        } else {
            mva
        };
        Ok(score > threshold)
    }
}
