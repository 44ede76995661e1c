//! Mechanism for loading identification definitions from a configuration file
//!
//! The configuration is a JSON document with four optional sections:
//!
//! ```json
//! {
//!   "effective_areas": { "<collection>": [ { "key": "...", "table": { "03": [ ...bins ] } } ] },
//!   "cut_based": {
//!     "<id>": {
//!       "name": "...", "tag": "...",
//!       "working_points": {
//!         "<wp>": { "barrel": { ...cuts }, "endcap": { ...cuts }, "iso_inputs": "<collection>" }
//!       }
//!     }
//!   },
//!   "mva": { "<id>": { "name": "...", "tag": "...", "category_cuts": [...], "weight_files": [...], "variables_file": "..." } },
//!   "working_points": {
//!     "<id>": { "name": "...", "tag": "...", "logistic_transform": false,
//!               "working_points": { "<wp>": { "cutCategory0": "<formula of pt>" } } }
//!   }
//! }
//! ```
//!
//! Everything is parsed and checked at load time, so that a broken
//! configuration is reported before the first electron is evaluated.

use crate::{
    cut_based::{CutBasedEvaluator, CutParameters, WorkingPointCuts},
    effective_area::{EffectiveAreas, EtaBin, CONE_03},
    error::{Error, Result},
    mva::{CategorySelector, ModelBuilder, ModelConfiguration, MvaEvaluator},
    working_point::WorkingPointEvaluator,
};
use log::info;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

/// Electron identification configuration
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    /// Cut-based identifications
    pub cut_based: BTreeMap<String, CutBasedEvaluator>,

    /// MVA identifications
    pub mva: BTreeMap<String, ModelConfiguration>,

    /// Working points of MVA identifications
    pub working_points: BTreeMap<String, WorkingPointEvaluator>,
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and log a summary
    pub fn load(file_name: impl AsRef<Path>) -> Result<Self> {
        let file_name = file_name.as_ref();
        let config = Self::from_json(&fs::read_to_string(file_name)?)?;
        info!("Loaded electron identification configuration from {}", file_name.display());
        config.print();
        Ok(config)
    }

    /// Decode and check a configuration from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfiguration = serde_json::from_str(json)?;

        // Shared effective-area collections
        let effective_areas: BTreeMap<String, Arc<EffectiveAreas>> = raw
            .effective_areas
            .into_iter()
            .map(|(name, areas)| (name, Arc::new(areas)))
            .collect();

        // Cut-based identifications refer to effective areas by name
        let mut cut_based = BTreeMap::new();
        for (id, raw_id) in raw.cut_based {
            ensure(!raw_id.working_points.is_empty(), || {
                format!("cut-based identification '{id}' has no working point")
            })?;
            let mut working_points = Vec::with_capacity(raw_id.working_points.len());
            for (wp_name, wp) in raw_id.working_points {
                let iso_inputs = effective_areas.get(&wp.iso_inputs).cloned().ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "working point '{wp_name}' of '{id}' uses unknown effective areas '{}'",
                        wp.iso_inputs
                    ))
                })?;
                let definition = WorkingPointCuts {
                    barrel: wp.barrel,
                    endcap: wp.endcap,
                    iso_inputs,
                };
                validate_working_point(&definition)?;
                working_points.push((wp_name, definition));
            }
            cut_based.insert(id, CutBasedEvaluator::new(&raw_id.name, &raw_id.tag, working_points));
        }

        // MVA identifications only get checked, model files are not touched
        for (id, model) in &raw.mva {
            if model.category_cuts.len() != model.weight_files.len() {
                return Err(Error::CategoryCount {
                    cuts: model.category_cuts.len(),
                    weight_files: model.weight_files.len(),
                });
            }
            ensure(!model.category_cuts.is_empty(), || {
                format!("MVA identification '{id}' has no category")
            })?;
            CategorySelector::compile(&model.category_cuts)?;
        }

        // Working point formulas are compiled right away
        let mut working_points = BTreeMap::new();
        for (id, raw_wps) in raw.working_points {
            ensure(!raw_wps.working_points.is_empty(), || {
                format!("working point set '{id}' is empty")
            })?;
            let evaluator = WorkingPointEvaluator::new(
                &raw_wps.name,
                &raw_wps.tag,
                raw_wps.working_points,
                raw_wps.logistic_transform,
            )?;

            // Every category which the model can produce must have a threshold
            if let Some(model) = raw.mva.get(&id) {
                let num_categories = model.category_cuts.len();
                for wp in evaluator.working_point_names() {
                    let categories = evaluator.categories(wp)?;
                    ensure(categories.keys().copied().eq(0..num_categories), || {
                        format!(
                            "working point '{wp}' of '{id}' must define categories 0 to {}",
                            num_categories - 1
                        )
                    })?;
                }
            }
            working_points.insert(id, evaluator);
        }

        Ok(Configuration {
            cut_based,
            mva: raw.mva,
            working_points,
        })
    }

    /// Log the contents of the configuration
    pub fn print(&self) {
        for (id, evaluator) in &self.cut_based {
            let wps = evaluator.working_point_names().collect::<Vec<_>>();
            info!("cut-based ID {id:<16}: {}{} {wps:?}", evaluator.name(), evaluator.tag());
        }
        for (id, model) in &self.mva {
            info!(
                "MVA ID       {id:<16}: {}{} ({} categories)",
                model.name,
                model.tag,
                model.category_cuts.len()
            );
        }
        for (id, evaluator) in &self.working_points {
            let wps = evaluator.working_point_names().collect::<Vec<_>>();
            info!(
                "MVA WPs      {id:<16}: {wps:?}, logistic transform {}",
                evaluator.uses_logistic_transform()
            );
        }
    }

    /// Look up a cut-based identification
    pub fn cut_based_id(&self, id: &str) -> Result<&CutBasedEvaluator> {
        self.cut_based.get(id).ok_or_else(|| Error::UnknownIdentification {
            kind: "cut-based identification",
            name: id.to_owned(),
        })
    }

    /// Look up the configuration of an MVA identification
    pub fn mva_configuration(&self, id: &str) -> Result<&ModelConfiguration> {
        self.mva.get(id).ok_or_else(|| Error::UnknownIdentification {
            kind: "MVA identification",
            name: id.to_owned(),
        })
    }

    /// Look up the working points of an MVA identification
    pub fn mva_working_points(&self, id: &str) -> Result<&WorkingPointEvaluator> {
        self.working_points.get(id).ok_or_else(|| Error::UnknownIdentification {
            kind: "MVA working point set",
            name: id.to_owned(),
        })
    }

    /// Set up an MVA evaluator, with a model builder of the caller's choice
    pub fn mva_evaluator<B: ModelBuilder>(&self, id: &str, builder: B) -> Result<MvaEvaluator<B>> {
        Ok(MvaEvaluator::new(self.mva_configuration(id)?.clone(), builder))
    }
}

/// Turn a failed configuration check into an error
fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(message()))
    }
}

/// Check that a cut-based working point can be evaluated: cut values must be
/// usable numbers, and the identification name of each region must select an
/// effective-area table with isolation cone areas
pub(crate) fn validate_working_point(definition: &WorkingPointCuts) -> Result<()> {
    for cuts in [&definition.barrel, &definition.endcap] {
        validate_cuts(cuts)?;
        let keyed = definition.iso_inputs.resolve(&cuts.id_name)?;
        if keyed.table.bins(CONE_03).map_or(true, <[EtaBin]>::is_empty) {
            return Err(Error::MissingEffectiveArea {
                key: keyed.key.clone(),
                variable: CONE_03.to_owned(),
            });
        }
    }
    Ok(())
}

/// Check that the cut values of a working point are usable numbers
fn validate_cuts(cuts: &CutParameters) -> Result<()> {
    let values = [
        ("full5x5_sigma_ieta_ieta_cut", cuts.full5x5_sigma_ieta_ieta_cut),
        ("d_eta_in_seed_cut", cuts.d_eta_in_seed_cut),
        ("d_phi_in_cut", cuts.d_phi_in_cut),
        ("h_over_e_cut_c0", cuts.h_over_e_cut_c0),
        ("h_over_e_cut_ce", cuts.h_over_e_cut_ce),
        ("h_over_e_cut_cr", cuts.h_over_e_cut_cr),
        ("rel_comb_isolation_with_ea_cut_c0", cuts.rel_comb_isolation_with_ea_cut_c0),
        ("rel_comb_isolation_with_ea_cut_cpt", cuts.rel_comb_isolation_with_ea_cut_cpt),
        ("abs_e_inverse_minus_p_inverse_cut", cuts.abs_e_inverse_minus_p_inverse_cut),
    ];
    match values.into_iter().find(|(_, value)| !value.is_finite()) {
        Some((parameter, value)) => Err(Error::InvalidCutParameter {
            id_name: cuts.id_name.clone(),
            parameter,
            value,
        }),
        None => Ok(()),
    }
}

// ### SERIALIZED FORM ###

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfiguration {
    #[serde(default)]
    effective_areas: BTreeMap<String, EffectiveAreas>,
    #[serde(default)]
    cut_based: BTreeMap<String, RawCutBasedId>,
    #[serde(default)]
    mva: BTreeMap<String, ModelConfiguration>,
    #[serde(default)]
    working_points: BTreeMap<String, RawWorkingPoints>,
}

#[derive(Deserialize)]
struct RawCutBasedId {
    name: String,
    tag: String,
    working_points: BTreeMap<String, RawWorkingPointCuts>,
}

#[derive(Deserialize)]
struct RawWorkingPointCuts {
    barrel: CutParameters,
    endcap: CutParameters,
    iso_inputs: String,
}

#[derive(Deserialize)]
struct RawWorkingPoints {
    name: String,
    tag: String,
    #[serde(default)]
    logistic_transform: bool,
    working_points: BTreeMap<String, BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CUTS: &str = r#"{
        "id_name": "cutBasedElectronID-Fall17-94X-V2-veto",
        "full5x5_sigma_ieta_ieta_cut": 0.0126,
        "d_eta_in_seed_cut": 0.00463,
        "d_phi_in_cut": 0.148,
        "h_over_e_cut_c0": 0.05,
        "h_over_e_cut_ce": 1.16,
        "h_over_e_cut_cr": 0.0324,
        "rel_comb_isolation_with_ea_cut_c0": 0.198,
        "rel_comb_isolation_with_ea_cut_cpt": 0.506,
        "abs_e_inverse_minus_p_inverse_cut": 0.209,
        "missing_hits_cut": 2
    }"#;

    fn document(iso_inputs: &str, wp90: &str) -> String {
        format!(
            r#"{{
                "effective_areas": {{
                    "heppy": [{{"key": "Fall17", "table": {{"03": [{{"eta_min": 0.0, "eta_max": 2.5, "area": 0.14}}]}}}}]
                }},
                "cut_based": {{
                    "Fall1794XV2": {{
                        "name": "cutBasedElectronID", "tag": "Fall1794XV2",
                        "working_points": {{"veto": {{"barrel": {CUTS}, "endcap": {CUTS}, "iso_inputs": "{iso_inputs}"}}}}
                    }}
                }},
                "mva": {{
                    "Spring16GPV1": {{
                        "name": "ElectronMVAEstimatorRun2", "tag": "Spring16GeneralPurposeV1",
                        "category_cuts": ["abs(superCluster.eta) < 1.479", "abs(superCluster.eta) >= 1.479"],
                        "weight_files": ["EB.weights.xml", "EE.weights.xml"],
                        "variables_file": "variables.txt"
                    }}
                }},
                "working_points": {{
                    "Spring16GPV1": {{
                        "name": "ElectronMVAEstimatorRun2", "tag": "Spring16GeneralPurposeV1",
                        "logistic_transform": true,
                        "working_points": {{"wp90": {wp90}}}
                    }}
                }}
            }}"#
        )
    }

    const WP90: &str = r#"{"cutCategory0": "0.83", "cutCategory1": "0.35"}"#;

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document("heppy", WP90).as_bytes()).unwrap();
        let config = Configuration::load(file.path()).unwrap();

        let cut_based = config.cut_based_id("Fall1794XV2").unwrap();
        assert_eq!(cut_based.working_point("veto").unwrap().barrel.missing_hits_cut, 2);
        assert_eq!(config.mva_configuration("Spring16GPV1").unwrap().weight_files.len(), 2);
        let wps = config.mva_working_points("Spring16GPV1").unwrap();
        assert!(wps.uses_logistic_transform());
        assert_eq!(wps.threshold("wp90", 1, 30.).unwrap(), 0.35);
        assert!(matches!(
            config.cut_based_id("Spring16GPV1"),
            Err(Error::UnknownIdentification { .. })
        ));
    }

    #[test]
    fn unknown_effective_areas_are_rejected() {
        let err = Configuration::from_json(&document("nope", WP90)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ref msg) if msg.contains("'nope'")));
    }

    #[test]
    fn id_names_must_select_an_effective_area_table() {
        let unmatched = document("heppy", WP90).replace("Fall17-94X-V2-veto", "Summer16-veto");
        let err = Configuration::from_json(&unmatched).unwrap_err();
        assert!(matches!(
            err,
            Error::NoEffectiveAreaKey { ref id_name } if id_name == "cutBasedElectronID-Summer16-veto"
        ));

        let no_cone = document("heppy", WP90).replace(r#"{"03": ["#, r#"{"04": ["#);
        let err = Configuration::from_json(&no_cone).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingEffectiveArea { ref key, ref variable } if key == "Fall17" && variable == "03"
        ));
    }

    #[test]
    fn every_model_category_needs_a_threshold() {
        let err = Configuration::from_json(&document("heppy", r#"{"cutCategory0": "0.83"}"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(ref msg) if msg.contains("categories 0 to 1")));
    }

    #[test]
    fn malformed_category_keys_are_rejected_at_load_time() {
        let wps = r#"{"cutCategory0": "0.83", "cutCategoryOne": "0.35"}"#;
        let err = Configuration::from_json(&document("heppy", wps)).unwrap_err();
        assert!(matches!(err, Error::MalformedCategoryKey(ref key) if key == "cutCategoryOne"));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(Configuration::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            Configuration::from_json(r#"{"cuts": {}}"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            Configuration::load("/nonexistent/electron_id.json"),
            Err(Error::Io(_))
        ));
        let empty = Configuration::from_json("{}").unwrap();
        assert!(empty.cut_based.is_empty() && empty.mva.is_empty() && empty.working_points.is_empty());
    }

    #[test]
    fn non_finite_cuts_are_rejected() {
        let mut cuts: CutParameters = serde_json::from_str(CUTS).unwrap();
        assert!(validate_cuts(&cuts).is_ok());
        cuts.d_phi_in_cut = crate::numeric::Float::NAN;
        assert!(matches!(
            validate_cuts(&cuts),
            Err(Error::InvalidCutParameter { parameter: "d_phi_in_cut", .. })
        ));
    }
}
