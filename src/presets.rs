//! Built-in electron identification definitions
//!
//! These are the standard definitions of the Fall17 and Spring16 trainings,
//! so that common identifications can be used without a configuration file.

use crate::{
    config::{validate_working_point, Configuration},
    cut_based::{CutBasedEvaluator, CutParameters, WorkingPointCuts},
    effective_area::{EffectiveAreaTable, EffectiveAreas, EtaBin, CONE_03},
    error::Result,
    mva::ModelConfiguration,
    numeric::Float,
    working_point::WorkingPointEvaluator,
};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

/// Estimator behind all built-in MVA identifications
pub const MVA_ESTIMATOR: &str = "ElectronMVAEstimatorRun2";

/// Input variable definitions shared by all built-in MVA identifications
pub const MVA_VARIABLES_FILE: &str = "RecoEgamma/ElectronIdentification/data/ElectronMVAEstimatorRun2Variables.txt";

/// Category cuts of the 6-category trainings
pub const SIX_CATEGORY_CUTS: [&str; 6] = [
    "pt < 10. && abs(superCluster.eta) < 0.800",
    "pt < 10. && abs(superCluster.eta) >= 0.800 && abs(superCluster.eta) < 1.479",
    "pt < 10. && abs(superCluster.eta) >= 1.479",
    "pt >= 10. && abs(superCluster.eta) < 0.800",
    "pt >= 10. && abs(superCluster.eta) >= 0.800 && abs(superCluster.eta) < 1.479",
    "pt >= 10. && abs(superCluster.eta) >= 1.479",
];

/// Category cuts of the 3-category trainings
pub const THREE_CATEGORY_CUTS: [&str; 3] = [
    "abs(superCluster.eta) < 0.800",
    "abs(superCluster.eta) >= 0.800 && abs(superCluster.eta) < 1.479",
    "abs(superCluster.eta) >= 1.479",
];

/// Upper |η| edges of the effective-area bins, the first bin starting at 0.
/// The last bin covers the whole forward region.
const EA_BIN_EDGES: [Float; 7] = [1.0, 1.479, 2.0, 2.2, 2.3, 2.4, 5.0];

// ### EFFECTIVE AREAS ###

fn cone_03_table(areas: [Float; 7]) -> EffectiveAreaTable {
    let bins = EA_BIN_EDGES
        .iter()
        .zip(areas)
        .scan(0., |eta_min, (&eta_max, area)| {
            let bin = EtaBin {
                eta_min: *eta_min,
                eta_max,
                area,
            };
            *eta_min = eta_max;
            Some(bin)
        })
        .collect();
    EffectiveAreaTable::new().with_variable(CONE_03, bins)
}

/// Effective areas of neutral hadron and photon isolation in a 0.3 cone
pub fn electron_effective_areas() -> EffectiveAreas {
    EffectiveAreas::new()
        .with_table(
            "Spring15_25ns",
            cone_03_table([0.1752, 0.1862, 0.1411, 0.1534, 0.1903, 0.2243, 0.2687]),
        )
        .with_table(
            "Fall17",
            cone_03_table([0.1440, 0.1562, 0.1032, 0.0859, 0.1116, 0.1321, 0.1654]),
        )
}

// ### CUT-BASED IDENTIFICATIONS ###

/// Build cut parameters from the usual ordering of the published tables:
/// σ_iηiη, Δη_seed, Δφ_in, H/E (C0, CE, Cr), isolation (C0, Cpt), |1/E-1/p|
fn cuts(id_name: &str, values: [Float; 9], missing_hits_cut: u32) -> CutParameters {
    let [sigma, d_eta, d_phi, hoe_c0, hoe_ce, hoe_cr, iso_c0, iso_cpt, eop] = values;
    CutParameters {
        id_name: id_name.to_owned(),
        full5x5_sigma_ieta_ieta_cut: sigma,
        d_eta_in_seed_cut: d_eta,
        d_phi_in_cut: d_phi,
        h_over_e_cut_c0: hoe_c0,
        h_over_e_cut_ce: hoe_ce,
        h_over_e_cut_cr: hoe_cr,
        rel_comb_isolation_with_ea_cut_c0: iso_c0,
        rel_comb_isolation_with_ea_cut_cpt: iso_cpt,
        abs_e_inverse_minus_p_inverse_cut: eop,
        missing_hits_cut,
    }
}

/// Cut-based identification of the Fall17 94X V2 training
fn fall17_94x_v2(iso_inputs: Arc<EffectiveAreas>) -> CutBasedEvaluator {
    #[rustfmt::skip]
    let table = [
        ("veto",
         [0.0126, 0.00463, 0.148, 0.05, 1.16, 0.0324, 0.198, 0.506, 0.209], 2,
         [0.0457, 0.00814, 0.19, 0.05, 2.54, 0.183, 0.203, 0.963, 0.132], 3),
        ("loose",
         [0.0112, 0.00377, 0.0884, 0.05, 1.16, 0.0324, 0.112, 0.506, 0.193], 1,
         [0.0425, 0.00674, 0.169, 0.0441, 2.54, 0.183, 0.108, 0.963, 0.111], 1),
        ("medium",
         [0.0106, 0.0032, 0.0547, 0.046, 1.16, 0.0324, 0.0478, 0.506, 0.184], 1,
         [0.0387, 0.00632, 0.0394, 0.0275, 2.52, 0.183, 0.0658, 0.963, 0.0721], 1),
        ("tight",
         [0.0104, 0.00255, 0.022, 0.026, 1.15, 0.0324, 0.0287, 0.506, 0.159], 1,
         [0.0353, 0.00501, 0.0236, 0.0188, 2.06, 0.183, 0.0445, 0.963, 0.0197], 1),
    ];
    let working_points = table.into_iter().map(|(wp, barrel, barrel_hits, endcap, endcap_hits)| {
        let id_name = format!("cutBasedElectronID-Fall17-94X-V2-{wp}");
        let definition = WorkingPointCuts {
            barrel: cuts(&id_name, barrel, barrel_hits),
            endcap: cuts(&id_name, endcap, endcap_hits),
            iso_inputs: iso_inputs.clone(),
        };
        (wp.to_owned(), definition)
    });
    CutBasedEvaluator::new("cutBasedElectronID", "Fall1794XV2", working_points)
}

/// Standard cut-based identifications, by short name
pub fn electron_cut_based_ids() -> BTreeMap<String, CutBasedEvaluator> {
    let iso_inputs = Arc::new(electron_effective_areas());
    BTreeMap::from([("Fall1794XV2".to_owned(), fall17_94x_v2(iso_inputs))])
}

// ### MVA IDENTIFICATIONS ###

fn mva_configuration<S: AsRef<str>>(tag: &str, category_cuts: &[&str], weight_files: &[S]) -> ModelConfiguration {
    ModelConfiguration {
        name: MVA_ESTIMATOR.to_owned(),
        tag: tag.to_owned(),
        category_cuts: category_cuts.iter().map(|&cut| cut.to_owned()).collect(),
        weight_files: weight_files.iter().map(|f| PathBuf::from(f.as_ref())).collect(),
        variables_file: PathBuf::from(MVA_VARIABLES_FILE),
        debug: false,
    }
}

/// Weight files of a 6-category training, in category order
fn six_category_weights(prefix: &str, suffix: &str) -> Vec<String> {
    ["EB1_5", "EB2_5", "EE_5", "EB1_10", "EB2_10", "EE_10"]
        .iter()
        .map(|category| format!("{prefix}{category}{suffix}"))
        .collect()
}

/// Standard MVA identifications, by short name
pub fn electron_mva_configurations() -> BTreeMap<String, ModelConfiguration> {
    const DATA: &str = "RecoEgamma/ElectronIdentification/data";
    let gp_weights = ["EB1_10", "EB2_10", "EE_10"]
        .map(|category| format!("{DATA}/Spring16_GeneralPurpose_V1/electronID_mva_Spring16_GeneralPurpose_V1_{category}.weights.xml.gz"));
    BTreeMap::from([
        (
            "Fall17IsoV2".to_owned(),
            mva_configuration(
                "Fall17IsoV2",
                &SIX_CATEGORY_CUTS,
                &six_category_weights(&format!("{DATA}/MVAWeightFiles/Fall17IsoV2/"), ".weights.xml.gz"),
            ),
        ),
        (
            "Fall17NoIsoV2".to_owned(),
            mva_configuration(
                "Fall17NoIsoV2",
                &SIX_CATEGORY_CUTS,
                &six_category_weights(&format!("{DATA}/MVAWeightFiles/Fall17NoIsoV2/"), ".weights.xml.gz"),
            ),
        ),
        (
            "Spring16HZZV1".to_owned(),
            mva_configuration(
                "Spring16HZZV1",
                &SIX_CATEGORY_CUTS,
                &six_category_weights(
                    &format!("{DATA}/Spring16_HZZ_V1/electronID_mva_Spring16_HZZ_V1_"),
                    ".weights.xml.gz",
                ),
            ),
        ),
        (
            "Spring16GPV1".to_owned(),
            mva_configuration("Spring16GeneralPurposeV1", &THREE_CATEGORY_CUTS, &gp_weights),
        ),
    ])
}

// ### MVA WORKING POINTS ###

/// Working points with pT-dependent thresholds of the form `c - exp(-pt / tau) * a`
fn exponential_thresholds(params: [(Float, Float, Float); 6]) -> Vec<(String, String)> {
    params
        .iter()
        .enumerate()
        .map(|(category, (c, tau, a))| (format!("cutCategory{category}"), format!("{c} - exp(-pt / {tau}) * {a}")))
        .collect()
}

/// Working points with flat thresholds
fn flat_thresholds(thresholds: &[Float]) -> Vec<(String, String)> {
    thresholds
        .iter()
        .enumerate()
        .map(|(category, threshold)| (format!("cutCategory{category}"), threshold.to_string()))
        .collect()
}

/// Standard working points of MVA identifications, by short name
pub fn electron_mva_working_points() -> Result<BTreeMap<String, WorkingPointEvaluator>> {
    #[rustfmt::skip]
    let fall17_iso_v2 = [
        ("wp80".to_owned(), exponential_thresholds([
            (3.26449620468, 3.32657149223, 8.84669783568),
            (2.83557838497, 2.15150487332, 11.0978016567),
            (2.91994945177, 1.69875477522, 24.024807824),
            (7.1336238874, 16.5605268797, 8.22531222391),
            (6.18638275782, 15.2694634284, 7.49764565324),
            (5.43175865738, 15.4290075949, 7.56899692285),
        ])),
        ("wp90".to_owned(), exponential_thresholds([
            (2.84704783417, 3.32529515837, 9.38050947827),
            (2.03833922005, 1.93288758682, 15.364588247),
            (1.82704158461, 1.89796754399, 19.1236071158),
            (6.12931925263, 13.281753835, 8.71138432196),
            (5.26289004857, 13.2154971491, 8.0997882835),
            (4.37338792902, 14.0776094696, 8.48513324496),
        ])),
    ];
    #[rustfmt::skip]
    let fall17_noiso_v2 = [
        ("wp80".to_owned(), exponential_thresholds([
            (3.53495358797, 3.07272325141, 9.94262764352),
            (3.06015605623, 1.95572234114, 14.3091184421),
            (3.02052519639, 1.59784164742, 28.719380105),
            (7.35752275071, 15.87907864, 7.61288809226),
            (6.41811074032, 14.730562874, 6.96387331587),
            (5.64936312428, 16.3664949747, 7.19607610311),
        ])),
        ("wp90".to_owned(), exponential_thresholds([
            (2.77072387339, 3.81500912145, 8.16304860178),
            (1.85602317813, 2.18697654938, 11.8568936824),
            (1.73489307814, 2.0163211971, 17.013880078),
            (5.9175992258, 13.4807294538, 9.31966232685),
            (5.01598837255, 13.1280451502, 8.79418193765),
            (4.16921343208, 13.2017224621, 9.00720913211),
        ])),
    ];
    let spring16_hzz_v1 = [(
        "wpLoose".to_owned(),
        flat_thresholds(&[-0.211, -0.396, -0.215, -0.870, -0.838, -0.763]),
    )];
    let spring16_gp_v1 = [
        ("wp80".to_owned(), flat_thresholds(&[0.940962684155, 0.899208843708, 0.758484721184])),
        ("wp90".to_owned(), flat_thresholds(&[0.836695742607, 0.715337944031, 0.356799721718])),
    ];

    Ok(BTreeMap::from([
        (
            "Fall17IsoV2".to_owned(),
            WorkingPointEvaluator::new(MVA_ESTIMATOR, "Fall17IsoV2", fall17_iso_v2, false)?,
        ),
        (
            "Fall17NoIsoV2".to_owned(),
            WorkingPointEvaluator::new(MVA_ESTIMATOR, "Fall17NoIsoV2", fall17_noiso_v2, false)?,
        ),
        (
            "Spring16HZZV1".to_owned(),
            WorkingPointEvaluator::new(MVA_ESTIMATOR, "Spring16HZZV1", spring16_hzz_v1, true)?,
        ),
        (
            "Spring16GPV1".to_owned(),
            WorkingPointEvaluator::new(MVA_ESTIMATOR, "Spring16GeneralPurposeV1", spring16_gp_v1, true)?,
        ),
    ]))
}

/// All built-in identifications, as a configuration
pub fn configuration() -> Result<Configuration> {
    let cut_based = electron_cut_based_ids();
    for evaluator in cut_based.values() {
        for wp in evaluator.working_point_names() {
            validate_working_point(evaluator.working_point(wp)?)?;
        }
    }
    Ok(Configuration {
        cut_based,
        mva: electron_mva_configurations(),
        working_points: electron_mva_working_points()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mva::CategorySelector;
    use approx::assert_relative_eq;

    #[test]
    fn effective_areas_follow_the_id_name() {
        let areas = electron_effective_areas();
        let id = "cutBasedElectronID-Fall17-94X-V2-veto";
        assert_eq!(areas.resolve(id).unwrap().key, "Fall17");
        assert_eq!(areas.effective_area(id, CONE_03, 0.5).unwrap(), 0.1440);
        assert_eq!(areas.effective_area(id, CONE_03, -1.2).unwrap(), 0.1562);
        assert_eq!(areas.effective_area(id, CONE_03, 2.45).unwrap(), 0.1654);
        assert_eq!(areas.effective_area(id, CONE_03, -2.7).unwrap(), 0.1654);
        let bins = areas.resolve(id).unwrap().table.bins(CONE_03).unwrap();
        assert!(bins.iter().any(|bin| bin.eta_min <= 2.7 && 2.7 < bin.eta_max));
        assert_eq!(areas.effective_area("Spring15_25ns-veto", CONE_03, 0.).unwrap(), 0.1752);
    }

    #[test]
    fn cut_based_working_points() {
        let ids = electron_cut_based_ids();
        let fall17 = &ids["Fall1794XV2"];
        assert_eq!(
            fall17.working_point_names().collect::<Vec<_>>(),
            ["loose", "medium", "tight", "veto"]
        );
        let veto = fall17.working_point("veto").unwrap();
        assert_eq!(veto.barrel.id_name, "cutBasedElectronID-Fall17-94X-V2-veto");
        assert_eq!(veto.barrel.missing_hits_cut, 2);
        assert_eq!(veto.endcap.missing_hits_cut, 3);
        assert_eq!(veto.endcap.h_over_e_cut_ce, 2.54);
        assert_eq!(fall17.working_point("tight").unwrap().endcap.abs_e_inverse_minus_p_inverse_cut, 0.0197);
    }

    #[test]
    fn mva_configurations_are_consistent() {
        for (id, config) in electron_mva_configurations() {
            assert_eq!(config.category_cuts.len(), config.weight_files.len(), "{id}");
            assert_eq!(config.name, MVA_ESTIMATOR);
            assert!(CategorySelector::compile(&config.category_cuts).is_ok(), "{id}");
        }
        let configs = electron_mva_configurations();
        let gp = &configs["Spring16GPV1"];
        assert_eq!(gp.tag, "Spring16GeneralPurposeV1");
        assert_eq!(gp.category_cuts.len(), 3);
    }

    #[test]
    fn mva_working_points() {
        let wps = electron_mva_working_points().unwrap();
        assert!(!wps["Fall17IsoV2"].uses_logistic_transform());
        assert!(wps["Spring16HZZV1"].uses_logistic_transform());
        assert!(wps["Spring16GPV1"].uses_logistic_transform());

        let threshold = wps["Fall17IsoV2"].threshold("wp90", 0, 5.).unwrap();
        assert_relative_eq!(
            threshold,
            2.84704783417 - (-5. / 3.32529515837 as Float).exp() * 9.38050947827,
            epsilon = 1e-9
        );
        assert_eq!(wps["Spring16HZZV1"].threshold("wpLoose", 3, 20.).unwrap(), -0.87);
        assert_eq!(wps["Spring16GPV1"].threshold("wp90", 2, 20.).unwrap(), 0.356799721718);
    }

    #[test]
    fn builtin_configuration_is_valid() {
        let config = configuration().unwrap();
        for (id, model) in &config.mva {
            let wps = config.mva_working_points(id).unwrap();
            for wp in wps.working_point_names() {
                assert_eq!(wps.categories(wp).unwrap().len(), model.category_cuts.len(), "{id} {wp}");
            }
        }
    }
}
