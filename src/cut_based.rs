//! Mechanism to apply a cut-based identification to reconstructed electrons

use crate::{
    effective_area::{EffectiveAreas, CONE_03},
    electron::Electron,
    error::{Error, Result},
    numeric::{reals, Float},
};
use log::debug;
use prefix_num_ops::real::*;
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Cut values of one working point in one calorimeter region
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CutParameters {
    /// Identification name, also used to select the effective-area table
    pub id_name: String,

    /// Maximum full 5x5 σ_iηiη
    pub full5x5_sigma_ieta_ieta_cut: Float,

    /// Maximum |Δη| between the seed cluster and the track
    pub d_eta_in_seed_cut: Float,

    /// Maximum |Δφ| between the supercluster and the track
    pub d_phi_in_cut: Float,

    /// Constant term of the H/E cut
    pub h_over_e_cut_c0: Float,

    /// Term of the H/E cut scaling as 1/E_SC
    pub h_over_e_cut_ce: Float,

    /// Term of the H/E cut scaling as ρ/E_SC
    pub h_over_e_cut_cr: Float,

    /// Constant term of the relative isolation cut
    pub rel_comb_isolation_with_ea_cut_c0: Float,

    /// Term of the relative isolation cut scaling as 1/pT
    pub rel_comb_isolation_with_ea_cut_cpt: Float,

    /// Maximum |1/E - 1/p|
    pub abs_e_inverse_minus_p_inverse_cut: Float,

    /// Maximum number of missing inner hits (inclusive)
    pub missing_hits_cut: u32,
}
//
impl CutParameters {
    /// H/E threshold, adapted to the supercluster energy and pile-up
    pub fn h_over_e_cut(&self, sc_energy: Float, rho: Float) -> Float {
        self.h_over_e_cut_c0 + self.h_over_e_cut_ce / sc_energy + self.h_over_e_cut_cr * rho / sc_energy
    }

    /// Relative isolation threshold at a given transverse momentum
    pub fn isolation_cut(&self, pt: Float) -> Float {
        self.rel_comb_isolation_with_ea_cut_c0 + self.rel_comb_isolation_with_ea_cut_cpt / pt
    }
}

/// Full definition of a cut-based working point
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingPointCuts {
    /// Cuts applied to barrel electrons
    pub barrel: CutParameters,

    /// Cuts applied to endcap electrons
    pub endcap: CutParameters,

    /// Effective areas for the isolation pile-up correction
    pub iso_inputs: Arc<EffectiveAreas>,
}
//
impl WorkingPointCuts {
    /// Cut parameters for the region of an electron
    pub fn for_region(&self, is_barrel: bool) -> &CutParameters {
        if is_barrel {
            &self.barrel
        } else {
            &self.endcap
        }
    }
}

// ### CUT FLOW ###

/// Individual cuts of a cut-based identification, in evaluation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cut {
    /// Shower shape
    SigmaIEtaIEta,
    /// Track / seed cluster η matching
    DEtaInSeed,
    /// Track / supercluster φ matching
    DPhiIn,
    /// Hadronic leakage
    HOverE,
    /// Pile-up corrected relative isolation
    RelIsolation,
    /// Track / cluster energy consistency
    EInverseMinusPInverse,
    /// Missing inner hits
    MissingHits,
    /// Photon conversion rejection
    ConversionVeto,
}
//
impl Cut {
    /// Number of cuts
    pub const COUNT: usize = 8;

    /// All cuts, in evaluation order
    pub const ALL: [Cut; Cut::COUNT] = [
        Cut::SigmaIEtaIEta,
        Cut::DEtaInSeed,
        Cut::DPhiIn,
        Cut::HOverE,
        Cut::RelIsolation,
        Cut::EInverseMinusPInverse,
        Cut::MissingHits,
        Cut::ConversionVeto,
    ];

    /// Conventional name of the cut
    pub fn name(self) -> &'static str {
        match self {
            Cut::SigmaIEtaIEta => "full5x5_sigmaIEtaIEta",
            Cut::DEtaInSeed => "dEtaInSeed",
            Cut::DPhiIn => "dPhiIn",
            Cut::HOverE => "hOverE",
            Cut::RelIsolation => "relCombIsolationWithEA",
            Cut::EInverseMinusPInverse => "absEInverseMinusPInverse",
            Cut::MissingHits => "missingHits",
            Cut::ConversionVeto => "conversionVeto",
        }
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Discriminating quantities computed for one electron
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Discriminants {
    /// Full 5x5 σ_iηiη
    pub sigma_ieta_ieta: Float,

    /// Δη between the seed cluster and the track, or the largest finite
    /// value if the supercluster or its seed are unavailable
    pub d_eta_in_seed: Float,

    /// Δφ between the supercluster and the track
    pub d_phi_in: Float,

    /// H/E ratio
    pub h_over_e: Float,

    /// H/E threshold for this electron
    pub h_over_e_cut: Float,

    /// Pile-up corrected relative isolation
    pub rel_isolation: Float,

    /// Relative isolation threshold for this electron
    pub rel_isolation_cut: Float,

    /// |1/E - 1/p|, computed as |1 - E_SC/p| / E_ecal
    pub abs_e_inverse_minus_p_inverse: Float,

    /// Number of missing inner hits
    pub missing_hits: u32,

    /// Whether the conversion veto was passed
    pub conversion_veto: bool,
}
//
impl Discriminants {
    /// Compute the discriminating quantities of an electron
    pub fn compute<E: Electron + ?Sized>(
        electron: &E,
        rho: Float,
        cuts: &CutParameters,
        iso_inputs: &EffectiveAreas,
    ) -> Result<Self> {
        let super_cluster = electron.super_cluster();

        // A missing supercluster or seed is not an error, it makes the Δη cut
        // fail. Without supercluster energy, the H/E cut cannot pass either.
        let d_eta_in_seed = match super_cluster {
            Some(sc) => match sc.seed {
                Some(seed) => electron.delta_eta_super_cluster_track_at_vtx() - sc.eta + seed.eta,
                None => reals::MAX,
            },
            None => reals::MAX,
        };
        let h_over_e_cut = super_cluster.map_or(reals::NEG_INFINITY, |sc| cuts.h_over_e_cut(sc.energy, rho));

        // Relative isolation, with pile-up subtracted from the neutral part
        let pt = electron.pt();
        let iso = electron.pf_isolation();
        let area = iso_inputs.effective_area(&cuts.id_name, CONE_03, electron.super_cluster_eta())?;
        let neutral = (iso.sum_neutral_hadron_et + iso.sum_photon_et - rho * area).max(0.);
        let rel_isolation = (iso.sum_charged_hadron_pt + neutral) / pt;

        let ecal_energy_inverse = 1. / electron.ecal_energy();
        let abs_e_inverse_minus_p_inverse = abs(1. - electron.e_super_cluster_over_p()) * ecal_energy_inverse;

        Ok(Discriminants {
            sigma_ieta_ieta: electron.full5x5_sigma_ieta_ieta(),
            d_eta_in_seed,
            d_phi_in: electron.delta_phi_super_cluster_track_at_vtx(),
            h_over_e: electron.hadronic_over_em(),
            h_over_e_cut,
            rel_isolation,
            rel_isolation_cut: cuts.isolation_cut(pt),
            abs_e_inverse_minus_p_inverse,
            missing_hits: electron.missing_inner_hits(),
            conversion_veto: electron.pass_conversion_veto(),
        })
    }
}

/// Detailed outcome of a cut-based identification
#[derive(Clone, Debug, PartialEq)]
pub struct CutFlow {
    /// Quantities which the cuts were applied to
    pub discriminants: Discriminants,

    /// Outcome of each cut, indexed like `Cut::ALL`
    outcomes: [bool; Cut::COUNT],
}
//
impl CutFlow {
    /// Apply the cuts of a working point to precomputed discriminants
    ///
    /// All comparisons are strict, except for the missing hits cut.
    ///
    pub fn new(discriminants: Discriminants, cuts: &CutParameters) -> Self {
        let d = &discriminants;
        let outcomes = Cut::ALL.map(|cut| match cut {
            Cut::SigmaIEtaIEta => d.sigma_ieta_ieta < cuts.full5x5_sigma_ieta_ieta_cut,
            Cut::DEtaInSeed => abs(d.d_eta_in_seed) < cuts.d_eta_in_seed_cut,
            Cut::DPhiIn => abs(d.d_phi_in) < cuts.d_phi_in_cut,
            Cut::HOverE => d.h_over_e < d.h_over_e_cut,
            Cut::RelIsolation => d.rel_isolation < d.rel_isolation_cut,
            Cut::EInverseMinusPInverse => d.abs_e_inverse_minus_p_inverse < cuts.abs_e_inverse_minus_p_inverse_cut,
            Cut::MissingHits => d.missing_hits <= cuts.missing_hits_cut,
            Cut::ConversionVeto => d.conversion_veto,
        });
        CutFlow {
            discriminants,
            outcomes,
        }
    }

    /// Whether a specific cut was passed
    pub fn passes(&self, cut: Cut) -> bool {
        self.outcomes[cut as usize]
    }

    /// Whether all cuts were passed
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|&ok| ok)
    }

    /// First failed cut in evaluation order, if any
    pub fn first_failure(&self) -> Option<Cut> {
        Cut::ALL.into_iter().find(|&cut| !self.passes(cut))
    }
}

// ### EVALUATOR ###

/// Cut-based electron identification, with several working points
#[derive(Clone, Debug)]
pub struct CutBasedEvaluator {
    /// Name of the identification
    name: String,

    /// Version tag of the identification
    tag: String,

    /// Working point definitions, by name
    working_points: BTreeMap<String, WorkingPointCuts>,
}
//
impl CutBasedEvaluator {
    /// Set up a cut-based identification
    pub fn new(
        name: &str,
        tag: &str,
        working_points: impl IntoIterator<Item = (String, WorkingPointCuts)>,
    ) -> Self {
        CutBasedEvaluator {
            name: name.to_owned(),
            tag: tag.to_owned(),
            working_points: working_points.into_iter().collect(),
        }
    }

    /// Name of the identification
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version tag of the identification
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Names of the available working points
    pub fn working_point_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.working_points.keys().map(String::as_str)
    }

    /// Definition of a working point
    pub fn working_point(&self, wp: &str) -> Result<&WorkingPointCuts> {
        self.working_points
            .get(wp)
            .ok_or_else(|| Error::UnknownWorkingPoint {
                evaluator: format!("{}{}", self.name, self.tag),
                working_point: wp.to_owned(),
            })
    }

    /// Apply a working point to an electron, detailing the outcome of each cut
    pub fn evaluate<E: Electron + ?Sized>(&self, electron: &E, rho: Float, wp: &str) -> Result<CutFlow> {
        let definition = self.working_point(wp)?;
        let cuts = definition.for_region(electron.is_barrel());
        let discriminants = Discriminants::compute(electron, rho, cuts, &definition.iso_inputs)?;
        let cut_flow = CutFlow::new(discriminants, cuts);
        if let Some(cut) = cut_flow.first_failure() {
            debug!("{} rejects electron at cut {cut}", cuts.id_name);
        }
        Ok(cut_flow)
    }

    /// Tell whether an electron passes a working point
    pub fn passed<E: Electron + ?Sized>(&self, electron: &E, rho: Float, wp: &str) -> Result<bool> {
        self.evaluate(electron, rho, wp).map(|cut_flow| cut_flow.passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        effective_area::{EffectiveAreaTable, EtaBin},
        electron::{PfIsolation, RecoElectron, SeedCluster, SuperCluster},
        momentum,
    };
    use approx::assert_relative_eq;

    fn params(id_name: &str, missing_hits_cut: u32) -> CutParameters {
        CutParameters {
            id_name: id_name.to_owned(),
            full5x5_sigma_ieta_ieta_cut: 0.0126,
            d_eta_in_seed_cut: 0.00463,
            d_phi_in_cut: 0.148,
            h_over_e_cut_c0: 0.05,
            h_over_e_cut_ce: 1.16,
            h_over_e_cut_cr: 0.0324,
            rel_comb_isolation_with_ea_cut_c0: 0.198,
            rel_comb_isolation_with_ea_cut_cpt: 0.506,
            abs_e_inverse_minus_p_inverse_cut: 0.209,
            missing_hits_cut,
        }
    }

    fn evaluator() -> CutBasedEvaluator {
        let areas = EffectiveAreas::new().with_table(
            "Test",
            EffectiveAreaTable::new().with_variable(
                CONE_03,
                vec![EtaBin {
                    eta_min: 0.,
                    eta_max: 2.5,
                    area: 0.1,
                }],
            ),
        );
        let wp = WorkingPointCuts {
            barrel: params("TestID-barrel", 2),
            endcap: params("TestID-endcap", 3),
            iso_inputs: Arc::new(areas),
        };
        CutBasedEvaluator::new("TestID", "V1", [("veto".to_owned(), wp)])
    }

    fn good_electron() -> RecoElectron {
        let mut ele = RecoElectron::new(momentum::from_pt_eta_phi(40., 0.5, 0.), true);
        ele.full5x5_sigma_ieta_ieta = 0.009;
        ele.delta_eta_in = 0.001;
        ele.delta_phi_in = 0.02;
        ele.hadronic_over_em = 0.02;
        ele.pf_isolation = PfIsolation {
            sum_charged_hadron_pt: 2.,
            sum_neutral_hadron_et: 0.,
            sum_photon_et: 0.,
        };
        ele.e_super_cluster_over_p = 1.05;
        ele.ecal_energy = 50.;
        ele
    }

    #[test]
    fn good_electron_passes() {
        let cut_flow = evaluator().evaluate(&good_electron(), 10., "veto").unwrap();
        assert!(cut_flow.passed(), "failed at {:?}", cut_flow.first_failure());
        let d = cut_flow.discriminants;
        assert_relative_eq!(d.d_eta_in_seed, 0.001, epsilon = 1e-12);
        assert_relative_eq!(d.rel_isolation, 0.05, epsilon = 1e-12);
        assert_relative_eq!(d.abs_e_inverse_minus_p_inverse, 0.05 / 50., epsilon = 1e-12);
    }

    #[test]
    fn missing_hits_cut_is_inclusive() {
        let evaluator = evaluator();
        let mut ele = good_electron();
        ele.missing_inner_hits = 2;
        assert!(evaluator.passed(&ele, 10., "veto").unwrap());
        ele.missing_inner_hits = 3;
        let cut_flow = evaluator.evaluate(&ele, 10., "veto").unwrap();
        assert!(!cut_flow.passed());
        assert_eq!(cut_flow.first_failure(), Some(Cut::MissingHits));

        // The endcap tolerates one more missing hit
        ele.is_barrel = false;
        assert!(evaluator.passed(&ele, 10., "veto").unwrap());
    }

    #[test]
    fn other_cuts_are_strict() {
        let evaluator = evaluator();
        let mut ele = good_electron();
        ele.full5x5_sigma_ieta_ieta = 0.0126;
        let cut_flow = evaluator.evaluate(&ele, 10., "veto").unwrap();
        assert!(!cut_flow.passes(Cut::SigmaIEtaIEta));
        assert_eq!(cut_flow.first_failure(), Some(Cut::SigmaIEtaIEta));

        let mut ele = good_electron();
        ele.delta_phi_in = -0.148;
        assert_eq!(evaluator.evaluate(&ele, 10., "veto").unwrap().first_failure(), Some(Cut::DPhiIn));
    }

    #[test]
    fn missing_seed_fails_delta_eta_cut() {
        let evaluator = evaluator();
        let mut ele = good_electron();
        ele.super_cluster = Some(SuperCluster {
            energy: 50.,
            eta: 0.5,
            seed: None,
        });
        let cut_flow = evaluator.evaluate(&ele, 10., "veto").unwrap();
        assert_eq!(cut_flow.discriminants.d_eta_in_seed, reals::MAX);
        assert_eq!(cut_flow.first_failure(), Some(Cut::DEtaInSeed));
        assert!(cut_flow.passes(Cut::HOverE));
    }

    #[test]
    fn missing_super_cluster_is_not_an_error() {
        let mut ele = good_electron();
        ele.super_cluster = None;
        let cut_flow = evaluator().evaluate(&ele, 10., "veto").unwrap();
        assert!(!cut_flow.passed());
        assert!(!cut_flow.passes(Cut::DEtaInSeed));
        assert!(!cut_flow.passes(Cut::HOverE));
        assert!(cut_flow.passes(Cut::SigmaIEtaIEta));
    }

    #[test]
    fn h_over_e_cut_adapts_to_energy_and_pile_up() {
        let p = params("X", 0);
        assert_relative_eq!(p.h_over_e_cut(100., 20.), 0.05 + 1.16 / 100. + 0.0324 * 20. / 100.);

        let evaluator = evaluator();
        let mut ele = good_electron();
        ele.super_cluster = Some(SuperCluster {
            energy: 10.,
            eta: 0.5,
            seed: Some(SeedCluster { eta: 0.5 }),
        });
        ele.hadronic_over_em = 0.1;
        // 0.05 + 0.116 + 0.0324 * rho / 10
        assert!(evaluator.evaluate(&ele, 0., "veto").unwrap().passes(Cut::HOverE));
        ele.hadronic_over_em = 0.2;
        assert!(!evaluator.evaluate(&ele, 0., "veto").unwrap().passes(Cut::HOverE));
        assert!(evaluator.evaluate(&ele, 20., "veto").unwrap().passes(Cut::HOverE));
    }

    #[test]
    fn pile_up_subtraction_is_floored_at_zero() {
        let evaluator = evaluator();
        let mut ele = good_electron();
        ele.pf_isolation.sum_neutral_hadron_et = 1.;
        ele.pf_isolation.sum_photon_et = 1.;

        // 2 + max(0, 2 - 10 * 0.1) = 3
        let d = evaluator.evaluate(&ele, 10., "veto").unwrap().discriminants;
        assert_relative_eq!(d.rel_isolation, 3. / 40., epsilon = 1e-12);

        // Subtracting more pile-up than the neutral sum leaves charged only
        let d = evaluator.evaluate(&ele, 100., "veto").unwrap().discriminants;
        assert_relative_eq!(d.rel_isolation, 2. / 40., epsilon = 1e-12);
        assert_relative_eq!(d.rel_isolation_cut, 0.198 + 0.506 / 40., epsilon = 1e-12);
    }

    #[test]
    fn unknown_working_point_is_an_error() {
        let err = evaluator().passed(&good_electron(), 10., "tight").unwrap_err();
        assert!(matches!(err, Error::UnknownWorkingPoint { ref working_point, .. } if working_point == "tight"));
    }

    #[test]
    fn unmatched_effective_area_key_is_an_error() {
        let mut evaluator = evaluator();
        let wp = evaluator.working_points.get_mut("veto").unwrap();
        wp.barrel.id_name = "OtherID".to_owned();
        let err = evaluator.passed(&good_electron(), 10., "veto").unwrap_err();
        assert!(matches!(err, Error::NoEffectiveAreaKey { .. }));
    }

    #[test]
    fn metadata() {
        let evaluator = evaluator();
        assert_eq!(evaluator.name(), "TestID");
        assert_eq!(evaluator.tag(), "V1");
        assert_eq!(evaluator.working_point_names().collect::<Vec<_>>(), ["veto"]);
        assert_eq!(Cut::MissingHits.to_string(), "missingHits");
    }
}
