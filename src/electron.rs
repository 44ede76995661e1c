//! Read-only view of a reconstructed electron
//!
//! Electrons come from an upstream reconstruction framework. Identification
//! only needs a handful of their accessors, which are gathered in the
//! [`Electron`] trait so that any framework object can be plugged in. A plain
//! [`RecoElectron`] record is also provided for standalone use.

use crate::{
    momentum::{self, Momentum},
    numeric::Float,
};

/// Seed (most energetic) cluster of a supercluster
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedCluster {
    /// Pseudo-rapidity of the seed cluster position
    pub eta: Float,
}

/// Calorimeter supercluster associated with an electron candidate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuperCluster {
    /// Raw supercluster energy (GeV)
    pub energy: Float,

    /// Pseudo-rapidity of the supercluster position
    pub eta: Float,

    /// Seed cluster, if it was kept by the reconstruction
    pub seed: Option<SeedCluster>,
}

/// Particle-flow isolation sums in a cone around the electron
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PfIsolation {
    /// Scalar sum of charged hadron transverse momenta (GeV)
    pub sum_charged_hadron_pt: Float,

    /// Scalar sum of neutral hadron transverse energies (GeV)
    pub sum_neutral_hadron_et: Float,

    /// Scalar sum of photon transverse energies (GeV)
    pub sum_photon_et: Float,
}

/// Accessors which electron identification needs from a reconstructed electron
pub trait Electron {
    /// Whether the electron's supercluster lies in the calorimeter barrel
    fn is_barrel(&self) -> bool;

    /// Transverse momentum (GeV)
    fn pt(&self) -> Float;

    /// Pseudo-rapidity of the electron momentum
    fn eta(&self) -> Float;

    /// Associated supercluster, if any
    fn super_cluster(&self) -> Option<SuperCluster>;

    /// Shower shape σ_iηiη computed on the full 5x5 crystal matrix
    fn full5x5_sigma_ieta_ieta(&self) -> Float;

    /// Δη between the supercluster and the track extrapolated from the vertex
    fn delta_eta_super_cluster_track_at_vtx(&self) -> Float;

    /// Δφ between the supercluster and the track extrapolated from the vertex
    fn delta_phi_super_cluster_track_at_vtx(&self) -> Float;

    /// Hadronic over electromagnetic energy ratio
    fn hadronic_over_em(&self) -> Float;

    /// Particle-flow isolation sums
    fn pf_isolation(&self) -> PfIsolation;

    /// Supercluster energy over track momentum at the vertex
    fn e_super_cluster_over_p(&self) -> Float;

    /// Corrected ECAL energy (GeV)
    fn ecal_energy(&self) -> Float;

    /// Number of missing hits before the first hit of the track
    fn missing_inner_hits(&self) -> u32;

    /// Whether the candidate is not compatible with a photon conversion
    fn pass_conversion_veto(&self) -> bool;

    /// Pseudo-rapidity of the supercluster, or of the electron itself when
    /// no supercluster is available
    fn super_cluster_eta(&self) -> Float {
        self.super_cluster().map_or_else(|| self.eta(), |sc| sc.eta)
    }
}

/// Plain-data reconstructed electron
#[derive(Clone, Debug, PartialEq)]
pub struct RecoElectron {
    /// 4-momentum of the electron
    pub p4: Momentum,

    /// Barrel (true) or endcap (false) supercluster
    pub is_barrel: bool,

    /// Associated supercluster
    pub super_cluster: Option<SuperCluster>,

    /// See [`Electron::full5x5_sigma_ieta_ieta`]
    pub full5x5_sigma_ieta_ieta: Float,

    /// See [`Electron::delta_eta_super_cluster_track_at_vtx`]
    pub delta_eta_in: Float,

    /// See [`Electron::delta_phi_super_cluster_track_at_vtx`]
    pub delta_phi_in: Float,

    /// See [`Electron::hadronic_over_em`]
    pub hadronic_over_em: Float,

    /// See [`Electron::pf_isolation`]
    pub pf_isolation: PfIsolation,

    /// See [`Electron::e_super_cluster_over_p`]
    pub e_super_cluster_over_p: Float,

    /// See [`Electron::ecal_energy`]
    pub ecal_energy: Float,

    /// See [`Electron::missing_inner_hits`]
    pub missing_inner_hits: u32,

    /// See [`Electron::pass_conversion_veto`]
    pub pass_conversion_veto: bool,
}
//
impl RecoElectron {
    /// Build an electron with a given momentum, and all other properties
    /// zeroed out, except for the supercluster which follows the momentum.
    pub fn new(p4: Momentum, is_barrel: bool) -> Self {
        let eta = momentum::pseudo_rapidity(&p4);
        RecoElectron {
            p4,
            is_barrel,
            super_cluster: Some(SuperCluster {
                energy: p4[momentum::E],
                eta,
                seed: Some(SeedCluster { eta }),
            }),
            full5x5_sigma_ieta_ieta: 0.,
            delta_eta_in: 0.,
            delta_phi_in: 0.,
            hadronic_over_em: 0.,
            pf_isolation: PfIsolation::default(),
            e_super_cluster_over_p: 1.,
            ecal_energy: p4[momentum::E],
            missing_inner_hits: 0,
            pass_conversion_veto: true,
        }
    }
}

impl Electron for RecoElectron {
    fn is_barrel(&self) -> bool {
        self.is_barrel
    }

    fn pt(&self) -> Float {
        momentum::transverse_momentum(&self.p4)
    }

    fn eta(&self) -> Float {
        momentum::pseudo_rapidity(&self.p4)
    }

    fn super_cluster(&self) -> Option<SuperCluster> {
        self.super_cluster
    }

    fn full5x5_sigma_ieta_ieta(&self) -> Float {
        self.full5x5_sigma_ieta_ieta
    }

    fn delta_eta_super_cluster_track_at_vtx(&self) -> Float {
        self.delta_eta_in
    }

    fn delta_phi_super_cluster_track_at_vtx(&self) -> Float {
        self.delta_phi_in
    }

    fn hadronic_over_em(&self) -> Float {
        self.hadronic_over_em
    }

    fn pf_isolation(&self) -> PfIsolation {
        self.pf_isolation
    }

    fn e_super_cluster_over_p(&self) -> Float {
        self.e_super_cluster_over_p
    }

    fn ecal_energy(&self) -> Float {
        self.ecal_energy
    }

    fn missing_inner_hits(&self) -> u32 {
        self.missing_inner_hits
    }

    fn pass_conversion_veto(&self) -> bool {
        self.pass_conversion_veto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_electron_follows_its_momentum() {
        let ele = RecoElectron::new(momentum::from_pt_eta_phi(25., 1.8, -2.), false);
        assert!(!ele.is_barrel());
        assert_relative_eq!(ele.pt(), 25., epsilon = 1e-9);
        let sc = ele.super_cluster().unwrap();
        assert_relative_eq!(sc.eta, 1.8, epsilon = 1e-9);
        assert_eq!(sc.seed, Some(SeedCluster { eta: sc.eta }));
        assert_relative_eq!(sc.energy, ele.ecal_energy());
    }

    #[test]
    fn super_cluster_eta_falls_back_to_electron_eta() {
        let mut ele = RecoElectron::new(momentum::from_pt_eta_phi(25., 0.3, 0.), true);
        ele.super_cluster = Some(SuperCluster {
            energy: 30.,
            eta: 0.35,
            seed: None,
        });
        assert_eq!(ele.super_cluster_eta(), 0.35);
        ele.super_cluster = None;
        assert_relative_eq!(ele.super_cluster_eta(), 0.3, epsilon = 1e-9);
    }
}
