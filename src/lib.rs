//! electron_id: Identification decisions for reconstructed electrons
//!
//!
//! # Introduction (for the physicist)
//!
//! Electron candidates reconstructed by a collider experiment are polluted by
//! jets, photon conversions and pile-up. This crate tells whether a candidate
//! passes a given identification working point, in one of two flavours:
//!
//! * Cut-based identification applies a fixed sequence of thresholds on shower
//!   shape, track-cluster matching, hadronic leakage, pile-up corrected
//!   isolation, energy-momentum consistency, missing hits and conversion veto.
//!   Thresholds differ between the barrel and the endcaps.
//! * Multivariate (MVA) identification delegates the computation of a score to
//!   an external engine, then compares that score to a per-category threshold
//!   which may depend on the electron's transverse momentum.
//!
//! The standard Fall17 and Spring16 definitions are built in (see [`presets`]),
//! and others can be loaded from a JSON file (see [`Configuration`]).
//!
//!
//! # Introduction (for the computer guy)
//!
//! Evaluators are plain immutable data once constructed, and can be shared
//! across threads. The only piece of mutable state is the MVA model, which is
//! built lazily on first use, exactly once, behind a [`std::sync::OnceLock`].
//!
//! Electrons and the MVA engine come from outside of this crate, and are
//! abstracted by the [`Electron`] and [`ModelBuilder`] / [`DiscriminantModel`]
//! traits respectively.
//!
//! Threshold formulas and category cut strings are compiled once by a small
//! expression engine (see [`expr`]) when a definition is loaded, so that typos
//! are reported before the first electron is processed.

#![warn(missing_docs)]

pub mod config;
pub mod cut_based;
pub mod effective_area;
pub mod electron;
pub mod error;
pub mod expr;
pub mod momentum;
pub mod mva;
pub mod numeric;
pub mod presets;
pub mod scheduling;
pub mod working_point;

pub use crate::{
    config::Configuration,
    cut_based::{Cut, CutBasedEvaluator, CutFlow, CutParameters, WorkingPointCuts},
    effective_area::EffectiveAreas,
    electron::{Electron, RecoElectron},
    error::{Error, Result},
    mva::{DiscriminantModel, ModelBuilder, ModelConfiguration, MvaEvaluator, SearchPath},
    numeric::Float,
    scheduling::evaluate_batch,
    working_point::WorkingPointEvaluator,
};
