//! Multivariate (MVA) electron identification
//!
//! The discriminant itself is computed by an external engine (typically a
//! boosted decision tree reader), which is opaque to this crate. What this
//! module takes care of is the configuration of that engine, and its one-time
//! construction on first use.
//!
//! The engine is plugged in through two traits:
//!
//! - [`ModelBuilder`] constructs a model from a fully resolved [`ModelSpec`]
//!   (category selection, weight files, variable definitions).
//! - [`DiscriminantModel`] computes the extra per-event variables of an
//!   electron, then its score and category.

use crate::{
    electron::Electron,
    error::{Error, Result},
    expr::CompiledExpr,
    numeric::Float,
};
use log::info;
use serde::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Variables which category cut strings may refer to
const CATEGORY_VARIABLES: [&str; 2] = ["pt", "superCluster.eta"];

// ### CONFIGURATION ###

/// Immutable description of an MVA identification
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelConfiguration {
    /// Name of the estimator
    pub name: String,

    /// Version tag of the identification
    pub tag: String,

    /// Category selection cut strings, one per category
    pub category_cuts: Vec<String>,

    /// Weight files, one per category
    pub weight_files: Vec<PathBuf>,

    /// File defining the input variables of the model
    pub variables_file: PathBuf,

    /// Enable debugging output of the external engine
    #[serde(default)]
    pub debug: bool,
}

/// Ordered category predicates of an MVA identification
///
/// Categories are numbered from 0, in the order of the cut strings, and an
/// electron belongs to the first category whose predicate holds.
///
#[derive(Clone, Debug)]
pub struct CategorySelector {
    cuts: Vec<CompiledExpr>,
}
//
impl CategorySelector {
    /// Compile category cut strings
    ///
    /// Cut strings may use the electron's transverse momentum (`pt`) and the
    /// pseudo-rapidity of its supercluster (`superCluster.eta`).
    ///
    pub fn compile<S: AsRef<str>>(cuts: &[S]) -> Result<Self> {
        let cuts = cuts
            .iter()
            .map(|cut| CompiledExpr::compile(cut.as_ref(), &CATEGORY_VARIABLES))
            .collect::<Result<Vec<_>>>()?;
        Ok(CategorySelector { cuts })
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether no category is defined
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Category of an electron, if any predicate accepts it
    pub fn categorize<E: Electron + ?Sized>(&self, electron: &E) -> Option<usize> {
        let values = [electron.pt(), electron.super_cluster_eta()];
        self.cuts.iter().position(|cut| cut.holds(&values))
    }
}

/// Ordered list of directories in which model files are looked up
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}
//
impl SearchPath {
    /// Search the given directories, in order
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        SearchPath {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// Search the directories listed in an environment variable, using the
    /// platform's path separator, or the current directory if it is unset
    pub fn from_env(var: &str) -> Self {
        match env::var_os(var) {
            Some(paths) => Self::new(env::split_paths(&paths)),
            None => Self::default(),
        }
    }

    /// Locate a file. Absolute paths are only checked for existence.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let found = if path.is_absolute() {
            path.is_file().then(|| path.to_owned())
        } else {
            self.dirs.iter().map(|dir| dir.join(path)).find(|p| p.is_file())
        };
        found.ok_or_else(|| Error::UnresolvedFile {
            path: path.to_owned(),
        })
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new([PathBuf::from(".")])
    }
}

/// Fully resolved inputs for building a discriminant model
#[derive(Clone, Debug)]
pub struct ModelSpec {
    /// Name of the estimator
    pub name: String,

    /// Version tag of the identification
    pub tag: String,

    /// Category selection, with as many categories as weight files
    pub categories: CategorySelector,

    /// Resolved weight files, one per category
    pub weight_files: Vec<PathBuf>,

    /// Resolved variable definition file
    pub variables_file: PathBuf,

    /// Enable debugging output
    pub debug: bool,
}

// ### EXTERNAL ENGINE INTERFACE ###

/// Discriminant model, as provided by an external MVA engine
pub trait DiscriminantModel {
    /// Electron type which the model can evaluate
    type Electron: Electron + ?Sized;

    /// Event-level conversion collection
    type Conversions: ?Sized;

    /// Event-level beam spot
    type BeamSpot: ?Sized;

    /// Compute the event-dependent input variables of an electron
    fn extra_variables(
        &self,
        electron: &Self::Electron,
        conversions: &Self::Conversions,
        beam_spot: &Self::BeamSpot,
        rho: Float,
    ) -> Vec<Float>;

    /// Compute the score and 0-based category of an electron
    fn mva_value(&self, electron: &Self::Electron, extra_variables: &[Float]) -> Result<(Float, usize)>;
}

/// Constructor of discriminant models
pub trait ModelBuilder {
    /// Type of model which is built
    type Model: DiscriminantModel;

    /// Build a model, loading whatever files it needs
    fn build(&self, spec: ModelSpec) -> Result<Self::Model>;
}

// ### EVALUATOR ###

/// MVA identification, with lazy construction of the underlying model
///
/// The model is built on the first evaluation and reused afterwards. This
/// happens at most once per evaluator, even if several threads race on the
/// first evaluation. If construction fails, the evaluator stays unusable.
///
pub struct MvaEvaluator<B: ModelBuilder> {
    /// Configuration which the model is built from
    config: ModelConfiguration,

    /// Where model files are looked up
    search_path: SearchPath,

    /// Model constructor
    builder: B,

    /// Model, or the reason why it could not be built
    model: OnceLock<std::result::Result<B::Model, String>>,
}
//
impl<B: ModelBuilder> MvaEvaluator<B> {
    /// Set up an evaluator. No file is accessed until the first evaluation.
    pub fn new(config: ModelConfiguration, builder: B) -> Self {
        MvaEvaluator {
            config,
            search_path: SearchPath::default(),
            builder,
            model: OnceLock::new(),
        }
    }

    /// Change where model files are looked up
    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    /// Name of the estimator
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Version tag of the identification
    pub fn tag(&self) -> &str {
        &self.config.tag
    }

    /// Configuration of the identification
    pub fn config(&self) -> &ModelConfiguration {
        &self.config
    }

    /// Whether the model has been built already
    pub fn is_initialized(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    /// Access the model, building it on first use
    ///
    /// The call which attempts construction gets the original error if it
    /// fails. Later calls get an `Error::ModelUnavailable`.
    ///
    pub fn model(&self) -> Result<&B::Model> {
        let mut build_error = None;
        let slot = self.model.get_or_init(|| {
            info!("Initializing {}{}", self.config.name, self.config.tag);
            self.build_model().map_err(|e| {
                let reason = e.to_string();
                build_error = Some(e);
                reason
            })
        });
        if let Some(e) = build_error {
            return Err(e);
        }
        slot.as_ref().map_err(|reason| Error::ModelUnavailable {
            model: format!("{}{}", self.config.name, self.config.tag),
            reason: reason.clone(),
        })
    }

    /// Resolve the configuration and hand it over to the model builder
    fn build_model(&self) -> Result<B::Model> {
        let config = &self.config;
        if config.category_cuts.len() != config.weight_files.len() {
            return Err(Error::CategoryCount {
                cuts: config.category_cuts.len(),
                weight_files: config.weight_files.len(),
            });
        }
        let categories = CategorySelector::compile(&config.category_cuts)?;
        let weight_files = config
            .weight_files
            .iter()
            .map(|file| self.search_path.resolve(file))
            .collect::<Result<Vec<_>>>()?;
        let variables_file = self.search_path.resolve(&config.variables_file)?;
        self.builder.build(ModelSpec {
            name: config.name.clone(),
            tag: config.tag.clone(),
            categories,
            weight_files,
            variables_file,
            debug: config.debug,
        })
    }

    /// Compute the MVA score and category of an electron
    pub fn evaluate(
        &self,
        electron: &<B::Model as DiscriminantModel>::Electron,
        conversions: &<B::Model as DiscriminantModel>::Conversions,
        beam_spot: &<B::Model as DiscriminantModel>::BeamSpot,
        rho: Float,
    ) -> Result<(Float, usize)> {
        let model = self.model()?;
        let extra_variables = model.extra_variables(electron, conversions, beam_spot, rho);
        model.mva_value(electron, &extra_variables)
    }
}
