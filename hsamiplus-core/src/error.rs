use thiserror::Error;

/// Configuration errors: invalid module selections or project values that make
/// a run impossible. Raised before any `State` is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("The '{0}' module value '{1}' is not one of the allowed values: {2}")]
    InvalidModuleValue(String, String, String),
    #[error("The wetland module is enabled (mhumide=1) but physio.samax is 0")]
    WetlandWithoutMaxArea,
    #[error("The mylake ice model requires the een module to be 'mdj' or 'alt', got '{0}'")]
    MylakeRequiresBandedSnow(String),
    #[error("The parameter vector must have exactly 50 entries, got {0}")]
    WrongParameterLength(usize),
    #[error("The {0} vector for '{1}' must have the same length as meteo, got {2} and {3}")]
    MismatchedLength(String, String, usize, usize),
    #[error("An imposed '{0}' hydrograph must have length equal to memoire ({1}), got {2}")]
    ImposedHydrographLength(String, usize, usize),
    #[error("nb_pas_par_jour must be at least 1, got {0}")]
    InvalidStepsPerDay(i64),
    #[error("{0}")]
    Generic(String),
}

/// Preconditions checked at the point of use, not at construction time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("The rational erf approximation requires a non-negative argument, got {0}")]
    NegativeErfArgument(f64),
}

/// Errors that can occur while advancing or running the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error("The simulation end date was reached and the model cannot advance anymore")]
    ReachedSimulationEnd,
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

/// A non-fatal condition surfaced at WARN level via the `log` crate: the
/// simulation logs it and keeps running rather than aborting.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    OccupationFractionsNotOne { sum: f64 },
    ImposedHydrographLengthMismatch { name: &'static str, expected: usize, got: usize },
    MassBalanceResidualExceeded { submodule: &'static str, residual: f64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::OccupationFractionsNotOne { sum } => {
                write!(f, "sum of occupation fractions is {sum}, expected 1")
            }
            Warning::ImposedHydrographLengthMismatch { name, expected, got } => write!(
                f,
                "imposed '{name}' hydrograph has length {got}, expected memoire={expected}"
            ),
            Warning::MassBalanceResidualExceeded { submodule, residual } => write!(
                f,
                "mass-balance residual for '{submodule}' is {residual}, exceeding 1e-9 cm"
            ),
        }
    }
}
