use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the optimizers.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// Errors produced while building or driving a proximal optimizer.
#[derive(Debug)]
pub enum OptimErr {
    /// A hyperparameter is out of its valid range, raised only at construction.
    InvalidHyperparameter {
        /// Name of the offending hyperparameter (e.g. "lr", "beta1").
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// The constraint it violates.
        reason: &'static str,
    },

    /// A buffer disagrees with the shape of the parameter it belongs to.
    ShapeMismatch {
        /// Position of the parameter in the managed set.
        index: usize,
        /// Which buffer mismatched (e.g. "gradient", "parameter").
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },

    /// The caller passed a different amount of parameters than the optimizer manages.
    ParamCountMismatch { got: usize, expected: usize },

    /// A serialized optimizer spec could not be parsed.
    InvalidSpec(serde_json::Error),
}

impl OptimErr {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidHyperparameter {
            name,
            value,
            reason,
        }
    }
}

impl Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimErr::InvalidHyperparameter {
                name,
                value,
                reason,
            } => write!(f, "invalid hyperparameter {name}={value}: {reason}"),
            OptimErr::ShapeMismatch {
                index,
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what} of parameter {index}: got {got:?}, expected {expected:?}"
            ),
            OptimErr::ParamCountMismatch { got, expected } => {
                write!(f, "parameter count mismatch: got {got}, expected {expected}")
            }
            OptimErr::InvalidSpec(e) => write!(f, "invalid optimizer spec: {e}"),
        }
    }
}

impl Error for OptimErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OptimErr::InvalidSpec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OptimErr {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidSpec(value)
    }
}
