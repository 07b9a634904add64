//! The update rules plugged into [`crate::ProximalOptimizer`].

mod adam;
mod sgd;

pub use adam::{AdamConfig, AdamRule};
pub use sgd::{SgdConfig, SgdRule};

use num_traits::Float;

use crate::{Result, error::OptimErr, state::ProximalState};

/// Computes the per-element update of a single parameter.
///
/// The rule never touches the parameter itself, it writes into `delta` the amount the optimizer
/// must subtract from every element, which keeps a failed step from leaving half updated values.
pub trait UpdateRule<E: Float>: Sized {
    /// The hyperparameters this rule is built from.
    type Config: Clone;

    /// Validates `config` and builds the rule.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error naming the first out of range value.
    fn from_config(config: Self::Config) -> Result<Self>;

    /// The hyperparameters in use.
    fn config(&self) -> &Self::Config;

    /// The proximal coefficient.
    fn mu(&self) -> E;

    /// A short name used in log records.
    fn name(&self) -> &'static str;

    /// Computes the update of one parameter and advances its state.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the parameter, same length as `param`.
    /// * `param` - The current values of the parameter.
    /// * `state` - The memory kept for this parameter.
    /// * `delta` - Output buffer, same length as `param`.
    fn compute_update(
        &self,
        grad: &[E],
        param: &[E],
        state: &mut ProximalState<E>,
        delta: &mut [E],
    );
}

/// The gradient of the local objective plus the proximal term `mu/2 * ||p - r||^2`.
#[inline]
pub(crate) fn proximal_grad<E: Float>(grad: E, mu: E, param: E, reference: E) -> E {
    grad + mu * (param - reference)
}

fn ensure<E: Float>(name: &'static str, value: E, valid: bool, reason: &'static str) -> Result<()> {
    if value.is_finite() && valid {
        return Ok(());
    }

    let value = value.to_f64().unwrap_or(f64::NAN);
    Err(OptimErr::invalid(name, value, reason))
}

fn check_lr<E: Float>(lr: E) -> Result<()> {
    ensure("lr", lr, lr > E::zero(), "must be > 0")
}

fn check_mu<E: Float>(mu: E) -> Result<()> {
    ensure("mu", mu, mu >= E::zero(), "must be >= 0")
}

fn check_weight_decay<E: Float>(weight_decay: E) -> Result<()> {
    ensure(
        "weight_decay",
        weight_decay,
        weight_decay >= E::zero(),
        "must be >= 0",
    )
}
