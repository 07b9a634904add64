use num_traits::Float;

use super::{UpdateRule, check_lr, check_mu, check_weight_decay, ensure, proximal_grad};
use crate::{Result, error::OptimErr, state::ProximalState};

/// Hyperparameters of [`SgdRule`].
///
/// Only `lr` and `mu` are required, the momentum and weight decay options default to off, in which
/// case the update is `p -= lr * (g + mu * (p - r))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgdConfig<E> {
    /// Learning rate, must be > 0.
    pub lr: E,
    /// Proximal coefficient, must be >= 0.
    pub mu: E,
    /// Momentum factor, `0` disables momentum.
    pub momentum: E,
    /// Dampening applied to the gradient when accumulating momentum.
    pub dampening: E,
    /// Use Nesterov momentum, requires `momentum > 0` and `dampening == 0`.
    pub nesterov: bool,
    /// L2 penalty added to the gradient before momentum.
    pub weight_decay: E,
}

impl<E: Float> SgdConfig<E> {
    /// Creates a new `SgdConfig` with momentum and weight decay disabled.
    ///
    /// # Arguments
    /// * `lr` - The learning rate.
    /// * `mu` - The proximal coefficient, `0` degrades to plain gradient descent.
    pub fn new(lr: E, mu: E) -> Self {
        Self {
            lr,
            mu,
            momentum: E::zero(),
            dampening: E::zero(),
            nesterov: false,
            weight_decay: E::zero(),
        }
    }

    pub fn with_momentum(mut self, momentum: E) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_dampening(mut self, dampening: E) -> Self {
        self.dampening = dampening;
        self
    }

    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: E) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    fn validate(&self) -> Result<()> {
        check_lr(self.lr)?;
        check_mu(self.mu)?;
        ensure(
            "momentum",
            self.momentum,
            self.momentum >= E::zero(),
            "must be >= 0",
        )?;
        ensure("dampening", self.dampening, true, "must be finite")?;
        check_weight_decay(self.weight_decay)?;

        if self.nesterov && (self.momentum <= E::zero() || self.dampening != E::zero()) {
            let momentum = self.momentum.to_f64().unwrap_or(f64::NAN);
            return Err(OptimErr::invalid(
                "momentum",
                momentum,
                "nesterov requires momentum > 0 and zero dampening",
            ));
        }

        Ok(())
    }
}

/// Proximal stochastic gradient descent.
///
/// Optional L2 weight decay and (Nesterov) momentum are applied to the raw gradient, then the
/// proximal term is added on top so it never accumulates into the momentum buffer.
#[derive(Debug, Clone)]
pub struct SgdRule<E> {
    config: SgdConfig<E>,
}

impl<E: Float> UpdateRule<E> for SgdRule<E> {
    type Config = SgdConfig<E>;

    fn from_config(config: SgdConfig<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn config(&self) -> &SgdConfig<E> {
        &self.config
    }

    fn mu(&self) -> E {
        self.config.mu
    }

    fn name(&self) -> &'static str {
        "proximal_sgd"
    }

    fn compute_update(
        &self,
        grad: &[E],
        param: &[E],
        state: &mut ProximalState<E>,
        delta: &mut [E],
    ) {
        let SgdConfig {
            lr,
            mu,
            momentum,
            dampening,
            nesterov,
            weight_decay: wd,
        } = self.config;

        state.inc_step();
        let (reference, momentum_buffer) = state.sgd_buffers();

        let decayed = |g: E, p: E| if wd > E::zero() { g + wd * p } else { g };

        if momentum <= E::zero() {
            delta
                .iter_mut()
                .zip(grad)
                .zip(param.iter().zip(reference))
                .for_each(|((d, &g), (&p, &r))| {
                    *d = lr * proximal_grad(decayed(g, p), mu, p, r);
                });

            return;
        }

        let seeding = momentum_buffer.is_none();
        let buf = momentum_buffer
            .get_or_insert_with(|| vec![E::zero(); param.len()].into_boxed_slice());

        delta
            .iter_mut()
            .zip(buf.iter_mut())
            .zip(grad.iter().zip(param.iter().zip(reference)))
            .for_each(|((d, b), (&g, (&p, &r)))| {
                let g = decayed(g, p);

                *b = if seeding {
                    g
                } else {
                    momentum * *b + (E::one() - dampening) * g
                };

                let g = if nesterov { g + momentum * *b } else { *b };
                *d = lr * proximal_grad(g, mu, p, r);
            });
    }
}
