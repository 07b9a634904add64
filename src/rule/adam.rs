use num_traits::Float;

use super::{UpdateRule, check_lr, check_mu, check_weight_decay, ensure, proximal_grad};
use crate::{
    Result,
    state::{AdamBuffers, ProximalState},
};

/// Hyperparameters of [`AdamRule`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig<E> {
    /// Learning rate, must be > 0. Defaults to `1e-3`.
    pub lr: E,
    /// Proximal coefficient, must be >= 0.
    pub mu: E,
    /// Decay rates of the first and second moments, both in `[0, 1)`. Defaults to `(0.9, 0.999)`.
    pub betas: [E; 2],
    /// Added to the denominator for numerical stability, must be > 0. Defaults to `1e-8`.
    pub epsilon: E,
    /// L2 penalty added to the gradient before the proximal term.
    pub weight_decay: E,
    /// Use the running maximum of the second moment (AMSGrad).
    pub amsgrad: bool,
}

impl<E: Float> AdamConfig<E> {
    /// Creates a new `AdamConfig` with the usual moment decay rates.
    ///
    /// # Arguments
    /// * `lr` - The learning rate.
    /// * `mu` - The proximal coefficient, `0` degrades to plain Adam.
    pub fn new(lr: E, mu: E) -> Self {
        Self {
            lr,
            mu,
            betas: [constant(0.9), constant(0.999)],
            epsilon: constant(1e-8),
            weight_decay: E::zero(),
            amsgrad: false,
        }
    }

    /// Creates a new `AdamConfig` with the default learning rate of `1e-3`.
    pub fn with_mu(mu: E) -> Self {
        Self::new(constant(1e-3), mu)
    }

    pub fn with_betas(mut self, beta1: E, beta2: E) -> Self {
        self.betas = [beta1, beta2];
        self
    }

    pub fn with_epsilon(mut self, epsilon: E) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: E) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
        self
    }

    fn validate(&self) -> Result<()> {
        check_lr(self.lr)?;
        check_mu(self.mu)?;

        let unit = |b: E| b >= E::zero() && b < E::one();
        let [beta1, beta2] = self.betas;
        ensure("beta1", beta1, unit(beta1), "must be in [0, 1)")?;
        ensure("beta2", beta2, unit(beta2), "must be in [0, 1)")?;

        ensure(
            "epsilon",
            self.epsilon,
            self.epsilon > E::zero(),
            "must be > 0",
        )?;
        check_weight_decay(self.weight_decay)
    }
}

/// Converts a default into `E`. A value `E` can't hold becomes NaN, which `validate` rejects.
fn constant<E: Float>(value: f64) -> E {
    num_traits::cast(value).unwrap_or_else(E::nan)
}

/// Proximal Adam.
///
/// The proximal term is folded into the gradient before the moments are updated, so the penalty
/// also shapes the adaptive step size.
#[derive(Debug, Clone)]
pub struct AdamRule<E> {
    config: AdamConfig<E>,
}

impl<E: Float> UpdateRule<E> for AdamRule<E> {
    type Config = AdamConfig<E>;

    fn from_config(config: AdamConfig<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn config(&self) -> &AdamConfig<E> {
        &self.config
    }

    fn mu(&self) -> E {
        self.config.mu
    }

    fn name(&self) -> &'static str {
        "proximal_adam"
    }

    fn compute_update(
        &self,
        grad: &[E],
        param: &[E],
        state: &mut ProximalState<E>,
        delta: &mut [E],
    ) {
        let AdamConfig {
            lr,
            mu,
            betas: [b1, b2],
            epsilon: eps,
            weight_decay: wd,
            amsgrad,
        } = self.config;

        let t = i32::try_from(state.inc_step()).unwrap_or(i32::MAX);
        let bc1 = E::one() - b1.powi(t);
        let bc2 = E::one() - b2.powi(t);

        let AdamBuffers {
            reference,
            first_moment: m,
            second_moment: v,
            mut max_second_moment,
        } = state.adam_buffers(amsgrad);

        for i in 0..param.len() {
            let p = param[i];
            let g = if wd > E::zero() { grad[i] + wd * p } else { grad[i] };
            let g = proximal_grad(g, mu, p, reference[i]);

            m[i] = b1 * m[i] + (E::one() - b1) * g;
            v[i] = b2 * v[i] + (E::one() - b2) * g.powi(2);

            let v_t = match max_second_moment.as_deref_mut() {
                Some(v_max) => {
                    v_max[i] = v_max[i].max(v[i]);
                    v_max[i]
                }
                None => v[i],
            };

            let m_hat = m[i] / bc1;
            let v_hat = v_t / bc2;
            delta[i] = lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_defaults() {
        let cfg = AdamConfig::<f64>::with_mu(0.01);
        assert_eq!(cfg.lr, 1e-3);
        assert_eq!(cfg.betas, [0.9, 0.999]);
        assert_eq!(cfg.epsilon, 1e-8);
        assert!(!cfg.amsgrad);
    }

    #[test]
    fn test_config_validation() {
        let ok = AdamConfig::new(0.01_f32, 0.1);
        assert!(AdamRule::from_config(ok).is_ok());
        assert!(AdamRule::from_config(ok.with_betas(0.0, 0.0)).is_ok());

        assert!(AdamRule::from_config(ok.with_betas(1.0, 0.999)).is_err());
        assert!(AdamRule::from_config(ok.with_betas(0.9, 1.0)).is_err());
        assert!(AdamRule::from_config(ok.with_betas(-0.1, 0.999)).is_err());
        assert!(AdamRule::from_config(ok.with_epsilon(0.0)).is_err());
        assert!(AdamRule::from_config(ok.with_epsilon(f32::NAN)).is_err());
        assert!(AdamRule::from_config(ok.with_betas(f32::NAN, 0.999)).is_err());
        assert!(AdamRule::from_config(ok.with_weight_decay(-1.0)).is_err());
        assert!(AdamRule::from_config(AdamConfig::new(0.0_f32, 0.1)).is_err());
        assert!(AdamRule::from_config(AdamConfig::new(0.01_f32, -0.1)).is_err());
    }

    #[test]
    fn test_first_step_recovers_raw_magnitude() {
        let rule = AdamRule::from_config(AdamConfig::new(0.1, 1.0)).unwrap();
        let mut state = ProximalState::new(&[10.0]);
        let mut delta = [0.0];

        rule.compute_update(&[2.0], &[10.0], &mut state, &mut delta);

        assert_eq!(state.step_count(), 1);
        assert_close(state.first_moment().unwrap()[0], 0.2);
        assert_close(state.second_moment().unwrap()[0], 0.004);

        // m_hat = 2, v_hat = 4
        assert_close(delta[0], 0.1 * 2.0 / (2.0 + 1e-8));
    }

    #[test]
    fn test_moments_see_the_proximal_gradient() {
        let rule = AdamRule::from_config(AdamConfig::new(0.1, 1.0)).unwrap();
        let mut state = ProximalState::new(&[10.0]);
        let mut delta = [0.0];

        rule.compute_update(&[0.0], &[12.0], &mut state, &mut delta);

        assert_close(state.first_moment().unwrap()[0], 0.2);
        assert!(delta[0] > 0.0);
    }

    #[test]
    fn test_weight_decay_enters_the_moments() {
        let cfg = AdamConfig::new(0.1, 0.5).with_weight_decay(0.5);
        let rule = AdamRule::from_config(cfg).unwrap();
        let mut state = ProximalState::new(&[4.0]);
        let mut delta = [0.0];

        rule.compute_update(&[1.0], &[6.0], &mut state, &mut delta);

        // g' = 1 + 0.5 * 6 + 0.5 * (6 - 4)
        assert_close(state.first_moment().unwrap()[0], 0.1 * 5.0);
        assert_close(state.second_moment().unwrap()[0], 0.001 * 25.0);
    }

    #[test]
    fn test_amsgrad_steps_with_the_largest_second_moment() {
        let (lr, b1, b2, eps) = (0.1, 0.9, 0.999, 1e-8);
        let rule = AdamRule::from_config(AdamConfig::new(lr, 0.0).with_amsgrad(true)).unwrap();
        let mut state = ProximalState::new(&[0.0]);
        let mut delta = [0.0];

        rule.compute_update(&[10.0], &[0.0], &mut state, &mut delta);
        rule.compute_update(&[0.0], &[0.0], &mut state, &mut delta);

        let m = state.first_moment().unwrap()[0];
        let v = state.second_moment().unwrap()[0];
        let v_max = state.max_second_moment().unwrap()[0];
        assert!(v < v_max);

        let m_hat = m / (1.0 - f64::powi(b1, 2));
        let bc2 = 1.0 - f64::powi(b2, 2);
        assert_close(delta[0], lr * m_hat / ((v_max / bc2).sqrt() + eps));

        let plain = lr * m_hat / ((v / bc2).sqrt() + eps);
        assert!(delta[0] < plain);
    }

    #[test]
    fn test_amsgrad_keeps_the_largest_second_moment() {
        let cfg = AdamConfig::new(0.1, 0.0).with_amsgrad(true);
        let rule = AdamRule::from_config(cfg).unwrap();
        let mut state = ProximalState::new(&[0.0]);
        let mut delta = [0.0];

        rule.compute_update(&[10.0], &[0.0], &mut state, &mut delta);
        let peak = state.max_second_moment().unwrap()[0];

        rule.compute_update(&[0.0], &[0.0], &mut state, &mut delta);

        let v = state.second_moment().unwrap()[0];
        assert!(v < peak);
        assert_eq!(state.max_second_moment().unwrap()[0], peak);
    }
}
