use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::{
    AdamConfig, ProximalAdam, ProximalSgd, Result, SgdConfig, error::OptimErr, optimizer::Optimizer,
    param::Parameter,
};

/// The specification of a proximal optimizer, as it travels in a client's training config.
///
/// Hyperparameters are `f64` and converted to the precision of the parameters when built, every
/// optional field takes the documented default of its config type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    ProximalSgd {
        lr: f64,
        mu: f64,
        #[serde(default)]
        momentum: f64,
        #[serde(default)]
        dampening: f64,
        #[serde(default)]
        nesterov: bool,
        #[serde(default)]
        weight_decay: f64,
    },
    ProximalAdam {
        #[serde(default = "default_adam_lr")]
        lr: f64,
        mu: f64,
        #[serde(default = "default_betas")]
        betas: [f64; 2],
        #[serde(default = "default_epsilon")]
        epsilon: f64,
        #[serde(default)]
        weight_decay: f64,
        #[serde(default)]
        amsgrad: bool,
    },
}

fn default_adam_lr() -> f64 {
    1e-3
}

fn default_betas() -> [f64; 2] {
    [0.9, 0.999]
}

fn default_epsilon() -> f64 {
    1e-8
}

impl OptimizerSpec {
    /// Parses a spec from its json representation.
    ///
    /// # Returns
    /// An `InvalidSpec` error if `json` doesn't describe a known optimizer.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes this spec into json.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Builds the optimizer described by this spec.
    ///
    /// # Arguments
    /// * `params` - The parameters the optimizer will manage.
    ///
    /// # Returns
    /// A boxed optimizer, or an `InvalidHyperparameter` error if a value is out of range or can't
    /// be represented in the parameters' precision.
    pub fn build<P>(&self, params: &[P]) -> Result<Box<dyn Optimizer<P>>>
    where
        P: Parameter + 'static,
    {
        match *self {
            OptimizerSpec::ProximalSgd {
                lr,
                mu,
                momentum,
                dampening,
                nesterov,
                weight_decay,
            } => {
                let cfg = SgdConfig::new(cast("lr", lr)?, cast("mu", mu)?)
                    .with_momentum(cast("momentum", momentum)?)
                    .with_dampening(cast("dampening", dampening)?)
                    .with_nesterov(nesterov)
                    .with_weight_decay(cast("weight_decay", weight_decay)?);

                Ok(Box::new(ProximalSgd::new(params, cfg)?))
            }
            OptimizerSpec::ProximalAdam {
                lr,
                mu,
                betas: [beta1, beta2],
                epsilon,
                weight_decay,
                amsgrad,
            } => {
                let cfg = AdamConfig::new(cast("lr", lr)?, cast("mu", mu)?)
                    .with_betas(cast("beta1", beta1)?, cast("beta2", beta2)?)
                    .with_epsilon(cast("epsilon", epsilon)?)
                    .with_weight_decay(cast("weight_decay", weight_decay)?)
                    .with_amsgrad(amsgrad);

                Ok(Box::new(ProximalAdam::new(params, cfg)?))
            }
        }
    }
}

fn cast<E: Float>(name: &'static str, value: f64) -> Result<E> {
    num_traits::cast(value)
        .ok_or_else(|| OptimErr::invalid(name, value, "not representable in the parameter type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatParam;

    #[test]
    fn test_defaults_are_filled_in() {
        let spec = OptimizerSpec::from_json(r#"{"proximal_adam": {"mu": 0.01}}"#).unwrap();

        assert_eq!(
            spec,
            OptimizerSpec::ProximalAdam {
                lr: 1e-3,
                mu: 0.01,
                betas: [0.9, 0.999],
                epsilon: 1e-8,
                weight_decay: 0.0,
                amsgrad: false,
            }
        );
    }

    #[test]
    fn test_unknown_optimizer_is_rejected() {
        let res = OptimizerSpec::from_json(r#"{"rmsprop": {"lr": 0.1}}"#);
        assert!(matches!(res, Err(OptimErr::InvalidSpec(_))));
    }

    #[test]
    fn test_sgd_requires_lr() {
        let res = OptimizerSpec::from_json(r#"{"proximal_sgd": {"mu": 0.1}}"#);
        assert!(matches!(res, Err(OptimErr::InvalidSpec(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let spec = OptimizerSpec::ProximalSgd {
            lr: 0.05,
            mu: 0.1,
            momentum: 0.9,
            dampening: 0.0,
            nesterov: true,
            weight_decay: 0.0,
        };

        let json = spec.to_json().unwrap();
        assert_eq!(OptimizerSpec::from_json(&json).unwrap(), spec);
    }

    #[test]
    fn test_build_validates_hyperparameters() {
        let params = [FlatParam::new(vec![1.0_f32])];
        let spec = OptimizerSpec::from_json(r#"{"proximal_adam": {"mu": 0.1, "betas": [1.0, 0.9]}}"#)
            .unwrap();

        let Err(OptimErr::InvalidHyperparameter { name, .. }) = spec.build(&params) else {
            panic!("beta1 = 1 must be rejected");
        };
        assert_eq!(name, "beta1");
    }

    #[test]
    fn test_f64_values_overflowing_f32_are_rejected() {
        let params = [FlatParam::new(vec![1.0_f32])];
        let spec = OptimizerSpec::ProximalSgd {
            lr: 1e300,
            mu: 0.0,
            momentum: 0.0,
            dampening: 0.0,
            nesterov: false,
            weight_decay: 0.0,
        };

        assert!(spec.build(&params).is_err());
    }
}
