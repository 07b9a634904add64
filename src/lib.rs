//! FedProx optimizers for federated learning clients.
//!
//! A client trains locally with [`ProximalSgd`] or [`ProximalAdam`], both of which add the FedProx
//! proximal term `mu/2 * ||w - w_global||^2` to the local objective. At the start of every round
//! the client calls `set_global_reference` so the penalty anchors on the freshly received global
//! model, then calls `step` once per mini batch after computing gradients.
//!
//! ```
//! use fedprox::{FlatParam, Parameter, ProximalSgd, SgdConfig};
//!
//! let mut params = vec![FlatParam::new(vec![10.0_f32])];
//! let mut opt = ProximalSgd::new(&params, SgdConfig::new(0.1, 1.0))?;
//!
//! opt.set_global_reference(&params)?;
//! params[0].set_grad(vec![2.0]);
//! opt.step(&mut params)?;
//!
//! assert!((params[0].values()[0] - 9.8).abs() < 1e-6);
//! # Ok::<(), fedprox::OptimErr>(())
//! ```

pub mod error;
pub mod optimizer;
pub mod param;
pub mod rule;
pub mod spec;
pub mod state;

pub use error::{OptimErr, Result};
pub use optimizer::{Optimizer, ProximalAdam, ProximalOptimizer, ProximalSgd};
#[cfg(feature = "ndarray")]
pub use param::NdParam;
pub use param::{FlatParam, Parameter};
pub use rule::{AdamConfig, AdamRule, SgdConfig, SgdRule, UpdateRule};
pub use spec::OptimizerSpec;
pub use state::ProximalState;
