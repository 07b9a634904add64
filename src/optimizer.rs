use log::{debug, trace};
use num_traits::Float;

use crate::{
    Result,
    error::OptimErr,
    param::Parameter,
    rule::{AdamRule, SgdRule, UpdateRule},
    state::ProximalState,
};

/// Proximal gradient descent, see [`crate::SgdConfig`].
pub type ProximalSgd<E> = ProximalOptimizer<E, SgdRule<E>>;

/// Proximal Adam, see [`crate::AdamConfig`].
pub type ProximalAdam<E> = ProximalOptimizer<E, AdamRule<E>>;

/// Defines the local training interface a federated client drives.
///
/// Parameters are identified by their position in the slice, callers must always pass the same
/// parameters in the same order they were given at construction.
pub trait Optimizer<P: Parameter> {
    /// Applies one update to every parameter holding a gradient.
    ///
    /// # Arguments
    /// * `params` - The managed parameters, updated in place.
    ///
    /// # Returns
    /// An error, before any parameter is modified, if a shape or the amount of parameters is wrong.
    fn step(&mut self, params: &mut [P]) -> Result<()>;

    /// Snapshots the current parameter values as the anchor of the proximal term.
    ///
    /// # Arguments
    /// * `params` - The managed parameters, as received at the start of the round.
    fn set_global_reference(&mut self, params: &[P]) -> Result<()>;

    /// Uses externally supplied global weights as the anchor of the proximal term.
    ///
    /// # Arguments
    /// * `weights` - One flat buffer per parameter, in parameter order.
    fn set_global_weights(&mut self, weights: &[&[P::Elem]]) -> Result<()>;

    /// Computes `mu / 2 * ||params - reference||^2`.
    fn proximal_penalty(&self, params: &[P]) -> Result<P::Elem>;

    /// Clears every moment buffer and step count, references are kept.
    fn reset_moments(&mut self);

    /// The state of the parameter at `index`.
    fn state(&self, index: usize) -> Option<&ProximalState<P::Elem>>;
}

/// A FedProx optimizer: any [`UpdateRule`] plus the per-parameter proximal state it needs.
///
/// The reference of every parameter is captured at construction, so stepping before the first
/// call to `set_global_reference` penalizes the drift from the construction time values.
#[derive(Debug, Clone)]
pub struct ProximalOptimizer<E, R> {
    rule: R,
    states: Vec<ProximalState<E>>,
    shapes: Vec<Box<[usize]>>,
    delta: Vec<E>,
}

impl<E: Float, R: UpdateRule<E>> ProximalOptimizer<E, R> {
    /// Creates a new `ProximalOptimizer` managing `params`.
    ///
    /// # Arguments
    /// * `params` - The parameters to train, their shapes are fixed from here on.
    /// * `config` - The hyperparameters of the update rule.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error if `config` is out of range.
    pub fn new<P>(params: &[P], config: R::Config) -> Result<Self>
    where
        P: Parameter<Elem = E>,
    {
        let rule = R::from_config(config)?;
        let states: Vec<_> = params
            .iter()
            .map(|p| ProximalState::new(p.values()))
            .collect();
        let shapes: Vec<Box<[usize]>> = params.iter().map(|p| p.shape().into()).collect();

        debug!(optimizer = rule.name(), params = params.len(); "optimizer created");

        Ok(Self {
            rule,
            states,
            shapes,
            delta: Vec::new(),
        })
    }

    /// Applies one update to every parameter holding a gradient, parameters without one are left
    /// untouched and their step count doesn't advance.
    ///
    /// # Arguments
    /// * `params` - The managed parameters, updated in place.
    ///
    /// # Returns
    /// A `ParamCountMismatch` or `ShapeMismatch` error, in which case nothing was modified.
    pub fn step<P>(&mut self, params: &mut [P]) -> Result<()>
    where
        P: Parameter<Elem = E>,
    {
        self.check_params(params)?;

        for (index, param) in params.iter().enumerate() {
            match param.grad_shape() {
                Some(grad_shape) if grad_shape != param.shape() => {
                    return Err(OptimErr::ShapeMismatch {
                        index,
                        what: "gradient",
                        got: grad_shape.to_vec(),
                        expected: param.shape().to_vec(),
                    });
                }
                _ => {}
            }
        }

        let Self {
            rule, states, delta, ..
        } = self;

        let mut updated = 0;
        for (param, state) in params.iter_mut().zip(states.iter_mut()) {
            let (values, grad) = param.parts_mut();
            let Some(grad) = grad else {
                continue;
            };

            delta.clear();
            delta.resize(values.len(), E::zero());
            rule.compute_update(grad, values, state, delta);

            values
                .iter_mut()
                .zip(delta.iter())
                .for_each(|(p, &d)| *p = *p - d);

            updated += 1;
        }

        trace!(
            optimizer = rule.name(),
            updated = updated,
            skipped = params.len() - updated;
            "step applied"
        );

        Ok(())
    }

    /// Snapshots the current values of every parameter as its global reference.
    ///
    /// Must be called once at the start of every local round, before the first `step`.
    pub fn set_global_reference<P>(&mut self, params: &[P]) -> Result<()>
    where
        P: Parameter<Elem = E>,
    {
        self.check_params(params)?;

        self.states
            .iter_mut()
            .zip(params)
            .for_each(|(state, param)| state.capture(param.values()));

        debug!(optimizer = self.rule.name(), params = params.len(); "captured global reference");
        Ok(())
    }

    /// Uses `weights` as the global reference instead of the current parameter values, for when
    /// the global model arrives as flat buffers before it is loaded into the parameters.
    ///
    /// # Arguments
    /// * `weights` - One buffer per parameter, each as long as the parameter.
    pub fn set_global_weights<W>(&mut self, weights: &[W]) -> Result<()>
    where
        W: AsRef<[E]>,
    {
        self.check_count(weights.len())?;

        for (index, (w, shape)) in weights.iter().zip(&self.shapes).enumerate() {
            let expected: usize = shape.iter().product();
            if w.as_ref().len() != expected {
                return Err(OptimErr::ShapeMismatch {
                    index,
                    what: "global weights",
                    got: vec![w.as_ref().len()],
                    expected: shape.to_vec(),
                });
            }
        }

        self.states
            .iter_mut()
            .zip(weights)
            .for_each(|(state, w)| state.capture(w.as_ref()));

        debug!(optimizer = self.rule.name(), params = weights.len(); "loaded global weights");
        Ok(())
    }

    /// Computes the proximal penalty `mu / 2 * ||params - reference||^2` over every parameter.
    pub fn proximal_penalty<P>(&self, params: &[P]) -> Result<E>
    where
        P: Parameter<Elem = E>,
    {
        self.check_params(params)?;

        let sq_dist = params
            .iter()
            .zip(&self.states)
            .flat_map(|(param, state)| param.values().iter().zip(state.reference()))
            .fold(E::zero(), |acc, (&p, &r)| acc + (p - r).powi(2));

        let two = E::one() + E::one();
        Ok(self.rule.mu() / two * sq_dist)
    }

    /// Clears the moment buffers and step counts of every parameter, references are kept.
    pub fn reset_moments(&mut self) {
        self.states.iter_mut().for_each(ProximalState::reset_moments);
        debug!(optimizer = self.rule.name(); "moments reset");
    }

    /// The state of the parameter at `index`.
    pub fn state(&self, index: usize) -> Option<&ProximalState<E>> {
        self.states.get(index)
    }

    /// The state of every managed parameter, in parameter order.
    pub fn states(&self) -> &[ProximalState<E>] {
        &self.states
    }

    /// The hyperparameters in use.
    pub fn config(&self) -> &R::Config {
        self.rule.config()
    }

    /// The amount of managed parameters.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn check_count(&self, got: usize) -> Result<()> {
        if got != self.states.len() {
            return Err(OptimErr::ParamCountMismatch {
                got,
                expected: self.states.len(),
            });
        }

        Ok(())
    }

    fn check_params<P>(&self, params: &[P]) -> Result<()>
    where
        P: Parameter<Elem = E>,
    {
        self.check_count(params.len())?;

        for (index, (param, shape)) in params.iter().zip(&self.shapes).enumerate() {
            if param.shape() != &shape[..] {
                return Err(OptimErr::ShapeMismatch {
                    index,
                    what: "parameter",
                    got: param.shape().to_vec(),
                    expected: shape.to_vec(),
                });
            }
        }

        Ok(())
    }
}

impl<P, R> Optimizer<P> for ProximalOptimizer<P::Elem, R>
where
    P: Parameter,
    R: UpdateRule<P::Elem>,
{
    fn step(&mut self, params: &mut [P]) -> Result<()> {
        ProximalOptimizer::step(self, params)
    }

    fn set_global_reference(&mut self, params: &[P]) -> Result<()> {
        ProximalOptimizer::set_global_reference(self, params)
    }

    fn set_global_weights(&mut self, weights: &[&[P::Elem]]) -> Result<()> {
        ProximalOptimizer::set_global_weights(self, weights)
    }

    fn proximal_penalty(&self, params: &[P]) -> Result<P::Elem> {
        ProximalOptimizer::proximal_penalty(self, params)
    }

    fn reset_moments(&mut self) {
        ProximalOptimizer::reset_moments(self)
    }

    fn state(&self, index: usize) -> Option<&ProximalState<P::Elem>> {
        ProximalOptimizer::state(self, index)
    }
}

impl<P: Parameter, T: Optimizer<P> + ?Sized> Optimizer<P> for Box<T> {
    fn step(&mut self, params: &mut [P]) -> Result<()> {
        (**self).step(params)
    }

    fn set_global_reference(&mut self, params: &[P]) -> Result<()> {
        (**self).set_global_reference(params)
    }

    fn set_global_weights(&mut self, weights: &[&[P::Elem]]) -> Result<()> {
        (**self).set_global_weights(weights)
    }

    fn proximal_penalty(&self, params: &[P]) -> Result<P::Elem> {
        (**self).proximal_penalty(params)
    }

    fn reset_moments(&mut self) {
        (**self).reset_moments()
    }

    fn state(&self, index: usize) -> Option<&ProximalState<P::Elem>> {
        (**self).state(index)
    }
}
