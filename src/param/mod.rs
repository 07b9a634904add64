//! Tensor backends the optimizers can drive.
//!
//! Parameters are owned by the surrounding training framework. The optimizers only need to read the
//! value buffer, write it in place and read the gradient that was populated externally, so any
//! storage implementing [`Parameter`] can be plugged in. [`FlatParam`] is always available,
//! [`NdParam`] is built with the `ndarray` feature.

#[cfg(feature = "ndarray")]
mod array;
mod flat;

#[cfg(feature = "ndarray")]
pub use array::NdParam;
pub use flat::FlatParam;

use num_traits::Float;

/// A trainable parameter: a value buffer plus an optional gradient buffer.
///
/// Both buffers are exposed as contiguous slices in the same element order, implementors must keep
/// `values().len()` equal to the product of `shape()` and the gradient length equal to the product
/// of `grad_shape()`.
pub trait Parameter {
    /// The floating point type of the values, gradients are read in the same precision.
    type Elem: Float;

    /// The shape of the value buffer.
    fn shape(&self) -> &[usize];

    /// The current values.
    fn values(&self) -> &[Self::Elem];

    /// The shape of the gradient, `None` when this parameter took no part in the last loss.
    fn grad_shape(&self) -> Option<&[usize]>;

    /// Borrows the values mutably and the gradient immutably at the same time.
    ///
    /// # Returns
    /// The value buffer and the gradient, if any.
    fn parts_mut(&mut self) -> (&mut [Self::Elem], Option<&[Self::Elem]>);

    /// Whether a gradient is currently populated.
    fn has_grad(&self) -> bool {
        self.grad_shape().is_some()
    }
}
