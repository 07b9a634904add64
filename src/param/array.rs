use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};
use num_traits::Float;

use super::Parameter;

/// A parameter of any rank backed by `ndarray`.
///
/// Values and gradient are always stored in standard (row major, contiguous) layout so both can be
/// handed to the optimizers as slices in the same element order.
#[derive(Debug, Clone, PartialEq)]
pub struct NdParam<E> {
    value: ArrayD<E>,
    grad: Option<ArrayD<E>>,
}

impl<E: Float> NdParam<E> {
    /// Creates a new `NdParam` without a gradient.
    ///
    /// # Arguments
    /// * `value` - The initial value, copied into standard layout if needed.
    pub fn new(value: ArrayD<E>) -> Self {
        Self {
            value: standard_layout(value),
            grad: None,
        }
    }

    /// A read only view of the value.
    pub fn value(&self) -> ArrayViewD<'_, E> {
        self.value.view()
    }

    /// A mutable view of the value, its shape can't be changed through it.
    pub fn value_mut(&mut self) -> ArrayViewMutD<'_, E> {
        self.value.view_mut()
    }

    /// The gradient, if one was set.
    pub fn grad(&self) -> Option<ArrayViewD<'_, E>> {
        self.grad.as_ref().map(|g| g.view())
    }

    /// Replaces the gradient. Its shape is checked against the value when stepping.
    pub fn set_grad(&mut self, grad: ArrayD<E>) {
        self.grad = Some(standard_layout(grad));
    }

    /// Removes the gradient so the next step skips this parameter.
    pub fn clear_grad(&mut self) {
        self.grad = None;
    }

    /// Consumes the parameter, returning its value.
    pub fn into_value(self) -> ArrayD<E> {
        self.value
    }
}

impl<E: Float> Parameter for NdParam<E> {
    type Elem = E;

    fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    fn values(&self) -> &[E] {
        contiguous(&self.value)
    }

    fn grad_shape(&self) -> Option<&[usize]> {
        self.grad.as_ref().map(|g| g.shape())
    }

    fn parts_mut(&mut self) -> (&mut [E], Option<&[E]>) {
        let grad = self.grad.as_ref().map(contiguous);
        (contiguous_mut(&mut self.value), grad)
    }
}

fn standard_layout<E: Float>(array: ArrayD<E>) -> ArrayD<E> {
    if array.is_standard_layout() {
        array
    } else {
        array.as_standard_layout().into_owned()
    }
}

// SAFETY: Both buffers only enter an `NdParam` through `standard_layout` and are only exposed as
//         views, which can't change their strides. `as_slice` never fails on a standard layout
//         array, the panic is unreachable.
fn contiguous<E>(array: &ArrayD<E>) -> &[E] {
    array
        .as_slice()
        .expect("NdParam buffers are kept in standard layout")
}

fn contiguous_mut<E>(array: &mut ArrayD<E>) -> &mut [E] {
    array
        .as_slice_mut()
        .expect("NdParam buffers are kept in standard layout")
}
