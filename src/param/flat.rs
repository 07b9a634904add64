use num_traits::Float;

use super::Parameter;

/// A one dimensional parameter backed by plain vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatParam<E> {
    shape: [usize; 1],
    values: Vec<E>,
    grad: Option<Vec<E>>,
    grad_shape: [usize; 1],
}

impl<E: Float> FlatParam<E> {
    /// Creates a new `FlatParam` without a gradient.
    ///
    /// # Arguments
    /// * `values` - The initial values of the parameter.
    pub fn new(values: Vec<E>) -> Self {
        Self {
            shape: [values.len()],
            values,
            grad: None,
            grad_shape: [0],
        }
    }

    /// Mutable access to the values, the length is fixed.
    pub fn values_mut(&mut self) -> &mut [E] {
        &mut self.values
    }

    /// The gradient, if one was set.
    pub fn grad(&self) -> Option<&[E]> {
        self.grad.as_deref()
    }

    /// Replaces the gradient. Its length is checked against the values when stepping.
    pub fn set_grad(&mut self, grad: Vec<E>) {
        self.grad_shape = [grad.len()];
        self.grad = Some(grad);
    }

    /// Removes the gradient so the next step skips this parameter.
    pub fn clear_grad(&mut self) {
        self.grad = None;
    }
}

impl<E: Float> Parameter for FlatParam<E> {
    type Elem = E;

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn values(&self) -> &[E] {
        &self.values
    }

    fn grad_shape(&self) -> Option<&[usize]> {
        self.grad.as_ref().map(|_| &self.grad_shape[..])
    }

    fn parts_mut(&mut self) -> (&mut [E], Option<&[E]>) {
        (&mut self.values, self.grad.as_deref())
    }
}

impl<E: Float> From<Vec<E>> for FlatParam<E> {
    fn from(values: Vec<E>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grad_lifecycle() {
        let mut param = FlatParam::new(vec![1.0_f32, 2.0]);
        assert!(!param.has_grad());
        assert_eq!(param.grad_shape(), None);

        param.set_grad(vec![0.5, 0.5, 0.5]);
        assert_eq!(param.shape(), &[2]);
        assert_eq!(param.grad_shape(), Some(&[3][..]));
        assert_eq!(param.grad(), Some(&[0.5, 0.5, 0.5][..]));

        param.clear_grad();
        assert!(!param.has_grad());
        assert_eq!(param.grad(), None);
    }

    #[test]
    fn test_parts_mut_splits_borrows() {
        let mut param = FlatParam::new(vec![1.0_f64, 2.0]);
        param.set_grad(vec![1.0, 1.0]);

        let (values, grad) = param.parts_mut();
        let grad = grad.unwrap();
        values.iter_mut().zip(grad).for_each(|(v, g)| *v -= g);

        assert_eq!(param.values(), &[0.0, 1.0]);
    }
}
