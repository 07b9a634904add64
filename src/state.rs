use num_traits::Float;

/// Per-parameter memory kept by the proximal optimizers across steps and rounds.
///
/// Holds the global reference point of the parameter plus whatever buffers the update rule needs.
/// It does no arithmetic of its own, the rules in [`crate::rule`] read and write it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximalState<E> {
    reference: Box<[E]>,
    step_count: u64,
    first_moment: Option<Box<[E]>>,
    second_moment: Option<Box<[E]>>,
    max_second_moment: Option<Box<[E]>>,
    momentum_buffer: Option<Box<[E]>>,
}

impl<E: Float> ProximalState<E> {
    /// Creates a new `ProximalState` whose reference is a copy of `values`.
    ///
    /// # Arguments
    /// * `values` - The parameter values at the moment it is first seen.
    pub fn new(values: &[E]) -> Self {
        Self {
            reference: values.into(),
            step_count: 0,
            first_moment: None,
            second_moment: None,
            max_second_moment: None,
            momentum_buffer: None,
        }
    }

    /// Copies `values` into the reference, reusing its allocation when the length is unchanged.
    ///
    /// # Arguments
    /// * `values` - The current values of the parameter.
    pub fn capture(&mut self, values: &[E]) {
        if self.reference.len() == values.len() {
            self.reference.copy_from_slice(values);
        } else {
            self.reference = values.into();
        }
    }

    /// The global reference point.
    pub fn reference(&self) -> &[E] {
        &self.reference
    }

    /// How many updates have been applied to this parameter.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// The exponential moving average of the gradient, once allocated.
    pub fn first_moment(&self) -> Option<&[E]> {
        self.first_moment.as_deref()
    }

    /// The exponential moving average of the squared gradient, once allocated.
    pub fn second_moment(&self) -> Option<&[E]> {
        self.second_moment.as_deref()
    }

    /// The running maximum of the second moment, only kept by amsgrad.
    pub fn max_second_moment(&self) -> Option<&[E]> {
        self.max_second_moment.as_deref()
    }

    /// The SGD momentum buffer, once allocated.
    pub fn momentum_buffer(&self) -> Option<&[E]> {
        self.momentum_buffer.as_deref()
    }

    /// Drops every moment buffer and restarts the step count, the reference is kept.
    pub fn reset_moments(&mut self) {
        self.step_count = 0;
        self.first_moment = None;
        self.second_moment = None;
        self.max_second_moment = None;
        self.momentum_buffer = None;
    }

    #[inline]
    pub(crate) fn inc_step(&mut self) -> u64 {
        self.step_count += 1;
        self.step_count
    }

    /// Splits the state into the reference and the zero-initialized Adam moments.
    pub(crate) fn adam_buffers(&mut self, amsgrad: bool) -> AdamBuffers<'_, E> {
        let len = self.reference.len();
        let zeros = || vec![E::zero(); len].into_boxed_slice();

        let max_second_moment = if amsgrad {
            Some(&mut **self.max_second_moment.get_or_insert_with(zeros))
        } else {
            None
        };

        AdamBuffers {
            reference: &*self.reference,
            first_moment: &mut **self.first_moment.get_or_insert_with(zeros),
            second_moment: &mut **self.second_moment.get_or_insert_with(zeros),
            max_second_moment,
        }
    }

    /// Splits the state into the reference and the momentum buffer, `None` if it wasn't seeded yet.
    pub(crate) fn sgd_buffers(&mut self) -> (&[E], &mut Option<Box<[E]>>) {
        (&*self.reference, &mut self.momentum_buffer)
    }
}

/// Disjoint borrows of the buffers an Adam update touches.
pub(crate) struct AdamBuffers<'a, E> {
    pub reference: &'a [E],
    pub first_moment: &'a mut [E],
    pub second_moment: &'a mut [E],
    pub max_second_moment: Option<&'a mut [E]>,
}
