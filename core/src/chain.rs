//! Ordered transform chains.
//!
//! Each step maps the accumulator to a new value. A step returning `None`
//! leaves the accumulator as it was before that step.

/// A boxed chain step
pub type Step<'a, T> = Box<dyn Fn(&T) -> Option<T> + Send + Sync + 'a>;

/// An ordered list of transforms over `T`
pub struct Chain<'a, T> {
    steps: Vec<Step<'a, T>>,
}

impl<T> Default for Chain<'_, T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<'a, T> Chain<'a, T> {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    #[must_use]
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: Fn(&T) -> Option<T> + Send + Sync + 'a,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order starting from `init`
    pub fn run(&self, init: T) -> T {
        self.steps
            .iter()
            .fold(init, |acc, step| step(&acc).unwrap_or(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_in_order() {
        let chain = Chain::new().then(|n: &i32| Some(n + 1)).then(|n: &i32| Some(n * 10));

        assert_eq!(chain.run(1), 20);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn none_carries_accumulator_forward() {
        let chain = Chain::new()
            .then(|s: &String| Some(format!("{s}-a")))
            .then(|_: &String| None)
            .then(|s: &String| Some(format!("{s}-c")));

        assert_eq!(chain.run("x".to_string()), "x-a-c");
    }

    #[test]
    fn empty_chain_is_identity() {
        assert_eq!(Chain::<u8>::new().run(7), 7);
    }
}
