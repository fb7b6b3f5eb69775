use ndarray::{ArrayD, IxDyn};
use rand::distributions::Distribution as _;
use rand::Rng;

/// Specifies with what values a parameter should be initialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    /// Fills the buffer with the specified value everywhere.
    Constant(f64),
    /// Fills the buffer with 0s everywhere.
    Zeros,
    /// Fills the buffer with 1s everywhere.
    Ones,
    /// Values drawn uniformly between the specified bounds (inclusive).
    Uniform(f64, f64),
    /// Values drawn from a normal distribution with the specified mean and
    /// standard deviation.
    Normal(f64, f64),
}

impl Initializer {
    /// Produces a dense array of the given shape.
    pub fn init(&self, shape: &[usize]) -> ArrayD<f32> {
        let mut rng = rand::thread_rng();
        self.init_with(shape, &mut rng)
    }

    /// Same as [`init`](Self::init) with a caller-supplied generator, for
    /// reproducible sampling.
    pub fn init_with<R: Rng>(&self, shape: &[usize], rng: &mut R) -> ArrayD<f32> {
        let dim = IxDyn(shape);
        match self {
            Self::Constant(value) => ArrayD::from_elem(dim, *value as f32),
            Self::Zeros => ArrayD::zeros(dim),
            Self::Ones => ArrayD::ones(dim),
            Self::Uniform(low, high) => {
                let distribution = rand::distributions::Uniform::new_inclusive(*low, *high);
                ArrayD::from_shape_simple_fn(dim, || distribution.sample(rng) as f32)
            }
            Self::Normal(mean, std) => {
                let distribution = rand_distr::Normal::new(*mean, *std)
                    .expect("standard deviation must be finite and non-negative");
                ArrayD::from_shape_simple_fn(dim, || distribution.sample(rng) as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fills_every_element() {
        let values = Initializer::Constant(0.5).init(&[3, 2]);
        assert_eq!(values.shape(), &[3, 2]);
        assert!(values.iter().all(|v| *v == 0.5));
    }

    #[test]
    fn zeros_and_ones() {
        assert!(Initializer::Zeros.init(&[4]).iter().all(|v| *v == 0.0));
        assert!(Initializer::Ones.init(&[4]).iter().all(|v| *v == 1.0));
    }

    #[test]
    fn uniform_respects_bounds() {
        let values = Initializer::Uniform(-2.0, 2.0).init(&[100]);
        assert!(values.iter().all(|v| (-2.0..=2.0).contains(v)));
    }

    #[test]
    fn normal_has_requested_shape() {
        let values = Initializer::Normal(0.0, 1.0).init(&[5, 5]);
        assert_eq!(values.shape(), &[5, 5]);
    }
}
