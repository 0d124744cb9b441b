//! Gradient-based parameter optimization

use crate::{MathError, Result};

/// Adam optimizer over a flat parameter vector
///
/// Moment estimates are kept per parameter, so one optimizer instance must
/// always be stepped with the same parameter layout.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: u64,
    first_moment: Vec<f64>,
    second_moment: Vec<f64>,
}

impl Adam {
    /// Create an optimizer for `size` parameters with the usual defaults
    /// (beta1 = 0.9, beta2 = 0.999, epsilon = 1e-7)
    pub fn new(size: usize, learning_rate: f64) -> Result<Self> {
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Learning rate must be positive, got {}",
                learning_rate
            )));
        }

        Ok(Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            first_moment: vec![0.0; size],
            second_moment: vec![0.0; size],
        })
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Apply one update to `params` using `grads`
    pub fn update(&mut self, params: &mut [f64], grads: &[f64]) -> Result<()> {
        if params.len() != self.first_moment.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.first_moment.len(),
                actual: params.len(),
            });
        }
        if grads.len() != params.len() {
            return Err(MathError::DimensionMismatch {
                expected: params.len(),
                actual: grads.len(),
            });
        }

        self.step += 1;
        let t = self.step as i32;
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        for i in 0..params.len() {
            let g = grads[i];
            self.first_moment[i] = self.beta1 * self.first_moment[i] + (1.0 - self.beta1) * g;
            self.second_moment[i] =
                self.beta2 * self.second_moment[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.first_moment[i] / bias1;
            let v_hat = self.second_moment[i] / bias2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_quadratic() {
        // f(x, y) = (x - 3)^2 + (y + 1)^2
        let mut params = vec![0.0, 0.0];
        let mut adam = Adam::new(2, 0.1).unwrap();

        for _ in 0..1000 {
            let grads = vec![2.0 * (params[0] - 3.0), 2.0 * (params[1] + 1.0)];
            adam.update(&mut params, &grads).unwrap();
        }

        assert!((params[0] - 3.0).abs() < 5e-2);
        assert!((params[1] + 1.0).abs() < 5e-2);
        assert_eq!(adam.steps(), 1000);
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut params = vec![1.0];
        let mut adam = Adam::new(1, 0.01).unwrap();
        adam.update(&mut params, &[4.0]).unwrap();
        assert!((params[0] - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Adam::new(2, 0.0).is_err());
        assert!(Adam::new(2, f64::NAN).is_err());

        let mut adam = Adam::new(2, 0.01).unwrap();
        let mut params = vec![0.0; 3];
        assert!(adam.update(&mut params, &[0.0; 3]).is_err());

        let mut params = vec![0.0; 2];
        assert!(adam.update(&mut params, &[0.0]).is_err());
    }
}
