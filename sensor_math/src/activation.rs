//! Activation functions and their derivatives

/// Logistic sigmoid
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // Avoid overflow of exp for large negative inputs
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Derivative of the sigmoid expressed through its output `s = sigmoid(x)`
pub fn sigmoid_grad(s: f64) -> f64 {
    s * (1.0 - s)
}

/// Derivative of tanh expressed through its output `t = tanh(x)`
pub fn tanh_grad(t: f64) -> f64 {
    1.0 - t * t
}
