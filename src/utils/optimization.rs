//! Bounded Nelder-Mead simplex minimization.

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the algorithm converged.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on both objective spread and simplex size.
    pub tolerance: f64,
    /// Reflection coefficient (default: 1.0).
    pub alpha: f64,
    /// Expansion coefficient (default: 2.0).
    pub gamma: f64,
    /// Contraction coefficient (default: 0.5).
    pub rho: f64,
    /// Shrinkage coefficient (default: 0.5).
    pub sigma: f64,
    /// Initial simplex step size (default: 0.05).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

impl NelderMeadConfig {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }
}

struct Simplex<'a, F> {
    objective: F,
    bounds: Option<&'a [(f64, f64)]>,
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn new(objective: F, initial: &[f64], bounds: Option<&'a [(f64, f64)]>, step: f64) -> Self {
        let mut simplex = Self {
            objective,
            bounds,
            vertices: Vec::with_capacity(initial.len() + 1),
            values: Vec::with_capacity(initial.len() + 1),
        };

        simplex.push(initial.to_vec());
        for i in 0..initial.len() {
            let mut vertex = initial.to_vec();
            vertex[i] += if initial[i].abs() > 1e-10 {
                step * initial[i].abs()
            } else {
                step
            };
            simplex.push(vertex);
        }
        simplex
    }

    /// Objective at `point` after clamping; non-finite values rank last.
    fn evaluate(&self, point: &mut [f64]) -> f64 {
        if let Some(bounds) = self.bounds {
            for (x, &(lo, hi)) in point.iter_mut().zip(bounds.iter()) {
                *x = x.clamp(lo, hi);
            }
        }
        let value = (self.objective)(point);
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    }

    fn push(&mut self, mut vertex: Vec<f64>) {
        let value = self.evaluate(&mut vertex);
        self.vertices.push(vertex);
        self.values.push(value);
    }

    fn replace(&mut self, idx: usize, vertex: Vec<f64>, value: f64) {
        self.vertices[idx] = vertex;
        self.values[idx] = value;
    }

    /// Indices of (best, second worst, worst).
    fn order(&self) -> (usize, usize, usize) {
        let mut indices: Vec<usize> = (0..self.values.len()).collect();
        indices.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        let n = indices.len() - 1;
        (indices[0], indices[n - 1], indices[n])
    }

    fn centroid_without(&self, exclude: usize) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let mut centroid = vec![0.0; dim];
        for (_, vertex) in self.vertices.iter().enumerate().filter(|(i, _)| *i != exclude) {
            for (c, v) in centroid.iter_mut().zip(vertex.iter()) {
                *c += v;
            }
        }
        let count = (self.vertices.len() - 1) as f64;
        centroid.iter_mut().for_each(|c| *c /= count);
        centroid
    }

    /// Trial point `centroid + coef * (towards - centroid)` and its value.
    fn trial(&self, centroid: &[f64], towards: &[f64], coef: f64) -> (Vec<f64>, f64) {
        let mut point: Vec<f64> = centroid
            .iter()
            .zip(towards.iter())
            .map(|(c, t)| c + coef * (t - c))
            .collect();
        let value = self.evaluate(&mut point);
        (point, value)
    }

    fn shrink_towards(&mut self, best: usize, sigma: f64) {
        let anchor = self.vertices[best].clone();
        for idx in 0..self.vertices.len() {
            if idx == best {
                continue;
            }
            let mut vertex: Vec<f64> = anchor
                .iter()
                .zip(self.vertices[idx].iter())
                .map(|(a, v)| a + sigma * (v - a))
                .collect();
            let value = self.evaluate(&mut vertex);
            self.replace(idx, vertex, value);
        }
    }

    fn diameter(&self, centroid: &[f64]) -> f64 {
        self.vertices
            .iter()
            .map(|v| {
                v.iter()
                    .zip(centroid.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max)
    }
}

/// Minimize `objective` starting from `initial`.
///
/// Every trial point is clamped into `bounds` (one `(min, max)` pair per
/// dimension) before evaluation. NaN objective values are treated as +inf.
///
/// # Example
/// ```
/// use decomp_arima::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 0.4).powi(2) + (x[1] + 0.3).powi(2),
///     &[0.0, 0.0],
///     Some(&[(-0.99, 0.99), (-0.99, 0.99)]),
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 0.4).abs() < 0.01);
/// assert!((result.optimal_point[1] + 0.3).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex::new(objective, initial, bounds, config.initial_step);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let (best, second_worst, worst) = simplex.order();
        let centroid = simplex.centroid_without(worst);

        if simplex.values[worst] - simplex.values[best] < config.tolerance
            || simplex.diameter(&centroid) < config.tolerance
        {
            converged = true;
            break;
        }

        let worst_vertex = simplex.vertices[worst].clone();
        let (reflected, reflected_value) = simplex.trial(&centroid, &worst_vertex, -config.alpha);

        if reflected_value < simplex.values[best] {
            let (expanded, expanded_value) = simplex.trial(&centroid, &reflected, config.gamma);
            if expanded_value < reflected_value {
                simplex.replace(worst, expanded, expanded_value);
            } else {
                simplex.replace(worst, reflected, reflected_value);
            }
            continue;
        }

        if reflected_value < simplex.values[second_worst] {
            simplex.replace(worst, reflected, reflected_value);
            continue;
        }

        let outside = reflected_value < simplex.values[worst];
        let (target, threshold) = if outside {
            (&reflected, reflected_value)
        } else {
            (&worst_vertex, simplex.values[worst])
        };
        let (contracted, contracted_value) = simplex.trial(&centroid, target, config.rho);
        let accept = if outside {
            contracted_value <= threshold
        } else {
            contracted_value < threshold
        };
        if accept {
            simplex.replace(worst, contracted, contracted_value);
            continue;
        }

        simplex.shrink_towards(best, config.sigma);
    }

    let (best, _, _) = simplex.order();

    if !converged {
        log::warn!(
            "Nelder-Mead stopped after {iterations} iterations without converging (objective {:.6e})",
            simplex.values[best]
        );
    }

    NelderMeadResult {
        optimal_point: simplex.vertices[best].clone(),
        optimal_value: simplex.values[best],
        iterations,
        converged,
    }
}
