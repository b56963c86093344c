//! Nelder–Mead simplex minimisation

/// Downhill simplex minimiser over an unconstrained parameter space
#[derive(Debug, Clone)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Relative spread of objective values across the simplex at which the search stops
    pub tolerance: f64,
    /// Offset applied to each coordinate of the start point to build the initial simplex
    pub initial_step: f64,
}

/// Best point found by a minimisation run
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-10,
            initial_step: 0.5,
        }
    }
}

impl NelderMead {
    /// Minimise `objective` starting from `start`.
    ///
    /// NaN objective values are treated as +inf so they always lose comparisons.
    pub fn minimize<F>(&self, mut objective: F, start: &[f64]) -> Minimum
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let dim = start.len();
        if dim == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
        simplex.push((start.to_vec(), eval(start)));
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[dim].1;
            if best.is_finite() && (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = centroid(&simplex[..dim]);
            let worst_point = simplex[dim].0.clone();

            let reflected = along(&centroid, &worst_point, -REFLECTION);
            let reflected_value = eval(&reflected);

            if reflected_value < simplex[0].1 {
                let expanded = along(&centroid, &worst_point, -EXPANSION);
                let expanded_value = eval(&expanded);
                simplex[dim] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }

            if reflected_value < simplex[dim - 1].1 {
                simplex[dim] = (reflected, reflected_value);
                continue;
            }

            // Contract towards whichever of the reflected or worst point is better
            let (contracted, contracted_value) = if reflected_value < simplex[dim].1 {
                let p = along(&centroid, &reflected, CONTRACTION);
                let v = eval(&p);
                (p, v)
            } else {
                let p = along(&centroid, &worst_point, CONTRACTION);
                let v = eval(&p);
                (p, v)
            };

            if contracted_value < simplex[dim].1.min(reflected_value) {
                simplex[dim] = (contracted, contracted_value);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = along(&anchor, &vertex.0, SHRINK);
                let value = eval(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (point, value) = simplex.swap_remove(0);
        Minimum {
            point,
            value,
            iterations,
            converged,
        }
    }
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dim = vertices[0].0.len();
    let mut c = vec![0.0; dim];
    for (point, _) in vertices {
        for (ci, xi) in c.iter_mut().zip(point) {
            *ci += xi;
        }
    }
    let n = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= n);
    c
}

/// `origin + t * (target - origin)`
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| o + t * (x - o))
        .collect()
}
