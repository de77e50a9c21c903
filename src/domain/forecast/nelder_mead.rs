//! Derivative-free Nelder–Mead simplex minimizer.
//!
//! Deterministic: the initial simplex is built from the start point with a fixed
//! step along each axis, and ties are broken by vertex order.

#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Relative spread of objective values across the simplex at convergence.
    pub ftol: f64,
    /// Absolute spread accepted when the objective is close to zero.
    pub ftol_abs: f64,
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        NelderMeadConfig {
            max_iter: 5_000,
            ftol: 1e-10,
            ftol_abs: 1e-14,
            initial_step: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

pub fn minimize<F>(f: F, start: &[f64], config: &NelderMeadConfig) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    if n == 0 {
        return Minimum {
            x: Vec::new(),
            value: eval(start),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.to_vec());
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += config.initial_step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if best.is_finite()
            && worst.is_finite()
            && (worst - best).abs() <= config.ftol * best.abs() + config.ftol_abs
        {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let towards = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = towards(REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = towards(EXPAND);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[n] {
            let outside = towards(REFLECT * CONTRACT);
            let v = eval(&outside);
            (outside, v)
        } else {
            let inside = towards(-CONTRACT);
            let v = eval(&inside);
            (inside, v)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        let best_vertex = simplex[0].clone();
        for i in 1..=n {
            for (x, b) in simplex[i].iter_mut().zip(&best_vertex) {
                *x = b + SHRINK * (*x - b);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    Minimum {
        x: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}
