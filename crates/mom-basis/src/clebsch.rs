//! Clebsch–Gordan coefficients for integer angular momenta.

const FACTORIAL_LIMIT: usize = 171;

fn factorial(n: i64) -> f64 {
    debug_assert!(n >= 0 && (n as usize) < FACTORIAL_LIMIT);
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Returns ⟨j1 m1, j2 m2 | j m⟩ via the Racah formula.
///
/// Combinations that violate the triangle rule, |m_i| ≤ j_i or m1 + m2 = m
/// yield zero instead of an error.
pub fn clebsch_gordan(j1: i64, m1: i64, j2: i64, m2: i64, j: i64, m: i64) -> f64 {
    if j1 < 0 || j2 < 0 || j < 0 {
        return 0.0;
    }
    if m1.abs() > j1 || m2.abs() > j2 || m.abs() > j || m1 + m2 != m {
        return 0.0;
    }
    if j < (j1 - j2).abs() || j > j1 + j2 {
        return 0.0;
    }
    if (j1 + j2 + j + 1) as usize >= FACTORIAL_LIMIT {
        return 0.0;
    }

    let triangle = (2 * j + 1) as f64 * factorial(j + j1 - j2) * factorial(j - j1 + j2)
        * factorial(j1 + j2 - j)
        / factorial(j1 + j2 + j + 1);
    let projections = factorial(j + m)
        * factorial(j - m)
        * factorial(j1 - m1)
        * factorial(j1 + m1)
        * factorial(j2 - m2)
        * factorial(j2 + m2);

    let k_min = 0.max(j2 - j - m1).max(j1 + m2 - j);
    let k_max = (j1 + j2 - j).min(j1 - m1).min(j2 + m2);
    let mut sum = 0.0;
    for k in k_min..=k_max {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        let denom = factorial(k)
            * factorial(j1 + j2 - j - k)
            * factorial(j1 - m1 - k)
            * factorial(j2 + m2 - k)
            * factorial(j - j2 + m1 + k)
            * factorial(j - j1 - m2 + k);
        sum += sign / denom;
    }
    (triangle * projections).sqrt() * sum
}
