//! Integer space distribution.
//!
//! Every proportional split in layout goes through [`distribute_integer`]:
//! flex growth, flex shrink, justify spacing and panel percentages.

/// Split `total` cells between slots in proportion to `weights`.
///
/// Each slot first gets `floor(total * w / sum)`. The cells left over are
/// handed out one at a time by descending fractional remainder, ties going
/// to the lower index. Slots whose weight is not a positive finite number
/// get nothing. A non-positive `total` or an all-zero weight list yields
/// all zeros.
///
/// The output always sums to `max(0, total)` when at least one weight is
/// positive.
pub fn distribute_integer(total: i32, weights: &[f64]) -> Vec<i32> {
    let mut out = vec![0; weights.len()];
    distribute_integer_into(total, weights, &mut out);
    out
}

/// [`distribute_integer`] writing into a caller-owned slice.
///
/// `out` must be at least `weights.len()` long; extra entries are left
/// untouched.
pub fn distribute_integer_into(total: i32, weights: &[f64], out: &mut [i32]) {
    let out = &mut out[..weights.len()];
    out.fill(0);
    let valid = |w: f64| w.is_finite() && w > 0.0;
    let sum: f64 = weights.iter().copied().filter(|&w| valid(w)).sum();
    if total <= 0 || sum <= 0.0 || !sum.is_finite() {
        return;
    }

    let total_f = f64::from(total);
    let mut assigned: i64 = 0;
    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        if !valid(w) {
            continue;
        }
        let exact = total_f * (w / sum);
        let base = exact.floor();
        out[i] = base as i32;
        assigned += i64::from(out[i]);
        remainders.push((i, exact - base));
    }

    // Stable sort keeps lower indices first among equal remainders.
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));

    // Rounding in `exact` can overshoot by a cell; take it back from the
    // smallest remainders.
    let mut excess = assigned - i64::from(total);
    for &(i, _) in remainders.iter().rev() {
        if excess <= 0 {
            break;
        }
        if out[i] > 0 {
            out[i] -= 1;
            excess -= 1;
            assigned -= 1;
        }
    }

    let mut leftover = (i64::from(total) - assigned).max(0) as usize;
    if leftover == 0 {
        return;
    }
    while leftover > 0 {
        for &(i, _) in &remainders {
            if leftover == 0 {
                break;
            }
            out[i] += 1;
            leftover -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_remainder_goes_low() {
        assert_eq!(distribute_integer(10, &[1.0, 1.0, 1.0]), vec![4, 3, 3]);
        assert_eq!(distribute_integer(11, &[1.0, 1.0, 1.0]), vec![4, 4, 3]);
    }

    #[test]
    fn test_largest_fraction_first() {
        // 10 * [0.15, 0.35, 0.5] = 1.5, 3.5, 5.0 -> tie on .5 goes to index 0.
        assert_eq!(distribute_integer(10, &[15.0, 35.0, 50.0]), vec![2, 3, 5]);
        // 7 * [1/6, 2/6, 3/6] = 1.17, 2.33, 3.5
        assert_eq!(distribute_integer(7, &[1.0, 2.0, 3.0]), vec![1, 2, 4]);
    }

    #[test]
    fn test_invalid_weights_get_nothing() {
        assert_eq!(
            distribute_integer(9, &[0.0, f64::NAN, 1.0, -2.0, f64::INFINITY]),
            vec![0, 0, 9, 0, 0]
        );
        assert_eq!(distribute_integer(5, &[0.0, 0.0]), vec![0, 0]);
        assert_eq!(distribute_integer(5, &[]), Vec::<i32>::new());
    }

    #[test]
    fn test_non_positive_total() {
        assert_eq!(distribute_integer(0, &[1.0, 1.0]), vec![0, 0]);
        assert_eq!(distribute_integer(-4, &[1.0, 1.0]), vec![0, 0]);
    }

    #[test]
    fn test_percentages() {
        assert_eq!(distribute_integer(100, &[25.0, 75.0]), vec![25, 75]);
        assert_eq!(distribute_integer(100, &[20.0, 80.0]), vec![20, 80]);
    }

    #[test]
    fn test_into_leaves_tail() {
        let mut out = [9; 4];
        distribute_integer_into(3, &[1.0, 1.0], &mut out);
        assert_eq!(out, [2, 1, 9, 9]);
    }
}
