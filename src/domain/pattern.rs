//! Consecutive down-close ("red day") run lengths.

/// `run[i]` is the number of consecutive strictly lower closes ending at `i`.
///
/// A flat close is not red and resets the run, as does the first bar.
pub fn compute_red_run(closes: &[f64]) -> Vec<usize> {
    let mut run = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let value = if i > 0 && close < closes[i - 1] {
            run[i - 1] + 1
        } else {
            0
        };
        run.push(value);
    }
    run
}
