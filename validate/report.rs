use super::{CrossValidation, SearchOutcome};

/// The headline line for a plain cross-validation run.
pub fn cross_validation_line(cv: &CrossValidation) -> String {
    format!("Results: {:.2} ({:.2}) MSE", cv.mean_mse(), cv.std())
}

/// The best-candidate line followed by one line per evaluated candidate.
pub fn search_lines(outcome: &SearchOutcome) -> Vec<String> {
    let best = outcome.best();
    let mut lines = Vec::with_capacity(outcome.candidates.len() + 1);
    lines.push(format!(
        "Best: {:.6} using {}",
        best.mean_score(),
        best.params
    ));
    lines.extend(outcome.candidates.iter().map(|candidate| {
        format!(
            "{:.6} ({:.6}) with: {}",
            candidate.mean_score(),
            candidate.std_score(),
            candidate.params
        )
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cross_validation_line_reports_positive_mse() {
        let cv = CrossValidation {
            scores: array![-2.0, -4.0],
        };
        assert_eq!(cross_validation_line(&cv), "Results: 3.00 (1.00) MSE");
    }
}
