/// Percentage of defect-free cells, rounded to two decimals.
///
/// An empty table scores 100, and more issues than cells bottoms out at 0.
pub fn quality_score(total_cells: usize, issue_count: usize) -> f64 {
    if total_cells == 0 {
        return 100.0;
    }
    let clean = total_cells.saturating_sub(issue_count) as f64;
    round2(100.0 * clean / total_cells as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(quality_score(10, 0), 100.0);
        assert_eq!(quality_score(0, 0), 100.0);
        assert_eq!(quality_score(0, 5), 100.0);
        assert_eq!(quality_score(10, 10), 0.0);
        assert_eq!(quality_score(10, 25), 0.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(quality_score(3, 1), 66.67);
        assert_eq!(quality_score(8, 1), 87.5);
    }
}
