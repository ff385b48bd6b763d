//! Account entity helpers.

/// Starting balance credited to a new account when the caller does not
/// specify one.
pub const DEFAULT_BALANCE: f64 = 5000.0;

/// Win rate as a percentage of total trades. Zero when no trades exist.
pub fn win_rate(winning_trades: i64, total_trades: i64) -> f64 {
    if total_trades == 0 {
        return 0.0;
    }
    winning_trades as f64 / total_trades as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate_zero_trades() {
        assert_eq!(win_rate(0, 0), 0.0);
    }

    #[test]
    fn test_win_rate_percentage() {
        assert_eq!(win_rate(1, 4), 25.0);
        assert_eq!(win_rate(3, 3), 100.0);
        assert_eq!(win_rate(0, 7), 0.0);
    }
}
