//! Scan progress snapshots, formatted for a live stderr status line.

/// A point-in-time view of the primary scan. Percent complete is measured
/// by transactions consumed (matched or filed), not cursor position, since
/// group pulls shrink the list from anywhere.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub transaction_cursor: usize,
    pub transactions_left: usize,
    pub exchange_cursor: usize,
    pub exchanges_left: usize,
    pub matches: usize,
    pub percent: f64,
    pub remaining_secs: f64,
}

impl ScanProgress {
    pub fn status_line(&self) -> String {
        format!(
            "{:>5} / {:>5} | {:>5} / {:>5} | {} matches | {:4.1}% | T-{:<20}",
            self.transaction_cursor,
            self.transactions_left,
            self.exchange_cursor,
            self.exchanges_left,
            self.matches,
            self.percent,
            format_remaining(self.remaining_secs),
        )
    }
}

/// Human units for the time-remaining estimate.
pub fn format_remaining(secs: f64) -> String {
    if secs > 86_400.0 {
        format!("{:.1} d", secs / 86_400.0)
    } else if secs > 3_600.0 {
        format!("{:.1} h", secs / 3_600.0)
    } else if secs > 60.0 {
        format!("{:.1} m", secs / 60.0)
    } else {
        format!("{} s", secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_picks_the_largest_unit() {
        assert_eq!(format_remaining(90_000.0), "1.0 d");
        assert_eq!(format_remaining(7_200.0), "2.0 h");
        assert_eq!(format_remaining(90.0), "1.5 m");
        assert_eq!(format_remaining(42.7), "42 s");
        assert_eq!(format_remaining(0.0), "0 s");
    }

    #[test]
    fn status_line_carries_all_cursors() {
        let p = ScanProgress {
            transaction_cursor: 12,
            transactions_left: 3400,
            exchange_cursor: 7,
            exchanges_left: 2900,
            matches: 250,
            percent: 42.5,
            remaining_secs: 120.0,
        };
        let line = p.status_line();
        assert!(line.contains("12 /  3400"));
        assert!(line.contains("7 /  2900"));
        assert!(line.contains("250 matches"));
        assert!(line.contains("42.5%"));
        assert!(line.contains("T-2.0 m"));
    }
}
