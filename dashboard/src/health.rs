/// Card background color derived from working count vs. target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Target undefined, or nothing running against a defined target.
    Gray,
    /// working/meta >= 0.8
    Green,
    /// working/meta >= 0.5
    Yellow,
    /// 0 < working/meta < 0.5
    Red,
}

/// Health color rule. The `meta == 0` check comes first so the ratio is
/// never computed against a zero target.
pub fn health_color(working: u64, meta: u64) -> Health {
    if meta == 0 {
        return Health::Gray;
    }
    let ratio = working as f64 / meta as f64;
    if ratio >= 0.8 {
        Health::Green
    } else if ratio >= 0.5 {
        Health::Yellow
    } else if ratio > 0.0 {
        Health::Red
    } else {
        Health::Gray
    }
}

/// Format a count with "." thousand separators: 1234567 -> "1.234.567".
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == offset % 3 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_meta_is_gray_for_any_working_count() {
        assert_eq!(health_color(0, 0), Health::Gray);
        assert_eq!(health_color(7, 0), Health::Gray);
        assert_eq!(health_color(1000, 0), Health::Gray);
    }

    #[test]
    fn zero_working_with_positive_meta_is_gray() {
        assert_eq!(health_color(0, 5), Health::Gray);
    }

    #[test]
    fn ratio_boundaries_are_inclusive() {
        // exactly 0.8 -> green, exactly 0.5 -> yellow
        assert_eq!(health_color(4, 5), Health::Green);
        assert_eq!(health_color(1, 2), Health::Yellow);
    }

    #[test]
    fn low_but_nonzero_ratio_is_red() {
        assert_eq!(health_color(1, 3), Health::Red);
        assert_eq!(health_color(2, 5), Health::Red);
    }

    #[test]
    fn above_target_stays_green() {
        assert_eq!(health_color(10, 5), Health::Green);
    }

    #[test]
    fn thousand_separators() {
        assert_eq!(format_thousands(1_234_567), "1.234.567");
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1.000");
    }
}
