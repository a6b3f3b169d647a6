//! Currency formatting for alert messages

/// Format an amount as US dollars, e.g. `$1,234.50` or `-$5.00`
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }

    // f64::round rounds half away from zero
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let remainder = cents % 100;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };

    format!("{}${}.{:02}", sign, group_thousands(dollars), remainder)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(84.0), "$84.00");
        assert_eq!(format_usd(12.99), "$12.99");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_usd(-5.0), "-$5.00");
    }

    #[test]
    fn test_format_usd_rounds_to_cents() {
        assert_eq!(format_usd(80.666), "$80.67");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(-0.001), "$0.00");
    }
}
