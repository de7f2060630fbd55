//! Lenient conversions from cell strings
//!
//! Cells are plain strings. Numeric and boolean readings are done here, at the
//! point of use, and never fail: anything unparsable reads as zero or false.

/// Read the longest numeric prefix of a cell, after leading whitespace.
///
/// `"12abc"` reads as 12, `"  3.5 kg"` as 3.5, `"1e3"` as 1000. Cells with no
/// numeric prefix (`""`, `"abc"`, `"-"`) read as 0.
pub fn to_number(cell: &str) -> f64 {
    let s = cell.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if has_digits || frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        }
    }

    if !has_digits {
        return 0.0;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

/// Strict parse for caller-supplied bounds: the whole trimmed string must be a number
pub fn parse_bound(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Caller-supplied flag such as `confirmed=true`: `true` in any case, surrounding space ignored
pub fn is_truthy(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("true")
}

/// A boolean cell is true only when it reads exactly `TRUE`
pub fn is_true_cell(cell: &str) -> bool {
    cell == "TRUE"
}

/// Render a boolean the way the sheet stores it
pub fn bool_cell(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// Render a number without a trailing `.0` when it is integral
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
