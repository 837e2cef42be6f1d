//! Numeric lexers over raw byte slices.
//!
//! Slicer comments embed numbers in free-form text, so all decoders here are
//! lenient: bytes outside the expected alphabet are skipped instead of
//! rejected, and an empty or unparseable input decodes to zero.

/// Decode an unsigned integer, ignoring any non-digit bytes.
pub fn parse_uint(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &b in bytes {
        if b.is_ascii_digit() {
            value = value * 10 + u64::from(b - b'0');
        }
    }
    value
}

/// Decode a simple signed decimal number.
///
/// A minus sign is honored only before the first digit; everything else
/// outside digits and the first `.` is skipped.
pub fn parse_float(bytes: &[u8]) -> f64 {
    let mut int_part: u64 = 0;
    let mut frac_part: u64 = 0;
    let mut frac_div = 1.0f64;
    let mut in_fraction = false;
    let mut negative = false;
    let mut seen_digit = false;
    for &b in bytes {
        match b {
            b'0'..=b'9' => {
                seen_digit = true;
                if in_fraction {
                    frac_part = frac_part * 10 + u64::from(b - b'0');
                    frac_div *= 10.0;
                } else {
                    int_part = int_part * 10 + u64::from(b - b'0');
                }
            }
            b'.' => in_fraction = true,
            b'-' if !seen_digit && !in_fraction => negative = true,
            _ => {}
        }
    }
    let value = int_part as f64 + frac_part as f64 / frac_div;
    if negative {
        -value
    } else {
        value
    }
}

/// Decode a compound `<n>d<n>h<n>m<n>s` duration into seconds.
///
/// Each component is optional; digits accumulate until a unit letter folds
/// them into the running total. Unrecognized bytes are skipped.
pub fn parse_duration_secs(bytes: &[u8]) -> u64 {
    let mut total: u64 = 0;
    let mut value: u64 = 0;
    for &b in bytes {
        match b {
            b'0'..=b'9' => value = value * 10 + u64::from(b - b'0'),
            b'd' => {
                total += value * 86_400;
                value = 0;
            }
            b'h' => {
                total += value * 3_600;
                value = 0;
            }
            b'm' => {
                total += value * 60;
                value = 0;
            }
            b's' => {
                total += value;
                value = 0;
            }
            _ => {}
        }
    }
    total
}
