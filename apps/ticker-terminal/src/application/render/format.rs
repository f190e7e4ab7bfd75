//! Number formatting for the value lines.

/// Format with two decimals and a space every three integer digits.
///
/// `1234567.891` becomes `"1 234 567.89"`. The sign stays attached to the
/// first digit group.
#[must_use]
pub fn format_with_spaces(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, unsigned) = fixed
        .strip_prefix('-')
        .map_or(("", fixed.as_str()), |rest| ("-", rest));
    let (int_part, dec_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let digits = int_part.len();
    let mut grouped = String::with_capacity(digits + digits / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i != 0 && (digits - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    format!("{sign}{grouped}.{dec_part}")
}
