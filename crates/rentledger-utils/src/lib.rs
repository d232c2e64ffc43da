//! Utility functions and helpers

use rust_decimal::Decimal;

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T, separator: &str) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut result = String::new();
    let mut count = 0;
    for c in int_part.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let mut out: String = result.chars().rev().collect();
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    format!("{}{}", sign, out)
}

/// Format a money amount with a fixed number of decimals and a currency code
pub fn format_amount(amount: Decimal, decimal_places: u32, separator: &str, currency: &str) -> String {
    let rounded = amount.round_dp(decimal_places);
    let text = format!("{:.*}", decimal_places as usize, rounded);
    format!("{} {}", format_number(text, separator), currency)
}

/// Build a record name from a series prefix and a sequence number (RC-00042)
pub fn series_name(prefix: &str, sequence: u64) -> String {
    format!("{}-{:05}", prefix, sequence)
}

/// Keep only the ASCII digits of a phone number
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}
