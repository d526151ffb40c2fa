use alloy_primitives::U256;

/// Render a raw token amount with `decimals` fractional digits.
///
/// Trailing fractional zeros are trimmed and a whole amount carries no dot.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{digits:0>decimals$}");
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let integer = if integer.is_empty() { "0" } else { integer };
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}
