/// Validates an order number against the Luhn checksum.
///
/// Only strings consisting entirely of ASCII digits can be valid. Every second digit, counted from the rightmost,
/// is doubled before summing; the number checks out when the sum is a multiple of ten.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let parity = number.len() % 2;
    let sum: u32 = number
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let mut digit = u32::from(b - b'0');
            if i % 2 == parity {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            digit
        })
        .sum();
    sum % 10 == 0
}
