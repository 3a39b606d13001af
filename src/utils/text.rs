use encoding_rs::WINDOWS_1252;

/// Decode a feed body. BOM serves most products as UTF-8 but some of the
/// older climate tables come through as Windows-1252.
pub fn decode_feed(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// First `limit` characters of a body, for error messages.
pub fn preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Format a reading the way the legacy CSV did: integral values without a
/// decimal point.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_feed("Temp (°C)".as_bytes()), "Temp (°C)");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // 0xB0 is the degree sign in Windows-1252 and invalid on its own in UTF-8
        let bytes = [b'2', b'5', 0xB0, b'C'];
        assert_eq!(decode_feed(&bytes), "25°C");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(-9999.0), "-9999");
        assert_eq!(format_number(7.4), "7.4");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abcdef", 3), "abc");
        assert_eq!(preview("ab", 10), "ab");
    }
}
