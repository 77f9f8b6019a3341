pub(crate) mod parse;

pub fn connection_keep_alive(value: &[u8]) -> bool {
    header_has_token(value, "keep-alive")
}

pub fn connection_close(value: &[u8]) -> bool {
    header_has_token(value, "close")
}

/// Comma-separated header list contains `needle`, case-insensitively.
pub(crate) fn header_has_token(value: &[u8], needle: &str) -> bool {
    if let Ok(s) = std::str::from_utf8(value) {
        for val in s.split(',') {
            if val.trim().eq_ignore_ascii_case(needle) {
                return true;
            }
        }
    }
    false
}
