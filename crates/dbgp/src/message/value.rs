//! Text extraction for encoded element content.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Decode element text according to its `encoding` attribute.
///
/// Returns the text and whether it is still base64. Base64 content is only
/// decoded when the result looks like text; binary data is kept encoded so
/// nothing downstream mangles it as UTF-8.
pub(crate) fn extract(raw: &str, encoding: Option<&str>) -> (String, bool) {
    if encoding != Some("base64") {
        return (raw.to_string(), false);
    }

    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) if looks_like_text(&bytes) => match String::from_utf8(bytes) {
            Ok(text) => (text, false),
            Err(_) => (compact, true),
        },
        Ok(_) => (compact, true),
        Err(e) => {
            tracing::debug!(error = %e, "content marked base64 does not decode");
            (compact, true)
        }
    }
}

/// Valid UTF-8 without the control bytes that mark binary data.
///
/// Tab, newline, form feed, carriage return and escape count as text.
pub(crate) fn looks_like_text(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
        && !bytes
            .iter()
            .any(|b| matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F))
}
