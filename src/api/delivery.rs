//! PNG responses for rendered certificates.

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 `attr-char` minus alphanumerics
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Shown in the browser
    Inline,
    /// Saved as a file
    Attachment,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// `<name>_<event>.png` with spaces and path separators replaced
pub fn certificate_filename(participant_name: &str, event_name: &str) -> String {
    let clean = |s: &str| s.trim().replace([' ', '/', '\\'], "_");
    format!("{}_{}.png", clean(participant_name), clean(event_name))
}

/// Header value with a plain ASCII `filename` and a UTF-8 `filename*`
pub fn content_disposition(disposition: Disposition, filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(filename, ATTR_CHAR);
    format!(
        "{}; filename=\"{ascii}\"; filename*=UTF-8''{encoded}",
        disposition.as_str()
    )
}

/// A PNG body that must not be cached by shared caches
pub fn png_response(bytes: Vec<u8>, filename: &str, disposition: Disposition) -> Response {
    let disposition_value = HeaderValue::from_str(&content_disposition(disposition, filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (CACHE_CONTROL, HeaderValue::from_static("no-store, private")),
            (CONTENT_DISPOSITION, disposition_value),
        ],
        bytes,
    )
        .into_response()
}
