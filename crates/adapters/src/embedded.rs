//! Extraction of article bodies embedded as a JavaScript string literal
//!
//! Some pages ship their article inside an inline script object such as
//! `{...,content:"<p>...</p>",ext:[...]}` with non-ASCII text as `\uXXXX`
//! escapes. The markers below are the only contract with that page; when they
//! are missing the extraction fails loudly rather than returning garbage.

use std::char::REPLACEMENT_CHARACTER;

use onion_reader_domain::SourceError;

const CONTENT_START: &str = ",content:\"";
const CONTENT_END: &str = "\",ext:";

/// Pull the article body out of a page embedding it as `,content:"...",ext:`
pub fn extract_embedded_content(body: &str) -> Result<String, SourceError> {
    let body = unescape_unicode(body);

    let start = body
        .rfind(CONTENT_START)
        .ok_or_else(|| SourceError::Format("content marker not found".to_string()))?
        + CONTENT_START.len();
    let rest = &body[start..];

    let end = rest
        .find(CONTENT_END)
        .ok_or_else(|| SourceError::Format("content terminator not found".to_string()))?;

    Ok(rest[..end].replace("\\\"", "\"").replace("\\n", ""))
}

/// Decode `\uXXXX` escapes (UTF-16 surrogate pairs included).
///
/// Escapes that are not followed by four hex digits are kept verbatim; unpaired
/// surrogates decode to U+FFFD.
pub fn unescape_unicode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];

        let Some(unit) = hex_unit(after) else {
            out.push_str("\\u");
            rest = after;
            continue;
        };

        let mut units = vec![unit];
        let mut consumed = 4;
        if (0xD800..0xDC00).contains(&unit) {
            let low = after
                .get(4..)
                .and_then(|s| s.strip_prefix("\\u"))
                .and_then(hex_unit)
                .filter(|low| (0xDC00..0xE000).contains(low));
            if let Some(low) = low {
                units.push(low);
                consumed += 6;
            }
        }

        out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(REPLACEMENT_CHARACTER)));
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

fn hex_unit(s: &str) -> Option<u16> {
    let digits = s.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_quotes_are_restored() {
        let body = r#"window.__NUXT__={data:[{title:"t",content:"A\"B\"",ext:[{}]}]}"#;
        assert_eq!(extract_embedded_content(body).unwrap(), r#"A"B""#);
    }

    #[test]
    fn test_last_content_marker_wins() {
        let body = r#"{intro:{id:0,content:"x",ext:[]},article:{id:1,content:"<p>real</p>",ext:[]}}"#;
        assert_eq!(extract_embedded_content(body).unwrap(), "<p>real</p>");
    }

    #[test]
    fn test_unicode_escapes_are_decoded_before_scanning() {
        let body = r#"{a:1,content:"\u003cp\u003e\u5d29\u574f3\u003c/p\u003e\n",ext:[]}"#;
        assert_eq!(extract_embedded_content(body).unwrap(), "<p>崩坏3</p>");
    }

    #[test]
    fn test_missing_marker_is_a_format_error() {
        let result = extract_embedded_content("<html><body>maintenance</body></html>");
        assert!(matches!(result, Err(SourceError::Format(_))));
    }

    #[test]
    fn test_missing_terminator_is_a_format_error() {
        let result = extract_embedded_content(r#"{x:1,content:"<p>cut off"#);
        assert!(matches!(result, Err(SourceError::Format(_))));
    }

    #[test]
    fn test_surrogate_pairs_combine() {
        assert_eq!(unescape_unicode(r"ok \ud83c\udf89!"), "ok 🎉!");
    }

    #[test]
    fn test_lone_surrogate_is_replaced() {
        assert_eq!(unescape_unicode(r"\ud83c end"), "\u{FFFD} end");
    }

    #[test]
    fn test_non_hex_escape_is_kept() {
        assert_eq!(unescape_unicode(r"C:\users\u"), r"C:\users\u");
    }
}
