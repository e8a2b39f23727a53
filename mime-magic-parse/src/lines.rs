//! Line-level scanning: depth prefix, field splitting, escape decoding.
//!
//! A rule line is `[>*] offset type content [mime_type [mime_encoding]]`
//! with fields separated by whitespace runs. Inside the content field a
//! backslash escapes the following byte, so `\ ` and `\t` do not terminate
//! the field; everywhere else any whitespace run is a separator (rule files
//! in the wild mix tabs and spaces freely).

/// One split rule line, before semantic interpretation.
///
/// `content` is the raw field text: operator sigil and escape sequences
/// still intact.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct RawRule<'a> {
    pub depth: usize,
    pub offset: &'a str,
    pub type_tok: &'a str,
    pub content: &'a str,
    pub mime_type: Option<&'a str>,
    pub mime_encoding: Option<&'a str>,
}

/// Outcome of scanning one physical line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScannedLine<'a> {
    /// Blank line or `#` comment; skipped without breaking continuation
    /// grouping.
    Skip,
    /// A splittable rule line.
    Rule(RawRule<'a>),
    /// Fewer than three fields.
    Truncated { fields: usize },
}

/// Split a physical line into its fields.
pub(crate) fn scan_line(line: &str) -> ScannedLine<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return ScannedLine::Skip;
    }

    let depth = line.bytes().take_while(|&b| b == b'>').count();
    let rest = &line[depth..];

    let (offset, rest) = take_token(rest);
    let (type_tok, rest) = take_token(rest);
    let (content, rest) = take_content_token(rest);
    let (mime_type, rest) = take_token(rest);
    let (mime_encoding, _) = take_token(rest);

    let fields = [offset, type_tok, content, mime_type, mime_encoding]
        .iter()
        .take_while(|t| !t.is_empty())
        .count();
    if fields < 3 {
        return ScannedLine::Truncated { fields };
    }

    ScannedLine::Rule(RawRule {
        depth,
        offset,
        type_tok,
        content,
        mime_type: (!mime_type.is_empty()).then_some(mime_type),
        mime_encoding: (!mime_encoding.is_empty()).then_some(mime_encoding),
    })
}

/// Take one whitespace-delimited token; returns `(token, remainder)`.
fn take_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s
        .bytes()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// Take the content token, where a backslash escapes the following byte.
///
/// Whitespace only terminates the field when it is not preceded by an odd
/// number of backslashes, which is what makes the `\ ` escape reachable.
fn take_content_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b if b.is_ascii_whitespace() => break,
            _ => i += 1,
        }
    }
    (&s[..i], &s[i..])
}

/// Decode escape sequences in a content field into raw bytes.
///
/// Single left-to-right pass: `\\`, `\ `, `\t`, `\n`, `\r`, `\xHH` (exactly
/// two hex digits), `\ooo` (one to three octal digits), and any other `\c`
/// as the literal byte `c`. A raw newline terminates decoding; a trailing
/// lone backslash is kept literally.
pub(crate) fn decode_escapes(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\n' {
            break;
        }
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }

        i += 1;
        let Some(&esc) = bytes.get(i) else {
            out.push(b'\\');
            break;
        };
        match esc {
            b'\\' => {
                out.push(b'\\');
                i += 1;
            }
            b' ' => {
                out.push(b' ');
                i += 1;
            }
            b't' => {
                out.push(b'\t');
                i += 1;
            }
            b'n' => {
                out.push(b'\n');
                i += 1;
            }
            b'r' => {
                out.push(b'\r');
                i += 1;
            }
            b'x' => match (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                // Not a \xHH sequence; fall back to the literal byte.
                _ => {
                    out.push(b'x');
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                i += 1;
                let mut digits = 1;
                while digits < 3 {
                    match bytes.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = (value << 3) | u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(value as u8);
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    out
}

fn hex_val(b: Option<&u8>) -> Option<u8> {
    match b? {
        d @ b'0'..=b'9' => Some(d - b'0'),
        d @ b'a'..=b'f' => Some(d - b'a' + 10),
        d @ b'A'..=b'F' => Some(d - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(line: &str) -> RawRule<'_> {
        match scan_line(line) {
            ScannedLine::Rule(r) => r,
            other => panic!("expected rule from {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn comments_and_blanks_skip() {
        assert_eq!(scan_line(""), ScannedLine::Skip);
        assert_eq!(scan_line("   \t"), ScannedLine::Skip);
        assert_eq!(scan_line("# a comment"), ScannedLine::Skip);
        assert_eq!(scan_line("   # indented comment"), ScannedLine::Skip);
    }

    #[test]
    fn splits_five_fields() {
        let r = rule("0\tstring\t%PDF\tapplication/pdf\tbinary");
        assert_eq!(r.depth, 0);
        assert_eq!(r.offset, "0");
        assert_eq!(r.type_tok, "string");
        assert_eq!(r.content, "%PDF");
        assert_eq!(r.mime_type, Some("application/pdf"));
        assert_eq!(r.mime_encoding, Some("binary"));
    }

    #[test]
    fn collapses_mixed_whitespace() {
        let r = rule("  4   belong \t 0x66747970   video/mp4  ");
        assert_eq!(r.offset, "4");
        assert_eq!(r.type_tok, "belong");
        assert_eq!(r.content, "0x66747970");
        assert_eq!(r.mime_type, Some("video/mp4"));
        assert_eq!(r.mime_encoding, None);
    }

    #[test]
    fn counts_continuation_depth() {
        let r = rule(">>4 byte 0x14 application/zip");
        assert_eq!(r.depth, 2);
        assert_eq!(r.offset, "4");
    }

    #[test]
    fn escaped_space_stays_in_content() {
        let r = rule("0 string #!\\ /bin/sh application/x-sh");
        assert_eq!(r.content, "#!\\ /bin/sh");
        assert_eq!(r.mime_type, Some("application/x-sh"));
    }

    #[test]
    fn truncated_lines_report_field_count() {
        assert_eq!(scan_line("0"), ScannedLine::Truncated { fields: 1 });
        assert_eq!(scan_line("0 string"), ScannedLine::Truncated { fields: 2 });
    }

    #[test]
    fn decode_named_escapes() {
        assert_eq!(decode_escapes(r"a\\b"), b"a\\b");
        assert_eq!(decode_escapes(r"a\ b"), b"a b");
        assert_eq!(decode_escapes(r"a\tb"), b"a\tb");
        assert_eq!(decode_escapes(r"a\nb"), b"a\nb");
        assert_eq!(decode_escapes(r"a\rb"), b"a\rb");
    }

    #[test]
    fn decode_hex_escapes() {
        assert_eq!(decode_escapes(r"PK\x03\x04"), b"PK\x03\x04");
        assert_eq!(decode_escapes(r"\xFF\xfe"), [0xFF, 0xFE]);
        // Not two hex digits: the 'x' is a literal.
        assert_eq!(decode_escapes(r"\xZZ"), b"xZZ");
        assert_eq!(decode_escapes(r"\x"), b"x");
    }

    #[test]
    fn decode_octal_escapes() {
        assert_eq!(decode_escapes(r"\0"), [0x00]);
        assert_eq!(decode_escapes(r"\040"), b" ");
        assert_eq!(decode_escapes(r"\7777"), [0xFF, b'7']);
        // One and two digit forms stop at the first non-octal byte.
        assert_eq!(decode_escapes(r"\12x"), [0o12, b'x']);
        assert_eq!(decode_escapes(r"\128"), [0o12, b'8']);
    }

    #[test]
    fn decode_unknown_escape_is_literal() {
        assert_eq!(decode_escapes(r"\q"), b"q");
        assert_eq!(decode_escapes(r"\>"), b">");
    }

    #[test]
    fn decode_trailing_backslash_kept() {
        assert_eq!(decode_escapes("ab\\"), b"ab\\");
    }

    #[test]
    fn decode_stops_at_raw_newline() {
        assert_eq!(decode_escapes("ab\ncd"), b"ab");
    }
}
