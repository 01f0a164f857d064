//! Escape processing for string and template literal text.
//!
//! tree-sitter hands back raw source bytes. A specifier written as
//! `'lodash\x2fget'` must resolve like `'lodash/get'`, so every literal is
//! "cooked" the way the JavaScript engine would before it is used.

/// Cooks the raw text between a literal's delimiters.
///
/// Handles the single-character escapes, `\xHH`, `\uHHHH`, `\u{H…}`, and line
/// continuations. Unknown escapes yield the escaped character itself, and
/// malformed numeric escapes are kept verbatim.
///
/// When `template` is set, literal CRLF and CR line terminators are
/// normalized to LF as template literals require.
pub(crate) fn cook(raw: &str, template: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    out.push('\\');
                    break;
                };
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
                    'x' => push_hex(&mut out, &mut chars, 'x', 2),
                    'u' if chars.peek() == Some(&'{') => push_braced_unicode(&mut out, &mut chars),
                    'u' => push_hex(&mut out, &mut chars, 'u', 4),
                    // Line continuations produce nothing.
                    '\r' => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                    }
                    '\n' | '\u{2028}' | '\u{2029}' => {}
                    other => out.push(other),
                }
            }
            '\r' if template => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            other => out.push(other),
        }
    }

    out
}

fn push_hex(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    digits: usize,
) {
    let mut hex = String::with_capacity(digits);
    while hex.len() < digits {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                hex.push(*c);
                chars.next();
            }
            _ => break,
        }
    }

    let decoded = u32::from_str_radix(&hex, 16)
        .ok()
        .filter(|_| hex.len() == digits)
        .and_then(char::from_u32);
    match decoded {
        Some(decoded) => out.push(decoded),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&hex);
        }
    }
}

fn push_braced_unicode(out: &mut String, chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    // Consume '{'
    chars.next();
    let mut hex = String::new();
    let mut closed = false;
    for c in chars.by_ref() {
        if c == '}' {
            closed = true;
            break;
        }
        hex.push(c);
    }

    let decoded = closed
        .then(|| u32::from_str_radix(&hex, 16).ok())
        .flatten()
        .and_then(char::from_u32);
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push_str("\\u{");
            out.push_str(&hex);
            if closed {
                out.push('}');
            }
        }
    }
}
