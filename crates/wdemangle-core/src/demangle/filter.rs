//! Rewrite `_W` symbols embedded in free text (logs, crash dumps, `nm` output).

use std::borrow::Cow;

use super::declaration::{demangle_declaration, SENTINEL};

fn is_word_char(c: char) -> bool
{
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every `_W[A-Za-z0-9_]+` token in `text` with its decoded form.
///
/// The whole token is replaced, including word characters after the end of
/// the declaration. Tokens that fail to decode are left exactly as they
/// were. Returns the input unchanged (borrowed) when nothing was rewritten.
///
/// ```rust
/// use wdemangle_core::demangle::demangle_text;
///
/// assert_eq!(demangle_text("at _WF3foo_ (main.o)"), "at foo() (main.o)");
/// assert_eq!(demangle_text("no symbols here"), "no symbols here");
/// ```
pub fn demangle_text(text: &str) -> Cow<'_, str>
{
    let mut out: Option<String> = None;
    let mut copied_up_to = 0;
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(SENTINEL) {
        let start = search_from + found;
        let body_start = start + SENTINEL.len();
        let body_len = text[body_start..]
            .chars()
            .take_while(|c| is_word_char(*c))
            .count();
        if body_len == 0 {
            search_from = body_start;
            continue;
        }

        let end = body_start + body_len;
        if let Ok(decoded) = demangle_declaration(&text[start..end]) {
            let buffer = out.get_or_insert_with(|| String::with_capacity(text.len()));
            buffer.push_str(&text[copied_up_to..start]);
            buffer.push_str(&decoded.text);
            copied_up_to = end;
        }
        search_from = end;
    }

    match out {
        Some(mut buffer) => {
            buffer.push_str(&text[copied_up_to..]);
            Cow::Owned(buffer)
        }
        None => Cow::Borrowed(text),
    }
}
