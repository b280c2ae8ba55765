//! IRC line tokenizing and framing.

/// Split one IRC line into tokens.
///
/// A token starting with `:` takes the rest of the line verbatim (without the
/// `:`) and is always last. Other tokens are runs of non-whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut tokens = Vec::new();
    let mut rest = skip_spaces(line);

    while !rest.is_empty() {
        if let Some(trailing) = rest.strip_prefix(':') {
            tokens.push(trailing.to_string());
            break;
        }
        let end = rest
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        tokens.push(rest[..end].to_string());
        rest = skip_spaces(&rest[end..]);
    }

    tokens
}

// Only ASCII whitespace separates tokens; escaped nicknames contain U+00A0.
fn skip_spaces(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

/// Frame tokens as an IRC line terminated by `\r\n`.
///
/// The first token is the prefix. The first later token that is empty,
/// contains ASCII whitespace or starts with `:` becomes the trailing
/// parameter.
///
/// # Panics
///
/// If any token follows the trailing parameter.
pub fn frame<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut line = String::new();
    let mut trailing = false;

    for (index, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        assert!(
            !trailing,
            "tokens found after a token containing a space: {:?}",
            tokens.iter().map(AsRef::as_ref).collect::<Vec<&str>>()
        );

        if index == 0 {
            line.push(':');
        } else {
            line.push(' ');
            if token.is_empty()
                || token.starts_with(':')
                || token.bytes().any(|b| b.is_ascii_whitespace())
            {
                line.push(':');
                trailing = true;
            }
        }
        line.push_str(token);
    }

    line.push_str("\r\n");
    line
}
