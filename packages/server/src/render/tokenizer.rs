//! A small HTML tokenizer.
//!
//! Only what the renderer needs: start tags with attributes, end tags and
//! text. Comments, doctypes and processing instructions are skipped, and the
//! contents of `<script>` and `<style>` never reach the caller. Entities are
//! decoded in text and attribute values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("Unterminated tag at byte {0}")]
    UnterminatedTag(usize),
    #[error("Unterminated comment at byte {0}")]
    UnterminatedComment(usize),
}

/// Elements whose contents are raw text.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text: Option<&'static str>,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text: None,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_token(&mut self) -> Option<Result<Token, TokenizeError>> {
        if let Some(element) = self.raw_text.take() {
            self.skip_raw_text(element);
        }

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }

            if !starts_markup(rest) {
                return Some(Ok(self.text()));
            }

            let start = self.pos;
            if rest.starts_with("<!--") {
                match rest[4..].find("-->") {
                    Some(end) => self.pos += 4 + end + 3,
                    None => return Some(Err(TokenizeError::UnterminatedComment(start))),
                }
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                match rest.find('>') {
                    Some(end) => self.pos += end + 1,
                    None => return Some(Err(TokenizeError::UnterminatedTag(start))),
                }
            } else if rest.starts_with("</") {
                return Some(self.end_tag());
            } else {
                return Some(self.start_tag());
            }
        }
    }

    fn text(&mut self) -> Token {
        let rest = self.rest();
        // A `<` that does not open markup is literal text.
        let end = rest
            .char_indices()
            .skip(1)
            .find(|(index, c)| *c == '<' && starts_markup(&rest[*index..]))
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }

    fn end_tag(&mut self) -> Result<Token, TokenizeError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.tag_name();
        match self.rest().find('>') {
            Some(end) => {
                self.pos += end + 1;
                Ok(Token::EndTag { name })
            }
            None => Err(TokenizeError::UnterminatedTag(start)),
        }
    }

    fn start_tag(&mut self) -> Result<Token, TokenizeError> {
        let start = self.pos;
        self.pos += 1;
        let name = self.tag_name();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            let Some(c) = rest.chars().next() else {
                return Err(TokenizeError::UnterminatedTag(start));
            };

            match c {
                '>' => {
                    self.pos += 1;
                    break;
                }
                '/' => self.pos += 1,
                _ => {
                    let attribute = self
                        .attribute()
                        .ok_or(TokenizeError::UnterminatedTag(start))?;
                    attributes.push(attribute);
                }
            }
        }

        if let Some(element) = RAW_TEXT_ELEMENTS.into_iter().find(|element| *element == name) {
            self.raw_text = Some(element);
        }
        Ok(Token::StartTag { name, attributes })
    }

    fn tag_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    /// `name`, `name=value`, `name='value'` or `name="value"`.
    fn attribute(&mut self) -> Option<(String, String)> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..end].to_ascii_lowercase();
        self.pos += end;

        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            return Some((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        let value = match rest.chars().next()? {
            quote @ ('"' | '\'') => {
                let end = rest[1..].find(quote)?;
                self.pos += end + 2;
                &rest[1..end + 1]
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                &rest[..end]
            }
        };
        Some((name, decode_entities(value)))
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
    }

    /// Skip to the end tag of a raw text element, or to the end of input.
    fn skip_raw_text(&mut self, element: &str) {
        let closing = format!("</{}", element);
        let rest = self.rest();
        let lowered = rest.to_ascii_lowercase();
        self.pos += lowered.find(&closing).unwrap_or(rest.len());
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, TokenizeError>;

    /// Yields tokens until the end of input. An error is yielded once and
    /// ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let token = self.next_token();
        if matches!(token, Some(Err(_))) {
            self.failed = true;
        }
        token
    }
}

/// Whether `s` opens a tag, comment, doctype or processing instruction.
fn starts_markup(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('<') {
        return false;
    }
    match chars.next() {
        Some('!' | '?') => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

/// Decode character references. Unknown or malformed references are kept
/// verbatim.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
