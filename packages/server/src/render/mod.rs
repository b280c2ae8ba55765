//! Rendering Showdown's HTML fragments as IRC lines.
//!
//! A very small layout engine: block elements start and end lines, `<b>`,
//! `<strong>` and headings toggle IRC bold, links become `[text](target)`.
//! Everything else is rendered inline. Open elements live on an explicit
//! stack, so nesting depth is bounded only by memory.

pub mod tokenizer;

use tokenizer::{Token, Tokenizer};

pub use tokenizer::decode_entities;

/// IRC bold toggle.
pub const BOLD: char = '\x02';

const BULLET: &str = "• ";

/// Elements that never have children.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Render an HTML fragment as display lines.
///
/// Malformed input is rendered up to the first tokenizer error.
pub fn render_html(html: &str) -> Vec<String> {
    let mut renderer = Renderer::default();

    for token in Tokenizer::new(html) {
        match token {
            Ok(Token::StartTag { name, attributes }) => renderer.open(name, &attributes),
            Ok(Token::EndTag { name }) => renderer.close(&name),
            Ok(Token::Text(text)) => renderer.text(&text),
            Err(e) => {
                tracing::debug!("Stopped rendering HTML: {}", e);
                break;
            }
        }
    }

    renderer.finish()
}

/// An open element and the exit actions it owes.
#[derive(Debug)]
struct Frame {
    name: String,
    bold: bool,
    block: bool,
    link: Option<String>,
}

struct Renderer {
    out: String,
    stack: Vec<Frame>,
    bold: bool,
    /// Drops the next text node, wherever it appears.
    hidden: bool,
    /// The output ends with a line break (or nothing was written yet).
    at_break: bool,
    /// Set when a link opens, cleared by the next text.
    suppress_breaks: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            bold: false,
            hidden: false,
            at_break: true,
            suppress_breaks: false,
        }
    }
}

impl Renderer {
    fn open(&mut self, name: String, attributes: &[(String, String)]) {
        let attribute = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let mut frame = Frame {
            name,
            bold: false,
            block: false,
            link: None,
        };

        if let Some(style) = attribute("style") {
            self.apply_style(style, &mut frame);
        }

        frame.link = match frame.name.as_str() {
            "a" => attribute("href"),
            "button" => attribute("value"),
            _ => None,
        }
        .map(str::to_string);

        let mut bold = false;
        match frame.name.as_str() {
            "b" | "strong" => bold = true,
            "p" | "td" | "center" | "div" | "ol" => frame.block = true,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                bold = true;
                frame.block = true;
            }
            "br" | "hr" => {
                self.line_break();
                return;
            }
            "li" => {
                self.line_break();
                self.write_markup(BULLET);
            }
            "img" => return,
            "input" => {
                if let Some(value) = attribute("value") {
                    self.write_text(value);
                }
                return;
            }
            _ => {}
        }

        // Nested bold contexts toggle only once.
        if bold && !self.bold {
            self.bold = true;
            frame.bold = true;
            self.write_markup(&BOLD.to_string());
        }
        if frame.block {
            self.line_break();
        }
        if frame.link.is_some() {
            self.write_markup("[");
            self.suppress_breaks = true;
        }

        if VOID_ELEMENTS.contains(&frame.name.as_str()) {
            self.exit(frame);
        } else {
            self.stack.push(frame);
        }
    }

    fn apply_style(&mut self, style: &str, frame: &mut Frame) {
        for clause in style.split(';') {
            let Some((property, argument)) = clause.split_once(':') else {
                continue;
            };
            let property = property.trim().to_lowercase();
            let argument = argument.trim().to_lowercase();

            if property == "display" {
                match argument.as_str() {
                    "hidden" => self.hidden = true,
                    "block" | "inline-block" => frame.block = true,
                    _ => {}
                }
            }
        }
    }

    /// Close the nearest open `name` and everything opened after it.
    fn close(&mut self, name: &str) {
        let Some(index) = self.stack.iter().rposition(|frame| frame.name == name) else {
            return;
        };
        while self.stack.len() > index {
            if let Some(frame) = self.stack.pop() {
                self.exit(frame);
            }
        }
    }

    fn exit(&mut self, frame: Frame) {
        if let Some(link) = frame.link {
            // Keep `](target)` on the line of the link text.
            let breaks = self.chop_breaks();
            self.out.push_str("](");
            self.out.push_str(&link);
            self.out.push(')');
            self.out.push_str(&breaks);
            self.at_break = breaks.contains('\n');
        }
        if frame.block {
            self.line_break();
        }
        if frame.bold {
            self.write_markup(&BOLD.to_string());
            self.bold = false;
        }
    }

    fn text(&mut self, text: &str) {
        if self.hidden {
            self.hidden = false;
            return;
        }
        let flattened: String = text
            .chars()
            .map(|c| if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c })
            .collect();
        self.write_text(&flattened);
    }

    fn write_text(&mut self, text: &str) {
        self.out.push_str(text);
        self.at_break = false;
        self.suppress_breaks = false;
    }

    fn write_markup(&mut self, markup: &str) {
        self.out.push_str(markup);
        self.at_break = false;
    }

    /// Emit a line break unless one was just emitted. A bold run continues
    /// on the next line.
    fn line_break(&mut self) {
        if self.suppress_breaks || self.at_break {
            return;
        }
        self.out.push('\n');
        if self.bold {
            self.out.push(BOLD);
        }
        self.at_break = true;
    }

    /// Remove and return the trailing run of line breaks and bold toggles.
    fn chop_breaks(&mut self) -> String {
        let kept = self
            .out
            .trim_end_matches(|c: char| c == '\n' || c == BOLD)
            .len();
        self.out.split_off(kept)
    }

    fn finish(mut self) -> Vec<String> {
        while let Some(frame) = self.stack.pop() {
            self.exit(frame);
        }

        let doubled = format!("{}{}", BOLD, BOLD);
        self.out
            .split('\n')
            .map(|line| line.trim().trim_end_matches(BOLD).replace(&doubled, ""))
            .filter(|line| !line.chars().all(|c| c == BOLD))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> Vec<String> {
        render_html(html)
    }

    #[test]
    fn test_plain_text() {
        // テスト項目: タグのないテキストはそのまま 1 行になる
        // given (前提条件):
        let html = "a";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["a"]);
    }

    #[test]
    fn test_empty_input() {
        // テスト項目: 空の入力からは行が生成されない
        // given (前提条件):
        let html = "";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert!(lines.is_empty());
    }

    #[test]
    fn test_block_elements_take_their_own_lines() {
        // テスト項目: ブロック要素はそれぞれ独立した行になる
        // given (前提条件):
        let cases: [(&str, &[&str]); 2] = [
            ("<div>a</div><div>b</div>", &["a", "b"]),
            (
                "<div><div>a</div>b<span>c</span><div>d</div></div>e",
                &["a", "bc", "d", "e"],
            ),
        ];

        for (html, expected) in cases {
            // when (操作):
            let lines = render(html);

            // then (期待する結果):
            assert_eq!(lines, expected, "input: {:?}", html);
        }
    }

    #[test]
    fn test_links_keep_closing_syntax_on_the_text_line() {
        // テスト項目: リンクの閉じ括弧は内容の行に付き、ボタンの value もリンク先になる
        // given (前提条件):
        let cases: [(&str, &[&str]); 3] = [
            ("<a href='what'><div>ever</div></a>", &["[ever](what)"]),
            (
                "<b><a href='what'><div>ever</div></a></b>",
                &["\x02[ever](what)"],
            ),
            (
                "<button value='about:blank'>A button!</button>",
                &["[A button!](about:blank)"],
            ),
        ];

        for (html, expected) in cases {
            // when (操作):
            let lines = render(html);

            // then (期待する結果):
            assert_eq!(lines, expected, "input: {:?}", html);
        }
    }

    #[test]
    fn test_duplicate_breaks_collapse() {
        // テスト項目: 連続した改行は 1 つにまとめられる
        // given (前提条件):
        let html = "a<br><br>b";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_input_renders_its_value_and_img_is_inert() {
        // テスト項目: input は value を出力し、img は何も出力しない
        // given (前提条件):
        let html = "<input type='button' value='yay'><img src='http://example.com' alt='an alt'>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["yay"]);
    }

    #[test]
    fn test_display_styles() {
        // テスト項目: display: block は改行を生み、display: hidden は次のテキストだけを隠す
        // given (前提条件):
        let html = "<span style='display: block'>a</span><span>b</span>\
                    <span style='display: hidden'>c</span><span>d</span>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["a", "bd"]);
    }

    #[test]
    fn test_hidden_flag_clears_on_text_outside_the_element() {
        // テスト項目: 隠しフラグは要素の外側のテキストでも解除される
        // given (前提条件):
        let html = "<span style='DISPLAY : Hidden'></span>gone<span>kept</span>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["kept"]);
    }

    #[test]
    fn test_malformed_style_clauses_are_ignored() {
        // テスト項目: 不正なスタイル指定は無視される
        // given (前提条件):
        let html = "<span style='display; display:;'>a</span>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["a"]);
    }

    #[test]
    fn test_list_items_get_bullets() {
        // テスト項目: リスト項目は行頭記号付きの行になる
        // given (前提条件):
        let html = "<ul><li>a<li>b<li>c</ul>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["• a", "• b", "• c"]);
    }

    #[test]
    fn test_heading_is_bold_block() {
        // テスト項目: 見出しは太字の独立した行になる
        // given (前提条件):
        let html = "yes<h1>Heading</h1>no";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["yes", "\x02Heading", "no"]);
    }

    #[test]
    fn test_nested_bold_toggles_once() {
        // テスト項目: 入れ子の太字は 1 回だけ切り替えられる
        // given (前提条件):
        let html = "<b><strong>hi</strong></b> there";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["\x02hi\x02 there"]);
    }

    #[test]
    fn test_bold_continues_across_lines() {
        // テスト項目: 改行をまたぐ太字は次の行でも太字になる
        // given (前提条件):
        let html = "<b>one<br>two</b>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["\x02one", "\x02two"]);
    }

    #[test]
    fn test_deep_nesting_terminates() {
        // テスト項目: 深く入れ子になった要素でもクラッシュせず、行を生成しない
        // given (前提条件):
        let html = "<div>".repeat(10_000) + &"</div>".repeat(10_000);

        // when (操作):
        let lines = render(&html);

        // then (期待する結果):
        assert!(lines.is_empty());
    }

    #[test]
    fn test_unterminated_markup_keeps_partial_output() {
        // テスト項目: 途中で壊れた HTML でもそれまでの出力が返される
        // given (前提条件):
        let html = "<div>first</div><b>second<a href='x";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["first", "\x02second"]);
    }

    #[test]
    fn test_unmatched_end_tags_are_ignored() {
        // テスト項目: 対応する開始タグのない終了タグは無視される
        // given (前提条件):
        let html = "a</div></span>b";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["ab"]);
    }

    #[test]
    fn test_entities_and_source_line_breaks() {
        // テスト項目: 文字参照がデコードされ、ソース中の改行は空白として扱われる
        // given (前提条件):
        let html = "<p>Tom &amp;\nJerry</p>";

        // when (操作):
        let lines = render(html);

        // then (期待する結果):
        assert_eq!(lines, vec!["Tom & Jerry"]);
    }
}
