//! A small, line-oriented markdown renderer.
//!
//! The renderer is called again on every streamed increment, so its input is
//! routinely cut mid-construct. Every block it opens is closed in the same
//! call and an unterminated code fence runs to the end of the input, which
//! keeps the output well-formed for any prefix.
//!
//! All text is HTML-escaped before any markup is inserted. Code spans and
//! links are swapped for placeholders as soon as they are recognised so the
//! emphasis rules cannot reach into them.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::highlight::{FallbackHighlighter, Highlighter};
use super::{escape_html, pattern};

/// Placeholder delimiters. Private-use characters, stripped from input.
const STASH_OPEN: char = '\u{E000}';
const STASH_CLOSE: char = '\u{E001}';

static HEADING: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(#{1,6})\s+(.*)$"));
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^>\s?(.*)$"));
static ORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*\d+\.\s+(.*)$"));
static UNORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*[-*+]\s+(.*)$"));
static SEPARATOR_CELL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^:?-+:?$"));

static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| pattern(r"`([^`]+)`"));
static LINK: LazyLock<Regex> = LazyLock::new(|| pattern(r"\[([^\]]+)\]\(([^)\s]+)\)"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| pattern(r"\*\*([^*]+)\*\*"));
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b_([^_<>]+)_\b"));
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| pattern(r"(^|\W)\*([^*<>]+)\*"));
static SAFE_HREF: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)^(?:https?:|mailto:|#|/)"));
static STASHED: LazyLock<Regex> = LazyLock::new(|| pattern(r"\x{E000}(\d+)\x{E001}"));

/// Renders markdown with the default highlighter.
pub fn render(text: &str) -> String {
    MarkdownRenderer::default().render(text)
}

/// Markdown renderer with a pluggable code highlighter.
pub struct MarkdownRenderer {
    highlighter: Box<dyn Highlighter + Send + Sync>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(FallbackHighlighter)
    }
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    const fn tag(self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn from_separator(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Self::Center,
            (false, true) => Self::Right,
            _ => Self::Left,
        }
    }

    const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Output blocks plus the currently open list, if any.
#[derive(Default)]
struct Blocks {
    out: Vec<String>,
    list: Option<ListKind>,
}

impl Blocks {
    fn push(&mut self, html: String) {
        self.close_list();
        self.out.push(html);
    }

    fn push_item(&mut self, kind: ListKind, html: &str) {
        if self.list != Some(kind) {
            self.close_list();
            self.out.push(format!("<{}>", kind.tag()));
            self.list = Some(kind);
        }
        self.out.push(format!("<li>{html}</li>"));
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            self.out.push(format!("</{}>", kind.tag()));
        }
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.out.join("\n")
    }
}

/// Markup fragments held out of the text while later rules run.
#[derive(Default)]
struct Stash(Vec<String>);

impl Stash {
    fn hold(&mut self, html: String) -> String {
        self.0.push(html);
        format!("{STASH_OPEN}{}{STASH_CLOSE}", self.0.len() - 1)
    }

    fn restore(&self, text: &str) -> String {
        STASHED
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.0.get(index))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

impl MarkdownRenderer {
    pub fn new(highlighter: impl Highlighter + Send + Sync + 'static) -> Self {
        Self {
            highlighter: Box::new(highlighter),
        }
    }

    /// Renders `text` as an HTML fragment. Never fails.
    pub fn render(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let text = normalize(text);
        let lines: Vec<&str> = text.split('\n').collect();
        let mut blocks = Blocks::default();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if let Some(lang) = fence_open(line) {
                let body_start = i + 1;
                let mut body_end = body_start;
                while body_end < lines.len() && !is_fence_close(lines[body_end]) {
                    body_end += 1;
                }
                let code = lines[body_start..body_end].join("\n");
                blocks.push(self.code_block(&code, &lang));
                i = body_end + 1;
                continue;
            }

            if line.trim().is_empty() {
                blocks.close_list();
                i += 1;
                continue;
            }

            if let Some(caps) = HEADING.captures(line) {
                let level = caps[1].len();
                blocks.push(format!("<h{level}>{}</h{level}>", self.inline(&caps[2])));
            } else if let Some(caps) = BLOCKQUOTE.captures(line) {
                blocks.push(format!("<blockquote>{}</blockquote>", self.inline(&caps[1])));
            } else if let Some(caps) = ORDERED_ITEM.captures(line) {
                blocks.push_item(ListKind::Ordered, &self.inline(&caps[1]));
            } else if let Some(caps) = UNORDERED_ITEM.captures(line) {
                blocks.push_item(ListKind::Unordered, &self.inline(&caps[1]));
            } else if let Some(aligns) = table_alignments(&lines, i) {
                let mut end = i + 2;
                while end < lines.len() && is_table_row(lines[end]) {
                    end += 1;
                }
                blocks.push(self.table(lines[i], &lines[i + 2..end], &aligns));
                i = end;
                continue;
            } else {
                blocks.push(format!("<p>{}</p>", self.inline(line)));
            }
            i += 1;
        }

        blocks.finish()
    }

    fn code_block(&self, code: &str, lang: &str) -> String {
        let body = self.highlighter.highlight(code, lang);
        if lang.is_empty() {
            format!("<pre><code>{body}</code></pre>")
        } else {
            format!("<pre><code class=\"language-{lang}\">{body}</code></pre>")
        }
    }

    fn table(&self, header: &str, rows: &[&str], aligns: &[Align]) -> String {
        let mut html = String::from("<table>\n<thead><tr>");
        for (cell, align) in split_row(header).iter().zip(aligns) {
            html.push_str(&format!(
                "<th style=\"text-align:{}\">{}</th>",
                align.as_css(),
                self.inline(cell)
            ));
        }
        html.push_str("</tr></thead>\n<tbody>");
        for row in rows {
            let cells = split_row(row);
            html.push_str("\n<tr>");
            for (column, align) in aligns.iter().enumerate() {
                let cell = cells.get(column).copied().unwrap_or_default();
                html.push_str(&format!(
                    "<td style=\"text-align:{}\">{}</td>",
                    align.as_css(),
                    self.inline(cell)
                ));
            }
            html.push_str("</tr>");
        }
        html.push_str("\n</tbody>\n</table>");
        html
    }

    /// Applies the inline rules to one line of text.
    fn inline(&self, text: &str) -> String {
        let mut stash = Stash::default();
        let escaped = escape_html(text);

        let text = CODE_SPAN.replace_all(&escaped, |caps: &Captures| {
            stash.hold(format!("<code>{}</code>", &caps[1]))
        });
        let text = LINK
            .replace_all(&text, |caps: &Captures| {
                let label = stash.restore(&emphasize(&caps[1]));
                let href = safe_href(&caps[2]);
                stash.hold(format!(
                    "<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{label}</a>"
                ))
            })
            .into_owned();

        stash.restore(&emphasize(&text))
    }
}

/// Line endings to `\n`; placeholder delimiters replaced so input cannot
/// forge a stash reference.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\r' => '\n',
            STASH_OPEN | STASH_CLOSE => char::REPLACEMENT_CHARACTER,
            _ => c,
        })
        .collect()
}

/// Returns the language tag when `line` opens a code fence.
fn fence_open(line: &str) -> Option<String> {
    let info = line.trim_start().strip_prefix("```")?;
    let tag = info.split_whitespace().next().unwrap_or_default();
    Some(
        tag.chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'))
            .collect(),
    )
}

fn is_fence_close(line: &str) -> bool {
    line.trim_start()
        .strip_prefix("```")
        .is_some_and(|rest| rest.trim_start_matches('`').trim().is_empty())
}

fn split_row(line: &str) -> Vec<&str> {
    let row = line.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(str::trim).collect()
}

fn is_table_row(line: &str) -> bool {
    line.contains('|') && !line.trim().is_empty()
}

/// Column alignments when `lines[index]` is a table header followed by a
/// separator row with the same number of columns.
fn table_alignments(lines: &[&str], index: usize) -> Option<Vec<Align>> {
    let header = lines.get(index)?;
    let separator = lines.get(index + 1)?;
    if !header.contains('|') || !separator.contains('-') {
        return None;
    }

    let columns = split_row(header).len();
    let cells = split_row(separator);
    if cells.len() != columns || !cells.iter().all(|cell| SEPARATOR_CELL.is_match(cell)) {
        return None;
    }
    Some(cells.into_iter().map(Align::from_separator).collect())
}

/// Bold, then both italic forms. Inserted tags never cross each other.
fn emphasize(text: &str) -> String {
    let text = BOLD.replace_all(text, "<strong>$1</strong>");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "<em>$1</em>");
    italic_star(&text)
}

/// `*x*` preceded by a non-word character and not followed by a word
/// character.
fn italic_star(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in ITALIC_STAR.captures_iter(text) {
        let (Some(whole), Some(lead), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let next = text[whole.end()..].chars().next();
        if next.is_some_and(|c| c.is_alphanumeric() || c == '_') {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(lead.as_str());
        out.push_str("<em>");
        out.push_str(inner.as_str());
        out.push_str("</em>");
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

/// `href` if its scheme is allowed, `#` otherwise. Input is already escaped.
fn safe_href(href: &str) -> &str {
    let href = href.trim();
    // Browsers read `/\host` the same as `//host`.
    let protocol_relative = href.starts_with("//") || href.starts_with("/\\");
    if SAFE_HREF.is_match(href) && !protocol_relative {
        href
    } else {
        "#"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Checks that every opened tag is closed in order.
    fn assert_balanced(html: &str) {
        let tag = Regex::new(r"<(/?)([a-z][a-z0-9]*)[^>]*>").unwrap();
        let mut open: Vec<String> = Vec::new();
        for caps in tag.captures_iter(html) {
            let name = caps[2].to_string();
            if caps[1].is_empty() {
                open.push(name);
            } else {
                assert_eq!(open.pop().as_deref(), Some(name.as_str()), "misnested in {html}");
            }
        }
        assert!(open.is_empty(), "unclosed {open:?} in {html}");
    }

    const DOCUMENT: &str = "# Título\n\nSome **bold** and _em_ and *star* with `x < y`.\n\n- one\n- two [site](https://example.com?a=1&b=2)\n\n1. first\n2. second\n\n> quoted **text**\n\n| name | n |\n|:-----|--:|\n| a | 1 |\n| b | 2 |\n\n```rust\nfn main() {\n    let s = \"hi\"; // note\n}\n```\n\nDone.";

    #[test]
    fn test_bold_code_and_unsafe_link() {
        let html = render("**bold** and `code` and [x](javascript:alert(1))");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<code>code</code>"));
        assert!(html.contains("<a href=\"#\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_simple_table() {
        let html = render("a|b\n---|---\n1|2");
        assert_eq!(
            html,
            "<table>\n<thead><tr><th style=\"text-align:left\">a</th><th style=\"text-align:left\">b</th></tr></thead>\n<tbody>\n<tr><td style=\"text-align:left\">1</td><td style=\"text-align:left\">2</td></tr>\n</tbody>\n</table>"
        );
    }

    #[test]
    fn test_table_alignment_from_separator() {
        let html = render("|l|c|r|\n|:--|:-:|--:|");
        assert!(html.contains("<th style=\"text-align:left\">l</th>"));
        assert!(html.contains("<th style=\"text-align:center\">c</th>"));
        assert!(html.contains("<th style=\"text-align:right\">r</th>"));
        assert!(html.contains("<tbody>\n</tbody>"));
    }

    #[test]
    fn test_header_without_separator_is_a_paragraph() {
        assert_eq!(render("a|b"), "<p>a|b</p>");
        assert_eq!(render("a|b\n---"), "<p>a|b</p>\n<p>---</p>");
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render("<script>alert('x')</script>");
        assert_eq!(
            html,
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let html = render("intro\n```python\nif x:\n    <b>");
        assert!(html.starts_with("<p>intro</p>\n<pre><code class=\"language-python\">"));
        assert!(html.ends_with("&lt;b&gt;</code></pre>"));
        assert_balanced(&html);
    }

    #[test]
    fn test_inline_rules_do_not_touch_code() {
        let html = render("```\n**not bold** [x](javascript:y)\n```");
        assert_eq!(
            html,
            "<pre><code>**not bold** [x](javascript:y)</code></pre>"
        );
        let html = render("`**a**` **b**");
        assert_eq!(html, "<p><code>**a**</code> <strong>b</strong></p>");
    }

    #[test]
    fn test_link_labels_get_emphasis_but_hrefs_do_not() {
        let html = render("[**go**](/docs/a_b_c) and [mail](mailto:a@b.c) and [x](//evil.com)");
        assert!(html.contains("<a href=\"/docs/a_b_c\" target=\"_blank\" rel=\"noopener noreferrer\"><strong>go</strong></a>"));
        assert!(html.contains("href=\"mailto:a@b.c\""));
        assert!(html.contains("<a href=\"#\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"));
    }

    #[test]
    fn test_backslash_host_href_is_neutralized() {
        assert_eq!(
            render("[x](/\\evil.com)"),
            "<p><a href=\"#\" target=\"_blank\" rel=\"noopener noreferrer\">x</a></p>"
        );
        assert_eq!(safe_href("/\\\\evil.com"), "#");
        assert_eq!(safe_href("/docs\\page"), "/docs\\page");
    }

    #[test]
    fn test_italic_word_boundaries() {
        assert_eq!(render("snake_case_name"), "<p>snake_case_name</p>");
        assert_eq!(render("_a_ and *b*"), "<p><em>a</em> and <em>b</em></p>");
        assert_eq!(render("2*3*4"), "<p>2*3*4</p>");
    }

    #[test]
    fn test_lists_switch_and_close() {
        let html = render("- a\n- b\n1. c\ntext");
        assert_eq!(
            html,
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<ol>\n<li>c</li>\n</ol>\n<p>text</p>"
        );
    }

    #[test]
    fn test_headings_and_blockquote() {
        assert_eq!(render("### Hi *there*"), "<h3>Hi <em>there</em></h3>");
        assert_eq!(render("####### seven"), "<p>####### seven</p>");
        assert_eq!(render("> q"), "<blockquote>q</blockquote>");
    }

    #[test]
    fn test_forged_placeholders_are_neutralized() {
        let html = render("\u{E000}0\u{E001} `c`");
        assert!(!html.contains('\u{E000}'));
        assert!(html.contains("\u{FFFD}0\u{FFFD}"));
        assert_eq!(html.matches("<code>").count(), 1);
    }

    #[test]
    fn test_crlf_is_normalized() {
        assert_eq!(render("a\r\n\r\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_every_prefix_renders_balanced_tags() {
        for (end, _) in DOCUMENT.char_indices() {
            assert_balanced(&render(&DOCUMENT[..end]));
        }
        assert_balanced(&render(DOCUMENT));
    }

    #[test]
    fn test_full_document_structure() {
        let html = render(DOCUMENT);
        assert!(html.starts_with("<h1>Título</h1>"));
        assert!(html.contains("<code>x &lt; y</code>"));
        assert!(html.contains("href=\"https://example.com?a=1&amp;b=2\""));
        assert!(html.contains("<pre><code class=\"language-rust\"><span class=\"tok-keyword\">fn</span>"));
        assert!(html.contains("<th style=\"text-align:right\">n</th>"));
        assert!(html.ends_with("<p>Done.</p>"));
    }

    struct Upper;

    impl Highlighter for Upper {
        fn highlight(&self, code: &str, _lang: &str) -> String {
            escape_html(&code.to_uppercase())
        }
    }

    #[test]
    fn test_custom_highlighter() {
        let renderer = MarkdownRenderer::new(Upper);
        assert_eq!(
            renderer.render("```txt\nabc\n```"),
            "<pre><code class=\"language-txt\">ABC</code></pre>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n"), "");
    }
}
