//! Lightweight lexical highlighting for fenced code blocks.
//!
//! Comments and string literals are matched first and emitted whole, so the
//! keyword and number rules only ever see the code between them. This is an
//! approximation, not a tokenizer: malformed code still renders, just with
//! imperfect colouring.

use regex::Regex;
use std::sync::LazyLock;

use super::{escape_html, pattern};

/// Turns source code into escaped HTML, optionally wrapped in token spans.
pub trait Highlighter {
    /// Returns `code` as HTML. Must escape everything it does not wrap.
    fn highlight(&self, code: &str, lang: &str) -> String;
}

/// Regex-based highlighter for a handful of common language families.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackHighlighter;

impl Highlighter for FallbackHighlighter {
    fn highlight(&self, code: &str, lang: &str) -> String {
        match Family::from_tag(lang) {
            Some(family) => family.highlight(code),
            None => escape_html(code),
        }
    }
}

/// Highlights `code` with the [`FallbackHighlighter`].
pub fn highlight(code: &str, lang: &str) -> String {
    FallbackHighlighter.highlight(code, lang)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    CLike,
    Json,
    Python,
    Shell,
}

static C_PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r#"(?P<comment>//[^\n]*|/\*(?s:.*?)(?:\*/|\z))|(?P<string>"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?|`(?:[^`\\]|\\(?s:.))*`?)"#,
    )
});
static C_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?P<keyword>as|async|await|auto|bool|break|case|catch|char|class|const|continue|default|delete|do|double|else|enum|export|extends|extern|false|final|finally|float|fn|for|from|func|function|go|if|impl|implements|import|in|instanceof|int|interface|let|long|loop|match|mod|mut|namespace|new|null|nullptr|package|private|protected|pub|public|return|self|short|static|struct|super|switch|this|throw|throws|trait|true|try|type|typeof|undefined|unsigned|use|using|var|void|volatile|where|while|yield)\b|(?P<number>\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b)",
    )
});

static JSON_PROTECTED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?P<string>"(?:[^"\\\n]|\\.)*"?)"#));
static JSON_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(?P<keyword>true|false|null)\b|(?P<number>-?\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b)")
});
static JSON_KEY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\s*:"));

static PY_PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r#"(?P<comment>#[^\n]*)|(?P<string>"""(?s:.*?)(?:"""|\z)|'''(?s:.*?)(?:'''|\z)|"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?)"#,
    )
});
static PY_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?P<keyword>False|None|True|and|as|assert|async|await|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|self|try|while|with|yield)\b|(?P<number>\b(?:0[xXoObB][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?j?)\b)",
    )
});

static SH_PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?P<comment>(?m:^|[ \t])#[^\n]*)|(?P<string>"(?:[^"\\]|\\(?s:.))*"?|'[^']*'?)"#)
});
static SH_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"\b(?P<keyword>case|cd|do|done|echo|elif|else|esac|exit|export|fi|for|function|if|in|local|read|return|set|shift|source|then|unset|until|while)\b|(?P<number>\b\d+\b)",
    )
});

impl Family {
    fn from_tag(lang: &str) -> Option<Self> {
        let tag = lang.trim().to_ascii_lowercase();
        let family = match tag.as_str() {
            "c" | "h" | "cpp" | "c++" | "cc" | "hpp" | "cs" | "csharp" | "java" | "kotlin"
            | "kt" | "go" | "golang" | "rust" | "rs" | "js" | "javascript" | "jsx" | "mjs"
            | "ts" | "typescript" | "tsx" | "swift" | "scala" | "dart" | "php" => Self::CLike,
            "json" | "json5" | "jsonc" => Self::Json,
            "py" | "python" | "python3" => Self::Python,
            "sh" | "bash" | "zsh" | "shell" | "ksh" | "console" => Self::Shell,
            _ => return None,
        };
        Some(family)
    }

    fn rules(self) -> (&'static Regex, &'static Regex) {
        match self {
            Self::CLike => (&C_PROTECTED, &C_WORDS),
            Self::Json => (&JSON_PROTECTED, &JSON_WORDS),
            Self::Python => (&PY_PROTECTED, &PY_WORDS),
            Self::Shell => (&SH_PROTECTED, &SH_WORDS),
        }
    }

    fn highlight(self, code: &str) -> String {
        let (protected, words) = self.rules();
        let mut out = String::with_capacity(code.len() + code.len() / 2);
        let mut last = 0;

        for caps in protected.captures_iter(code) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.is_empty() {
                continue;
            }
            push_words(&mut out, &code[last..whole.start()], words);

            let class = if caps.name("comment").is_some() {
                "comment"
            } else if self == Self::Json && JSON_KEY_SUFFIX.is_match(&code[whole.end()..]) {
                "key"
            } else {
                "string"
            };
            push_token(&mut out, class, whole.as_str());
            last = whole.end();
        }

        push_words(&mut out, &code[last..], words);
        out
    }
}

fn push_token(out: &mut String, class: &str, text: &str) {
    out.push_str("<span class=\"tok-");
    out.push_str(class);
    out.push_str("\">");
    out.push_str(&escape_html(text));
    out.push_str("</span>");
}

/// Emits plain code, wrapping keywords and numbers.
fn push_words(out: &mut String, plain: &str, words: &Regex) {
    let mut last = 0;
    for caps in words.captures_iter(plain) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.is_empty() {
            continue;
        }
        out.push_str(&escape_html(&plain[last..whole.start()]));
        let class = if caps.name("keyword").is_some() {
            "keyword"
        } else {
            "number"
        };
        push_token(out, class, whole.as_str());
        last = whole.end();
    }
    out.push_str(&escape_html(&plain[last..]));
}
