//! Markdown-lite rendering of message text
//!
//! `**x**` becomes emphasis, a segment starting with `*` becomes a bullet,
//! everything else is plain. One rendered line per input line.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Strong(String),
    Bullet(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedLine {
    pub spans: Vec<Span>,
}

pub fn render_message(text: &str) -> Vec<RenderedLine> {
    text.split('\n').map(render_line).collect()
}

fn render_line(line: &str) -> RenderedLine {
    let mut spans = Vec::new();
    let mut last = 0;

    for m in STRONG.find_iter(line) {
        push_segment(&mut spans, line.get(last..m.start()).unwrap_or_default());
        let inner = m
            .as_str()
            .strip_prefix("**")
            .and_then(|s| s.strip_suffix("**"))
            .unwrap_or_default();
        spans.push(Span::Strong(inner.to_string()));
        last = m.end();
    }
    push_segment(&mut spans, line.get(last..).unwrap_or_default());

    RenderedLine { spans }
}

fn push_segment(spans: &mut Vec<Span>, segment: &str) {
    let trimmed = segment.trim();
    if let Some(rest) = trimmed.strip_prefix('*') {
        spans.push(Span::Bullet(rest.trim().to_string()));
    } else if !segment.is_empty() {
        spans.push(Span::Plain(segment.to_string()));
    }
}
