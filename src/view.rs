//! Presentation of per-model results.
//!
//! Each model gets a card. A card's body is re-rendered from the full
//! accumulated text on every partial update, so the page is always the
//! rendering of a prefix of the final translation.

use anyhow::Result;
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::fs::atomic_write;
use crate::output;
use crate::render::{MarkdownRenderer, escape_html};
use crate::translation::{JobEvent, JobResult, JobStatus};
use crate::ui::{Spinner, Style};

/// Minimum time between two intermediate writes of the HTML page.
const PAGE_WRITE_INTERVAL: Duration = Duration::from_millis(250);

const PAGE_STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:2rem auto;max-width:60rem;padding:0 1rem;color:#222}
.cards{display:grid;grid-template-columns:repeat(auto-fit,minmax(22rem,1fr));gap:1rem}
.card{border:1px solid #ddd;border-radius:8px;padding:0 1rem 1rem}
.card header{display:flex;gap:.5rem;align-items:baseline;border-bottom:1px solid #eee}
.card h2{font-size:1rem;margin:.75rem 0}
.provider,.status{color:#777;font-size:.85rem}
.failed{border-color:#e99}
.error{color:#b00}
pre{background:#f6f8fa;padding:.75rem;overflow-x:auto}
table{border-collapse:collapse}td,th{border:1px solid #ddd;padding:.25rem .5rem}
.tok-comment{color:#6a737d}.tok-string{color:#032f62}.tok-key{color:#005cc5}
.tok-number{color:#e36209}.tok-keyword{color:#d73a49}";

fn status_label(status: &JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "waiting",
        JobStatus::Streaming => "streaming",
        JobStatus::Done => "done",
        JobStatus::Failed(_) => "failed",
    }
}

/// Live state of every card plus the terminal progress lines.
pub struct ResultView {
    title: String,
    cards: Vec<JobResult>,
    renderer: MarkdownRenderer,
    bodies: Vec<String>,
    html_path: Option<PathBuf>,
    last_write: Option<Instant>,
    progress: MultiProgress,
    spinners: Vec<Spinner>,
}

impl ResultView {
    /// Creates one card per `(model, provider)` pair, in job order.
    pub fn new(title: String, cards: Vec<JobResult>, html_path: Option<PathBuf>) -> Self {
        let progress = if output::is_quiet() {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
        };
        let spinners = cards
            .iter()
            .map(|card| {
                Spinner::attached(
                    &progress,
                    &format!("{} ({})", card.model, card.provider),
                    status_label(&card.status),
                )
            })
            .collect();
        let bodies = vec![String::new(); cards.len()];

        Self {
            title,
            cards,
            renderer: MarkdownRenderer::default(),
            bodies,
            html_path,
            last_write: None,
            progress,
            spinners,
        }
    }

    pub fn cards(&self) -> &[JobResult] {
        &self.cards
    }

    /// Applies one job notification to the card at `index`.
    pub fn apply(&mut self, index: usize, event: JobEvent) -> Result<()> {
        let Some(card) = self.cards.get_mut(index) else {
            tracing::debug!(index, "event for unknown card");
            return Ok(());
        };

        let finished = matches!(event, JobEvent::Finished(_));
        match event {
            JobEvent::Streaming => {
                card.status = JobStatus::Streaming;
                if let Some(spinner) = self.spinners.get(index) {
                    spinner.set_message("streaming...".to_string());
                }
            }
            JobEvent::Partial { text } => {
                card.status = JobStatus::Streaming;
                card.text = text;
                if let Some(spinner) = self.spinners.get(index) {
                    spinner.set_message(format!("{} chars", card.text.chars().count()));
                }
            }
            JobEvent::Finished(result) => {
                *card = result;
                if let Some(spinner) = self.spinners.get(index) {
                    spinner.finish_with_message(match &card.status {
                        JobStatus::Failed(err) => Style::error(format!("failed: {err}")),
                        _ => Style::success(format!("done, {} chars", card.text.chars().count())),
                    });
                }
            }
        }

        if let Some(body) = self.bodies.get_mut(index) {
            *body = card_body(&self.renderer, card);
        }
        self.write_page(finished)
    }

    /// Writes the HTML page if a path was given. Intermediate writes are
    /// throttled; `force` bypasses the throttle.
    pub fn write_page(&mut self, force: bool) -> Result<()> {
        let Some(path) = &self.html_path else {
            return Ok(());
        };
        if !force
            && self
                .last_write
                .is_some_and(|at| at.elapsed() < PAGE_WRITE_INTERVAL)
        {
            return Ok(());
        }
        atomic_write(path, &self.page())?;
        self.last_write = Some(Instant::now());
        Ok(())
    }

    /// The complete standalone HTML document.
    pub fn page(&self) -> String {
        let title = escape_html(&self.title);
        let mut html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<style>\n{PAGE_STYLE}\n</style>\n</head>\n<body>\n\
             <h1>{title}</h1>\n<div class=\"cards\">\n"
        );
        for (card, body) in self.cards.iter().zip(&self.bodies) {
            html.push_str(&card_html(card, body));
            html.push('\n');
        }
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }

    /// Clears the progress lines before final output is printed.
    pub fn finish(&self) {
        if let Err(err) = self.progress.clear() {
            tracing::debug!(error = %err, "could not clear progress lines");
        }
    }
}

/// Rendered body of a card: the translation so far, then the error if any.
fn card_body(renderer: &MarkdownRenderer, card: &JobResult) -> String {
    let mut body = renderer.render(&card.text);
    if let JobStatus::Failed(err) = &card.status {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&format!(
            "<p class=\"error\">Error: {}</p>",
            escape_html(&err.to_string())
        ));
    }
    body
}

fn card_html(card: &JobResult, body: &str) -> String {
    let class = if card.error().is_some() {
        "card failed"
    } else {
        "card"
    };
    format!(
        "<section class=\"{class}\">\n<header><h2>{}</h2><span class=\"provider\">{}</span>\
         <span class=\"status\">{}</span></header>\n<div class=\"body\">\n{body}\n</div>\n</section>",
        escape_html(&card.model),
        escape_html(&card.provider),
        status_label(&card.status),
    )
}

/// Plain-text report of all results. A single result is printed bare so the
/// output can be piped.
pub fn text_report(cards: &[JobResult]) -> String {
    if let [only] = cards {
        return only.display_text();
    }
    cards
        .iter()
        .map(|card| {
            format!(
                "{}\n{}",
                Style::header(format!("── {} ({}) ──", card.model, card.provider)),
                card.display_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Rendered HTML fragments of all results, one card each, without the page
/// wrapper.
pub fn html_report(cards: &[JobResult]) -> String {
    let renderer = MarkdownRenderer::default();
    cards
        .iter()
        .map(|card| card_html(card, &card_body(&renderer, card)))
        .collect::<Vec<_>>()
        .join("\n")
}
