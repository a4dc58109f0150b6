//! Markdown rendering command handler.

use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;

use crate::input::InputReader;
use crate::render::render;

/// Renders markdown from `file` (or stdin) to an HTML fragment on stdout.
pub fn run_render(file: Option<&Path>) -> Result<()> {
    let source = InputReader::read(file)?;
    let html = render(&source);

    let mut stdout = io::stdout().lock();
    stdout.write_all(html.as_bytes())?;
    if !html.is_empty() {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}
