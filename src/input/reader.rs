use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hard limit on the size of the source text, in bytes.
pub const MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Inputs longer than this many characters get a notice before translating.
pub const LONG_INPUT_CHARS: usize = 5000;

/// Reads the text to translate from a file or stdin.
pub struct InputReader;

impl InputReader {
    pub fn read(file_path: Option<&Path>) -> Result<String> {
        match file_path {
            Some(path) => Self::read_file(path),
            None => Self::read_from(io::stdin().lock(), "stdin"),
        }
    }

    fn read_file(path: &Path) -> Result<String> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        Self::read_from(file, &path.display().to_string())
    }

    /// Reads all of `source`, refusing to buffer more than
    /// [`MAX_INPUT_SIZE`] bytes.
    pub fn read_from<R: Read>(source: R, name: &str) -> Result<String> {
        let mut buffer = Vec::new();
        source
            .take(MAX_INPUT_SIZE as u64 + 1)
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read from {name}"))?;

        if buffer.len() > MAX_INPUT_SIZE {
            bail!(
                "Input from {name} exceeds the maximum allowed size (1 MB).\n\n\
                 Consider splitting it into smaller parts."
            );
        }

        String::from_utf8(buffer).with_context(|| format!("Input from {name} is not valid UTF-8"))
    }
}
