//! Source text input from files and stdin.

mod reader;

pub use reader::{InputReader, LONG_INPUT_CHARS, MAX_INPUT_SIZE};
