//! Operator prompts.

use std::io::{self, BufRead, Write};

use crate::error::{Result, WebjarError};
use crate::types::{PromptDescriptor, PromptKind};

pub const LOCAL_REPOSITORY_FIELD: &str = "webjarPath";

/// Synchronous operator input. Blocks until the operator answers.
pub trait Prompt {
    fn input(&mut self, descriptor: &PromptDescriptor) -> Result<String>;
}

/// Question asked before patching `<localRepository>`.
pub fn local_repository_prompt() -> PromptDescriptor {
    PromptDescriptor {
        kind: PromptKind::Input,
        message: "PLEASE DEFINE THE FULL PATH WHERE YOU WANT TO CREATE THE WEBJAR: ".to_string(),
        field: LOCAL_REPOSITORY_FIELD.to_string(),
    }
}

/// Reads one line per question from any [`BufRead`]; prompts go to stderr.
pub struct LinePrompt<R> {
    reader: R,
}

impl<R: BufRead> LinePrompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

/// Prompt on the process's own terminal.
pub type StdinPrompt = LinePrompt<io::StdinLock<'static>>;

impl StdinPrompt {
    pub fn stdin() -> Self {
        LinePrompt::new(io::stdin().lock())
    }
}

impl<R: BufRead> Prompt for LinePrompt<R> {
    fn input(&mut self, descriptor: &PromptDescriptor) -> Result<String> {
        eprint!("{}", descriptor.message);
        io::stderr().flush().ok();

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).map_err(|e| {
            WebjarError::config(format!("failed to read {}: {e}", descriptor.field))
        })?;

        let answer = line.trim();
        if read == 0 || answer.is_empty() {
            return Err(WebjarError::config(format!(
                "no value entered for {}",
                descriptor.field
            )));
        }
        Ok(answer.to_string())
    }
}
