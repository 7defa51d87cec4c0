//! Console seam between the executor and whoever watches the run.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::PromptError;

/// Where step output goes and where INPUT answers come from.
pub trait Console {
    /// Emit one line of user-facing output.
    fn emit(&mut self, line: &str);

    /// Prompt for one line of input. End of input is `PromptError::Cancelled`.
    fn read_line(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;
}

/// Plain stdin/stdout console.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn emit(&mut self, line: &str) {
        println!("{}", line);
    }

    fn read_line(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut stdout = std::io::stdout();
        let shown = match default {
            Some(default) => format!("{} [{}]: ", prompt, default),
            None => format!("{}: ", prompt),
        };
        stdout
            .write_all(shown.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| PromptError::Unavailable(e.to_string()))?;

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| PromptError::Unavailable(e.to_string()))?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Console fed from a fixed script of answers; output is captured.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Lines emitted so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Prompts shown so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn printed(&self, line: &str) -> bool {
        self.output.iter().any(|l| l == line)
    }
}

impl Console for ScriptedConsole {
    fn emit(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self, prompt: &str, _default: Option<&str>) -> Result<String, PromptError> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or(PromptError::Cancelled)
    }
}
