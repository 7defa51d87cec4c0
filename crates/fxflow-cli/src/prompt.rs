//! Terminal console for workflow runs.
//!
//! Prompts go through `dialoguer` when stdin is a terminal and fall back to
//! plain line reads otherwise, so answers can be piped in.

use std::io::ErrorKind;

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use fxflow_core::error::PromptError;
use fxflow_core::workflow::{Console, StdConsole};

pub struct TerminalConsole {
    term: Term,
    theme: ColorfulTheme,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn emit(&mut self, line: &str) {
        let styled = if line.starts_with('❌') {
            style(line).red().to_string()
        } else if line.starts_with('✅') {
            style(line).green().to_string()
        } else if line.starts_with('⚠') {
            style(line).yellow().to_string()
        } else {
            line.to_string()
        };
        if self.term.write_line(&styled).is_err() {
            println!("{}", line);
        }
    }

    fn read_line(&mut self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        if !self.term.is_term() {
            return StdConsole.read_line(prompt, default);
        }

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string()).show_default(true);
        }

        input.interact_text_on(&self.term).map_err(|e| match e {
            dialoguer::Error::IO(io)
                if matches!(io.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof) =>
            {
                PromptError::Cancelled
            }
            other => PromptError::Unavailable(other.to_string()),
        })
    }
}
