// Console abstraction: every flow reads lines and prints text through the
// `Console` trait. `TerminalConsole` is the real thing (dialoguer prompts,
// indicatif spinner); `ScriptedConsole` replays canned input and records
// output, which is how the flows are driven in tests.

use anyhow::{bail, Result};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::time::Duration;

pub trait Console {
    /// Show `prompt` and read one line. Empty input is allowed.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Print one line of output.
    fn say(&mut self, text: &str);

    /// Run a blocking remote call while showing `message` as a spinner.
    fn busy<T, F>(&mut self, message: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        let result = f();
        spinner.finish_and_clear();
        result
    }
}

/// Interactive terminal backed by `dialoguer::Input`.
#[derive(Default)]
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let line: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(line)
    }

    fn say(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Non-interactive console fed from a fixed list of answers.
///
/// Public because the flow tests under `tests/` only see the crate's public
/// API; it also works for driving the menu from a canned script.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub prompts: Vec<String>,
    pub output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedConsole {
            inputs: inputs.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    /// Whether any printed line contains `needle`.
    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        match self.inputs.pop_front() {
            Some(line) => Ok(line),
            None => bail!("input exhausted at prompt: {}", prompt),
        }
    }

    fn say(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn busy<T, F>(&mut self, _message: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        f()
    }
}
