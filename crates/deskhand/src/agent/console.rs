//! The operator's terminal, as an injectable capability.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

/// Line-oriented operator I/O.
pub trait Console: Send {
    /// Show `prompt` and read one line without its trailing newline.
    /// `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn print_line(&mut self, text: &str);

    fn print_error(&mut self, text: &str);

    /// Whether printed text may carry ANSI colors.
    fn supports_color(&self) -> bool {
        false
    }

    /// Ask a yes/no question. Only `y` or `yes` (any case) approve; end of
    /// input is a no.
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.read_line(&format!("{question} (y/n): "))?;
        Ok(answer.is_some_and(|a| {
            let a = a.trim();
            a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")
        }))
    }
}

/// Console over the process's stdin, stdout and stderr.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        drop(stdout);

        read_line_lossy(&mut io::stdin().lock())
    }

    fn supports_color(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn print_line(&mut self, text: &str) {
        println!("{text}");
    }

    fn print_error(&mut self, text: &str) {
        eprintln!("{text}");
    }
}

/// Read one line without its line ending. Invalid UTF-8 is replaced
/// rather than rejected. `None` at end of input.
pub fn read_line_lossy(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while buf.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Console fed from canned input that records everything shown.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    /// Prompts passed to `read_line`, in order.
    pub prompts: Vec<String>,
    /// Lines printed with `print_line`.
    pub output: Vec<String>,
    /// Lines printed with `print_error`.
    pub errors: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Input lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Whether any printed line contains `needle`.
    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|l| l.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.input.pop_front())
    }

    fn print_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn print_error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }
}
