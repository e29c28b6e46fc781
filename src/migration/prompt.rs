//! Operator confirmation prompts

use regex::Regex;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{LazyLock, Mutex};

use super::errors::MigrationError;

static YES_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[yY](?:[eE][sS])?|[nN][oO]?)$").expect("valid regex"));

pub trait Confirmer: Send + Sync {
    /// Ask the operator a yes/no question. The default answer is "no".
    fn confirm(&self, message: &str) -> Result<bool, MigrationError>;
}

/// Quiet mode: every prompt is answered "yes"
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, message: &str) -> Result<bool, MigrationError> {
        tracing::debug!(prompt = message, "auto-confirmed");
        Ok(true)
    }
}

/// Interactive prompt reading `y`/`n` answers line by line
pub struct TerminalConfirmer<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalConfirmer<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R, W> TerminalConfirmer<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R, W> Confirmer for TerminalConfirmer<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm(&self, message: &str) -> Result<bool, MigrationError> {
        let mut input = self.input.lock().unwrap_or_else(|p| p.into_inner());
        let mut output = self.output.lock().unwrap_or_else(|p| p.into_inner());

        loop {
            write!(output, "{message} (y/N): ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                // EOF takes the default
                writeln!(output)?;
                return Ok(false);
            }

            let answer = line.trim();
            if answer.is_empty() {
                return Ok(false);
            }
            if YES_NO.is_match(answer) {
                return Ok(answer.starts_with(['y', 'Y']));
            }
            writeln!(output, "You must type 'y' or 'n'")?;
        }
    }
}
