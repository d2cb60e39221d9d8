//! Interactive read-eval loop.
//!
//! Input is tokenized line by line and tokens accumulate until a `;`
//! completes a statement. A failing statement is reported and the loop
//! carries on with the next one.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use csvsql_core::query::{Lexer, QueryResult, Token, TokenKind};
use tracing::warn;

use crate::{format, security, Engine};

const PROMPT: &str = "> ";

/// Why a statement loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// An `EXIT` statement ran
    Exit,
    /// Input ran out
    EndOfInput,
}

/// Read-eval loop over an [`Engine`]
#[derive(Debug)]
pub struct Shell {
    engine: Engine,
    pending: Vec<Token>,
    prompt: bool,
}

impl Shell {
    /// Shell printing a `> ` prompt before each line
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            pending: Vec::new(),
            prompt: true,
        }
    }

    /// Turn the prompt off, e.g. for piped input
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Run until `EXIT` or end of input. Only I/O failures on `input` or
    /// `out` are returned; statement errors are written to `out`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<ShellExit> {
        let mut lines = input.lines();
        loop {
            if self.prompt {
                write!(out, "{}", PROMPT)?;
                out.flush()?;
            }
            let Some(line) = lines.next().transpose()? else {
                break;
            };
            if self.feed_line(&line, &mut out)? == Some(ShellExit::Exit) {
                return Ok(ShellExit::Exit);
            }
        }

        // A final statement without its terminator still runs
        if !self.pending.is_empty() {
            let tokens = std::mem::take(&mut self.pending);
            if self.run_tokens(&tokens, &mut out)? {
                return Ok(ShellExit::Exit);
            }
        }
        Ok(ShellExit::EndOfInput)
    }

    /// Consume one line of input, running every statement it completes.
    pub fn feed_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Option<ShellExit>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        if let Err(e) = security::validate_query(line, self.engine.config().max_query_length) {
            warn!(error = %e, "Rejected input line");
            writeln!(out, "Error: {}", e)?;
            return Ok(None);
        }

        let tokens = match Lexer::new(line).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => {
                // Drop the partial statement along with the bad line
                self.pending.clear();
                warn!(error = %e, "Could not tokenize input");
                writeln!(out, "Error: {}", e)?;
                return Ok(None);
            }
        };

        for token in tokens {
            if token.kind != TokenKind::End {
                self.pending.push(token);
                continue;
            }
            let statement = std::mem::take(&mut self.pending);
            if statement.is_empty() {
                continue;
            }
            if self.run_tokens(&statement, out)? {
                return Ok(Some(ShellExit::Exit));
            }
        }
        Ok(None)
    }

    /// Run one statement and print its outcome; true on `EXIT`.
    fn run_tokens<W: Write>(&mut self, tokens: &[Token], out: &mut W) -> io::Result<bool> {
        let start = Instant::now();
        match self.engine.run_statement(tokens) {
            Ok(QueryResult::Exit) => Ok(true),
            Ok(result) => {
                let config = self.engine.config();
                format::write_result(out, result, config.format, config.echo_timing)?;
                if config.echo_timing {
                    writeln!(
                        out,
                        "({:.3}ms)",
                        start.elapsed().as_secs_f64() * 1000.0
                    )?;
                }
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Statement failed");
                writeln!(out, "Error: {}", e)?;
                Ok(false)
            }
        }
    }
}
