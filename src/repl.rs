use crate::expr::Val;
use crate::interpreter::{InterpretErr, Interpreter};
use crate::module::{ENTRY_NAME, ENTRY_VARIABLE};
use crate::scanner::{tokenize, LexError};
use crate::token::TokenType;
use std::io::{self, Stdout, Write};

pub const PROMPT: &str = "> ";
pub const EXIT_COMMAND: &str = ".exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Continue,
    Exit,
}

/// An interactive session: one root environment for every fragment.
///
/// A fragment that fails to lex, parse or evaluate is reported and dropped;
/// whatever earlier fragments bound stays available.
pub struct Repl<W: Write = Stdout> {
    interpreter: Interpreter<W>,
}

impl<W: Write> Repl<W> {
    pub fn new(out: W) -> Self {
        let mut interpreter = Interpreter::with_output(out);
        interpreter.define_global(ENTRY_VARIABLE, Val::Str(ENTRY_NAME.into()));
        Repl { interpreter }
    }

    pub fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.interpreter.set_step_limit(limit);
        self
    }

    pub fn eval(&mut self, fragment: &str) -> Result<Option<Val>, InterpretErr> {
        tracing::debug!(fragment, "evaluating fragment");
        self.interpreter.run(fragment)
    }

    /// Evaluates `fragment` and writes its value, or the error, to the sink.
    pub fn feed(&mut self, fragment: &str) -> io::Result<Feed> {
        let trimmed = fragment.trim();
        if trimmed == EXIT_COMMAND {
            return Ok(Feed::Exit);
        }
        if trimmed.is_empty() {
            return Ok(Feed::Continue);
        }

        match self.eval(fragment) {
            Ok(None) | Ok(Some(Val::None)) => {}
            Ok(Some(val)) => writeln!(self.interpreter.output_mut(), "{}", val)?,
            Err(err) => {
                tracing::debug!(error = %err, "fragment failed");
                writeln!(self.interpreter.output_mut(), "error: {}", err)?;
            }
        }
        self.interpreter.output_mut().flush()?;
        Ok(Feed::Continue)
    }

    /// Feeds fragments in order until they run out or one asks to exit.
    pub fn run<I, S>(&mut self, fragments: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for fragment in fragments {
            if self.feed(fragment.as_ref())? == Feed::Exit {
                break;
            }
        }
        Ok(())
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }
}

/// Groups lines into fragments the way the line editor does: a fragment
/// ends at the first line that closes every bracket opened before it.
pub fn fragments<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut res = vec![];
    let mut pending = String::new();
    for line in lines {
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(line.as_ref());
        if !is_open(&pending) {
            res.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        res.push(pending);
    }
    res
}

// Text that fails to lex for another reason is complete: feeding it
// reports the error.
fn is_open(text: &str) -> bool {
    let mut depth = 0i64;
    for tok in tokenize(text) {
        match tok.map(|t| t.data) {
            Ok(TokenType::LeftParen | TokenType::LeftBrace) => depth += 1,
            Ok(TokenType::RightParen | TokenType::RightBrace) => depth -= 1,
            Ok(_) => {}
            Err(LexError::UnterminatedString { .. }) => return true,
            Err(_) => return false,
        }
    }
    depth > 0
}
