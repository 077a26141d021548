use crate::expr::{EvalError, Val};
use crate::keyword::Keyword;
use crate::parser::{parse, ParseErr};
use crate::scanner::{scan, LexError};
use crate::scope::ScopeLink;
use crate::statement::{ControlSignal, Stmt};
use crate::token::Position;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use thiserror::Error;

pub const MAX_CALL_DEPTH: usize = 200;

#[derive(Debug, Error)]
pub enum InterpretErr {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseErr),
    #[error("runtime error: {0}")]
    Eval(#[from] EvalError),
}

impl InterpretErr {
    pub fn pos(&self) -> Option<Position> {
        match self {
            Self::Lex(e) => Some(e.pos()),
            Self::Parse(e) => e.pos(),
            Self::Eval(e) => e.pos(),
        }
    }
}

/// Per-evaluation state threaded through every `exec`/`eval` call.
pub struct Runtime<'a> {
    pub(crate) out: &'a mut dyn Write,
    steps: u64,
    step_limit: Option<u64>,
    depth: usize,
}

impl<'a> Runtime<'a> {
    fn new(out: &'a mut dyn Write, step_limit: Option<u64>) -> Self {
        Runtime {
            out,
            steps: 0,
            step_limit,
            depth: 0,
        }
    }

    pub(crate) fn step(&mut self, pos: Position) -> Result<(), EvalError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(EvalError::StepLimitExceeded { limit, pos }),
            _ => Ok(()),
        }
    }

    pub(crate) fn enter_call(&mut self, pos: Position) -> Result<(), EvalError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH,
                pos,
            });
        }
        self.depth += 1;
        self.step(pos)
    }

    pub(crate) fn leave_call(&mut self) {
        self.depth -= 1;
    }
}

/// Evaluates programs against one root environment.
///
/// Output of `println` goes to `W`. Bindings survive between calls to
/// [`Interpreter::run`], which is what the REPL relies on.
pub struct Interpreter<W: Write = Stdout> {
    global_scope: ScopeLink,
    out: W,
    step_limit: Option<u64>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(out: W) -> Self {
        Interpreter {
            global_scope: Default::default(),
            out,
            step_limit: None,
        }
    }

    /// Caps loop iterations plus function calls per `run`.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    pub fn run(&mut self, code: &str) -> Result<Option<Val>, InterpretErr> {
        let tokens = scan(code)?;
        let program = parse(&tokens)?;
        Ok(self.interpret(&program)?)
    }

    /// Executes `program` and returns the value of its final statement when
    /// that statement is an expression.
    pub fn interpret(&mut self, program: &[Stmt]) -> Result<Option<Val>, EvalError> {
        let mut rt = Runtime::new(&mut self.out, self.step_limit);
        let res = exec_program(program, &self.global_scope, &mut rt);
        self.out.flush()?;
        res
    }

    pub fn get_global(&self, id: &str) -> Option<Val> {
        (*self.global_scope).borrow().get(id).ok()
    }

    pub fn define_global(&mut self, id: &str, val: Val) {
        (*self.global_scope).borrow_mut().define(Rc::from(id), val);
    }

    pub fn global_scope(&self) -> &ScopeLink {
        &self.global_scope
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

fn exec_program(
    program: &[Stmt],
    scope: &ScopeLink,
    rt: &mut Runtime,
) -> Result<Option<Val>, EvalError> {
    let mut last = None;
    for stmt in program {
        last = None;
        match stmt {
            Stmt::Expr(expr) => last = Some(expr.eval(scope, rt)?),
            stmt => match stmt.exec(scope, rt)? {
                ControlSignal::Normal => {}
                ControlSignal::Break => return Err(EvalError::ControlFlow(Keyword::Break)),
                ControlSignal::Continue => return Err(EvalError::ControlFlow(Keyword::Continue)),
                ControlSignal::Return(_) => return Err(EvalError::ControlFlow(Keyword::Return)),
            },
        }
    }
    Ok(last)
}
