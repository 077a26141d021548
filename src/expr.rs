use std::{
    fmt::{self, Display, Write as _},
    io,
    rc::Rc,
};

use thiserror::Error;

use crate::interpreter::Runtime;
use crate::keyword::Keyword;
use crate::scope::{Scope, ScopeLink, UnboundName};
use crate::stack::ensure_sufficient_stack;
use crate::statement::{ControlSignal, Stmt};
use crate::token::{Position, TokenType};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum NativeCall {
    Println,
}

impl NativeCall {
    pub fn arity(&self) -> usize {
        match self {
            Self::Println => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Println => "println",
        }
    }

    pub fn call(&self, vals: &[Val], rt: &mut Runtime, pos: Position) -> Result<Val, EvalError> {
        if self.arity() != vals.len() {
            return Err(EvalError::WrongArgumentCount {
                expected: self.arity(),
                got: vals.len(),
                pos,
            });
        }
        match self {
            Self::Println => {
                writeln!(rt.out, "{}", vals[0])?;
                Ok(Val::None)
            }
        }
    }
}

/// A user-defined function together with the frame it was declared in.
pub struct Func {
    pub name: Rc<str>,
    pub params: Rc<[Rc<str>]>,
    pub body: Rc<[Stmt]>,
    pub closure: ScopeLink,
}

impl Func {
    fn call(&self, args: Vec<Val>, rt: &mut Runtime) -> Result<Val, EvalError> {
        let mut frame = Scope::new_child(self.closure.clone());
        for (param, arg) in self.params.iter().zip(args) {
            frame.define(param.clone(), arg);
        }
        let frame = Scope::new_link(frame);

        for stmt in self.body.iter() {
            match stmt.exec(&frame, rt)? {
                ControlSignal::Normal => continue,
                ControlSignal::Return(val) => return Ok(val),
                ControlSignal::Break => return Err(EvalError::ControlFlow(Keyword::Break)),
                ControlSignal::Continue => return Err(EvalError::ControlFlow(Keyword::Continue)),
            }
        }

        Ok(Val::None)
    }
}

// The closure usually contains the function itself.
impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Val {
    Int(i64),
    Str(Rc<str>),
    Bool(bool),
    Func(Rc<Func>),
    Native(NativeCall),
    None,
}

impl Val {
    pub fn truthy(&self) -> bool {
        match self {
            Val::Int(x) => *x != 0,
            Val::Str(s) => !s.is_empty(),
            Val::Bool(x) => *x,
            Val::Func(_) | Val::Native(_) => true,
            Val::None => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Int(_) => "int",
            Val::Str(_) => "str",
            Val::Bool(_) => "bool",
            Val::Func(_) | Val::Native(_) => "fn",
            Val::None => "none",
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Func(a), Val::Func(b)) => Rc::ptr_eq(a, b),
            (Val::Native(a), Val::Native(b)) => a == b,
            (Val::None, Val::None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(x) => write!(f, "{}", x),
            Self::Str(x) => write!(f, "{}", x),
            Self::Bool(x) => write!(f, "{}", x),
            Self::Func(func) => write!(f, "<fn {}>", func.name),
            Self::Native(nc) => write!(f, "<native {}>", nc.name()),
            Self::None => write!(f, "none"),
        }
    }
}

pub type ExprRef = Box<Expr>;

#[derive(Debug, PartialEq, Clone)]
pub struct Expr {
    pub data: ExprKind,
    pub pos: Position,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExprKind {
    Binary(TokenType, ExprRef, ExprRef),
    Unary(TokenType, ExprRef),
    Literal(Val),
    Variable(Rc<str>),
    Call(ExprRef, Vec<ExprRef>),
}

impl Expr {
    pub fn boxed(data: ExprKind, pos: Position) -> ExprRef {
        Box::new(Expr { data, pos })
    }

    pub fn eval(&self, scope: &ScopeLink, rt: &mut Runtime) -> Result<Val, EvalError> {
        ensure_sufficient_stack(|| self.eval_node(scope, rt))
    }

    fn eval_node(&self, scope: &ScopeLink, rt: &mut Runtime) -> Result<Val, EvalError> {
        let pos = self.pos;
        match &self.data {
            ExprKind::Literal(v) => Ok(v.clone()),
            ExprKind::Binary(op, x, y) => {
                let l = x.eval(scope, rt)?;

                // Short-circuit before touching the right side.
                match op {
                    TokenType::OrOr if l.truthy() => return Ok(Val::Bool(true)),
                    TokenType::AndAnd if !l.truthy() => return Ok(Val::Bool(false)),
                    TokenType::OrOr | TokenType::AndAnd => {
                        return Ok(Val::Bool(y.eval(scope, rt)?.truthy()))
                    }
                    _ => {}
                }

                let r = y.eval(scope, rt)?;
                binary(op, l, r, pos)
            }
            ExprKind::Unary(op, x) => {
                let l = x.eval(scope, rt)?;
                match (op, l) {
                    (TokenType::Bang, a) => Ok(Val::Bool(!a.truthy())),
                    (TokenType::Minus, Val::Int(a)) => {
                        a.checked_neg().map(Val::Int).ok_or(EvalError::Overflow { pos })
                    }
                    (op, a) => Err(EvalError::TypeMismatch {
                        op: op.clone(),
                        operands: a.type_name().to_string(),
                        pos,
                    }),
                }
            }
            ExprKind::Variable(id) => (*scope)
                .borrow()
                .get(id)
                .map_err(|UnboundName(name)| EvalError::UnboundName { name, pos }),
            ExprKind::Call(fun, args) => {
                let fun = fun.eval(scope, rt)?;

                match fun {
                    Val::Func(func) => {
                        if args.len() != func.params.len() {
                            return Err(EvalError::WrongArgumentCount {
                                expected: func.params.len(),
                                got: args.len(),
                                pos,
                            });
                        }
                        let mut evaluated = Vec::with_capacity(args.len());
                        for arg in args {
                            evaluated.push(arg.eval(scope, rt)?);
                        }

                        tracing::trace!(name = %func.name, "call");
                        rt.enter_call(pos)?;
                        let res = func.call(evaluated, rt);
                        rt.leave_call();
                        res
                    }
                    Val::Native(nc) => {
                        let mut evaluated = Vec::with_capacity(args.len());
                        for arg in args {
                            evaluated.push(arg.eval(scope, rt)?);
                        }
                        nc.call(&evaluated, rt, pos)
                    }
                    other => Err(EvalError::NotCallable {
                        ty: other.type_name(),
                        pos,
                    }),
                }
            }
        }
    }
}

fn binary(op: &TokenType, l: Val, r: Val, pos: Position) -> Result<Val, EvalError> {
    let overflow = EvalError::Overflow { pos };
    match (op, l, r) {
        (TokenType::Plus, Val::Int(a), Val::Int(b)) => a.checked_add(b).map(Val::Int).ok_or(overflow),
        (TokenType::Minus, Val::Int(a), Val::Int(b)) => a.checked_sub(b).map(Val::Int).ok_or(overflow),
        (TokenType::Star, Val::Int(a), Val::Int(b)) => a.checked_mul(b).map(Val::Int).ok_or(overflow),
        (TokenType::Slash | TokenType::Percent, Val::Int(_), Val::Int(0)) => {
            Err(EvalError::DivideByZero { pos })
        }
        (TokenType::Slash, Val::Int(a), Val::Int(b)) => a.checked_div(b).map(Val::Int).ok_or(overflow),
        (TokenType::Percent, Val::Int(a), Val::Int(b)) => a.checked_rem(b).map(Val::Int).ok_or(overflow),

        (TokenType::Less, Val::Int(a), Val::Int(b)) => Ok(Val::Bool(a < b)),
        (TokenType::LessEqual, Val::Int(a), Val::Int(b)) => Ok(Val::Bool(a <= b)),
        (TokenType::GreaterEqual, Val::Int(a), Val::Int(b)) => Ok(Val::Bool(a >= b)),
        (TokenType::Greater, Val::Int(a), Val::Int(b)) => Ok(Val::Bool(a > b)),

        (TokenType::Less, Val::Str(a), Val::Str(b)) => Ok(Val::Bool(a < b)),
        (TokenType::LessEqual, Val::Str(a), Val::Str(b)) => Ok(Val::Bool(a <= b)),
        (TokenType::GreaterEqual, Val::Str(a), Val::Str(b)) => Ok(Val::Bool(a >= b)),
        (TokenType::Greater, Val::Str(a), Val::Str(b)) => Ok(Val::Bool(a > b)),

        // A string on either side of '+' stringifies the other side.
        (TokenType::Plus, Val::Str(a), b) => {
            let mut c = a.to_string();
            // Writing to string can't fail.
            let _ = write!(c, "{}", b);
            Ok(Val::Str(c.into()))
        }
        (TokenType::Plus, a, Val::Str(b)) => {
            let mut c = String::new();
            // Writing to string can't fail.
            let _ = write!(c, "{}", a);
            c.push_str(&b);
            Ok(Val::Str(c.into()))
        }

        (TokenType::EqualEqual, x, y) => Ok(Val::Bool(x == y)),
        (TokenType::BangEqual, x, y) => Ok(Val::Bool(x != y)),

        (op, l, r) => Err(EvalError::TypeMismatch {
            op: op.clone(),
            operands: format!("{} and {}", l.type_name(), r.type_name()),
            pos,
        }),
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("[{pos}] Unbound name '{name}'.")]
    UnboundName { name: Rc<str>, pos: Position },
    #[error("[{pos}] Value of type {ty} is not callable.")]
    NotCallable { ty: &'static str, pos: Position },
    #[error("[{pos}] Division by zero.")]
    DivideByZero { pos: Position },
    #[error("[{pos}] Operator '{op}' cannot be applied to {operands}.")]
    TypeMismatch {
        op: TokenType,
        operands: String,
        pos: Position,
    },
    #[error("[{pos}] Integer overflow.")]
    Overflow { pos: Position },
    #[error("[{pos}] Expected {expected} arguments, got {got}.")]
    WrongArgumentCount {
        expected: usize,
        got: usize,
        pos: Position,
    },
    #[error("[{pos}] Step limit of {limit} exceeded.")]
    StepLimitExceeded { limit: u64, pos: Position },
    #[error("[{pos}] Maximum call depth of {limit} exceeded.")]
    CallDepthExceeded { limit: usize, pos: Position },
    #[error("'{0}' is not allowed here.")]
    ControlFlow(Keyword),
    #[error("Could not write output: {0}")]
    Output(#[from] io::Error),
}

impl EvalError {
    pub fn pos(&self) -> Option<Position> {
        match self {
            Self::UnboundName { pos, .. }
            | Self::NotCallable { pos, .. }
            | Self::DivideByZero { pos }
            | Self::TypeMismatch { pos, .. }
            | Self::Overflow { pos }
            | Self::WrongArgumentCount { pos, .. }
            | Self::StepLimitExceeded { pos, .. }
            | Self::CallDepthExceeded { pos, .. } => Some(*pos),
            Self::ControlFlow(_) | Self::Output(_) => None,
        }
    }
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(op, l, r) => write!(f, "({} {} {})", l.data, op, r.data),
            Self::Unary(op, x) => write!(f, "({}{})", op, x.data),
            Self::Literal(Val::Str(s)) => write!(f, "{:?}", s),
            Self::Literal(v) => write!(f, "{}", v),
            Self::Variable(id) => write!(f, "{}", id),
            Self::Call(fun, args) => {
                write!(f, "{}(", fun.data)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.data)?;
                }
                write!(f, ")")
            }
        }
    }
}
