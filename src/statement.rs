use crate::expr::{EvalError, ExprRef, Func, Val};
use crate::interpreter::Runtime;
use crate::scope::{Scope, ScopeLink};
use crate::stack::ensure_sufficient_stack;
use crate::token::Position;
use std::rc::Rc;

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expr(ExprRef),
    Assign(Rc<str>, ExprRef),
    Block(Vec<Stmt>),
    If(ExprRef, Box<Stmt>),
    /// `for cond { .. }` or, without a condition, `for { .. }`.
    For(Option<ExprRef>, Box<Stmt>, Position),
    Break,
    Continue,
    Return(Option<ExprRef>),
    Fun(Rc<str>, Rc<[Rc<str>]>, Rc<[Stmt]>),
}

/// How a statement finished.
///
/// Anything other than `Normal` travels up through enclosing blocks until a
/// loop consumes `Break`/`Continue` or a call consumes `Return`.
#[derive(Debug, PartialEq, Clone)]
pub enum ControlSignal {
    Normal,
    Break,
    Continue,
    Return(Val),
}

impl Stmt {
    pub fn exec(&self, scope: &ScopeLink, rt: &mut Runtime) -> Result<ControlSignal, EvalError> {
        ensure_sufficient_stack(|| self.exec_node(scope, rt))
    }

    fn exec_node(&self, scope: &ScopeLink, rt: &mut Runtime) -> Result<ControlSignal, EvalError> {
        match self {
            Self::Expr(expr) => {
                expr.eval(scope, rt)?;
            }
            Self::Assign(id, expr) => {
                let val = expr.eval(scope, rt)?;
                let mut frame = (*scope).borrow_mut();
                // Rebinding writes through to the enclosing frame that owns
                // the name; a fresh name lands in the current frame.
                if frame.assign(id, val.clone()).is_err() {
                    frame.define(id.clone(), val);
                }
            }
            Self::Block(stmts) => {
                let child = Scope::new_link(Scope::new_child(scope.clone()));
                for stmt in stmts.iter() {
                    match stmt.exec(&child, rt)? {
                        ControlSignal::Normal => {}
                        signal => return Ok(signal),
                    }
                }
            }
            Self::If(cond, body) => {
                if cond.eval(scope, rt)?.truthy() {
                    return body.exec(scope, rt);
                }
            }
            Self::For(cond, body, pos) => loop {
                if let Some(cond) = cond {
                    if !cond.eval(scope, rt)?.truthy() {
                        break;
                    }
                }
                rt.step(*pos)?;
                match body.exec(scope, rt)? {
                    ControlSignal::Break => {
                        tracing::trace!(%pos, "loop break");
                        break;
                    }
                    ControlSignal::Normal | ControlSignal::Continue => {}
                    ret @ ControlSignal::Return(_) => return Ok(ret),
                }
            },
            Self::Break => return Ok(ControlSignal::Break),
            Self::Continue => return Ok(ControlSignal::Continue),
            Self::Return(Some(expr)) => {
                return Ok(ControlSignal::Return(expr.eval(scope, rt)?));
            }
            Self::Return(None) => {
                return Ok(ControlSignal::Return(Val::None));
            }
            Self::Fun(id, params, body) => (*scope).borrow_mut().define(
                id.clone(),
                Val::Func(Rc::new(Func {
                    name: id.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: scope.clone(),
                })),
            ),
        }
        Ok(ControlSignal::Normal)
    }
}
