use crate::expr::*;
use crate::keyword::Keyword;
use crate::stack::ensure_sufficient_stack;
use crate::statement::Stmt;
use crate::token::*;

use std::{fmt, fmt::Display, mem, rc::Rc};

type ExprResult = Result<ExprRef, ParseErr>;

/// Deepest nesting of blocks, parenthesised or argument expressions and
/// prefix operators that a program may use.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrType {
    UnexpectedToken,
    ExpectedToken(&'static str),
    LoopControlOutsideLoop(Keyword),
    ReturnOutsideFunction,
    NestingTooDeep,
}

/// First parse failure. `token` is the offending token, `None` at end of input.
#[derive(Debug, Clone)]
pub struct ParseErr {
    pub data: ParseErrType,
    pub token: Option<Token>,
}

impl ParseErr {
    fn new(data: ParseErrType, token: Option<Token>) -> Self {
        ParseErr { data, token }
    }

    pub fn pos(&self) -> Option<Position> {
        self.token.as_ref().map(|t| t.pos)
    }
}

impl Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tok) = &self.token {
            write!(f, "[{}] ", tok.pos)?;
        }
        match (&self.data, &self.token) {
            (ParseErrType::UnexpectedToken, Some(tok)) => {
                write!(f, "Unexpected token '{}'.", tok.lexeme)
            }
            (ParseErrType::UnexpectedToken, None) => write!(f, "Unexpected end of input."),
            (ParseErrType::ExpectedToken(what), Some(tok)) => {
                write!(f, "Expected {} but got '{}'.", what, tok.lexeme)
            }
            (ParseErrType::ExpectedToken(what), None) => {
                write!(f, "Expected {} but got end of input.", what)
            }
            // Name the keyword the way the user spelled it.
            (ParseErrType::LoopControlOutsideLoop(_), Some(tok)) => {
                write!(f, "'{}' outside of a loop.", tok.lexeme)
            }
            (ParseErrType::LoopControlOutsideLoop(kw), None) => {
                write!(f, "'{}' outside of a loop.", kw)
            }
            (ParseErrType::ReturnOutsideFunction, Some(tok)) => {
                write!(f, "'{}' outside of a function.", tok.lexeme)
            }
            (ParseErrType::ReturnOutsideFunction, None) => {
                write!(f, "'return' outside of a function.")
            }
            (ParseErrType::NestingTooDeep, _) => {
                write!(f, "Nesting deeper than {} levels.", MAX_NESTING)
            }
        }
    }
}

impl std::error::Error for ParseErr {}

pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
    loop_depth: usize,
    in_function: bool,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn has_next(&self) -> bool {
        self.index < self.tokens.len()
    }

    fn match_next_lits<const N: usize>(&mut self, ttypes: [TokenType; N]) -> bool {
        if self.index >= self.tokens.len() {
            return false;
        }

        let res = ttypes.iter().any(|x| *x == self.tokens[self.index].data);
        if res {
            self.index += 1;
        }

        res
    }

    fn match_keyword(&mut self, kw: Keyword) -> bool {
        self.match_next_lits([TokenType::Keyword(kw)])
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<&Token> {
        self.index += 1;
        self.tokens.get(self.index - 1)
    }

    fn check(&self, tok: &TokenType) -> bool {
        self.tokens.get(self.index).map(|x| &x.data) == Some(tok)
    }

    // Call parentheses and binary '+'/'-' must sit on the line of what
    // precedes them, otherwise `f\n(x)` or `x = 5\n-1` would swallow the
    // next statement.
    fn check_same_line(&self, tok: &TokenType) -> bool {
        self.index > 0
            && self
                .peek()
                .is_some_and(|t| t.data == *tok && t.pos.line == self.previous().pos.line)
    }

    fn consume(&mut self, tok: &TokenType, what: &'static str) -> Result<&Token, ParseErr> {
        if !self.check(tok) {
            return Err(ParseErr::new(
                ParseErrType::ExpectedToken(what),
                self.peek().cloned(),
            ));
        }
        self.index += 1;

        Ok(self.previous())
    }

    fn consume_identifier(&mut self) -> Result<Rc<str>, ParseErr> {
        if let Some(TokenType::Identifier(id)) = self.peek().map(|x| &x.data) {
            let ret = id.clone();
            self.index += 1;
            Ok(ret)
        } else {
            Err(ParseErr::new(
                ParseErrType::ExpectedToken("identifier"),
                self.peek().cloned(),
            ))
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseErr>,
    ) -> Result<T, ParseErr> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseErr::new(
                ParseErrType::NestingTooDeep,
                self.peek().cloned(),
            ));
        }
        self.nesting += 1;
        let res = ensure_sufficient_stack(|| f(self));
        self.nesting -= 1;
        res
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens,
            index: 0,
            loop_depth: 0,
            in_function: false,
            nesting: 0,
        }
    }

    // Parsing the actual grammar.
    pub fn parse(&mut self) -> Result<Vec<Stmt>, ParseErr> {
        let mut res = vec![];
        loop {
            while self.match_next_lits([TokenType::Semicolon]) {}
            if !self.has_next() {
                return Ok(res);
            }
            res.push(self.statement()?);
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseErr> {
        if self.match_keyword(Keyword::If) {
            self.if_statement()
        } else if self.match_keyword(Keyword::For) {
            self.for_statement()
        } else if self.match_keyword(Keyword::Break) {
            self.loop_control(Keyword::Break, Stmt::Break)
        } else if self.match_keyword(Keyword::Continue) {
            self.loop_control(Keyword::Continue, Stmt::Continue)
        } else if self.match_keyword(Keyword::Fn) {
            self.function()
        } else if self.match_keyword(Keyword::Return) {
            self.return_statement()
        } else if self.match_next_lits([TokenType::LeftBrace]) {
            Ok(Stmt::Block(self.block()?))
        } else if self.at_assignment() {
            self.assignment()
        } else {
            Ok(Stmt::Expr(self.expression()?))
        }
    }

    fn at_assignment(&self) -> bool {
        matches!(self.peek().map(|t| &t.data), Some(TokenType::Identifier(_)))
            && self
                .tokens
                .get(self.index + 1)
                .is_some_and(|t| t.data == TokenType::Equal)
    }

    fn assignment(&mut self) -> Result<Stmt, ParseErr> {
        let id = self.consume_identifier()?;
        self.consume(&TokenType::Equal, "'='")?;
        Ok(Stmt::Assign(id, self.expression()?))
    }

    fn loop_control(&mut self, kw: Keyword, stmt: Stmt) -> Result<Stmt, ParseErr> {
        if self.loop_depth == 0 {
            return Err(ParseErr::new(
                ParseErrType::LoopControlOutsideLoop(kw),
                Some(self.previous().clone()),
            ));
        }
        Ok(stmt)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseErr> {
        let cond = self.expression()?;
        let body = self.body()?;
        Ok(Stmt::If(cond, Box::new(body)))
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseErr> {
        let pos = self.previous().pos;
        let cond = if self.check(&TokenType::LeftBrace) {
            None
        } else {
            Some(self.expression()?)
        };

        self.loop_depth += 1;
        let body = self.body();
        self.loop_depth -= 1;

        Ok(Stmt::For(cond, Box::new(body?), pos))
    }

    fn function(&mut self) -> Result<Stmt, ParseErr> {
        let id = self.consume_identifier()?;
        self.consume(&TokenType::LeftParen, "'(' after function name")?;
        let mut params = vec![];
        if !self.check(&TokenType::RightParen) {
            params.push(self.consume_identifier()?);
            while self.match_next_lits([TokenType::Comma]) {
                params.push(self.consume_identifier()?);
            }
        }
        self.consume(&TokenType::RightParen, "')' after parameters")?;

        // Loops around the declaration do not extend into the body.
        let outer_loops = mem::replace(&mut self.loop_depth, 0);
        let outer_function = mem::replace(&mut self.in_function, true);
        let body = self.function_body();
        self.loop_depth = outer_loops;
        self.in_function = outer_function;

        Ok(Stmt::Fun(id, params.into(), body?.into()))
    }

    fn function_body(&mut self) -> Result<Vec<Stmt>, ParseErr> {
        self.consume(&TokenType::LeftBrace, "'{' before function body")?;
        self.block()
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseErr> {
        let keyword = self.previous().clone();
        if !self.in_function {
            return Err(ParseErr::new(
                ParseErrType::ReturnOutsideFunction,
                Some(keyword),
            ));
        }

        let has_value = self.peek().is_some_and(|t| {
            t.pos.line == keyword.pos.line
                && !matches!(t.data, TokenType::RightBrace | TokenType::Semicolon)
        });
        let val = if has_value {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Stmt::Return(val))
    }

    fn body(&mut self) -> Result<Stmt, ParseErr> {
        self.consume(&TokenType::LeftBrace, "'{'")?;
        Ok(Stmt::Block(self.block()?))
    }

    // Expects the opening brace to be consumed already.
    fn block(&mut self) -> Result<Vec<Stmt>, ParseErr> {
        self.nested(Self::block_contents)
    }

    fn block_contents(&mut self) -> Result<Vec<Stmt>, ParseErr> {
        let mut res = vec![];
        loop {
            while self.match_next_lits([TokenType::Semicolon]) {}
            if !self.has_next() || self.check(&TokenType::RightBrace) {
                break;
            }
            res.push(self.statement()?);
        }
        self.consume(&TokenType::RightBrace, "'}' to close block")?;
        Ok(res)
    }

    fn expression(&mut self) -> ExprResult {
        self.nested(Self::logic_or)
    }

    fn binary(op: &Token, left: ExprRef, right: ExprRef) -> ExprRef {
        Expr::boxed(ExprKind::Binary(op.data.clone(), left, right), op.pos)
    }

    fn logic_or(&mut self) -> ExprResult {
        let mut expr = self.logic_and()?;

        while self.match_next_lits([TokenType::OrOr]) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn logic_and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;

        while self.match_next_lits([TokenType::AndAnd]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;

        while self.match_next_lits([TokenType::BangEqual, TokenType::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while self.match_next_lits([
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;

        // A '-' opening a new line starts a new statement.
        while self.check_same_line(&TokenType::Plus) || self.check_same_line(&TokenType::Minus) {
            self.index += 1;
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;

        while self.match_next_lits([TokenType::Slash, TokenType::Star, TokenType::Percent]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Self::binary(&op, expr, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_next_lits([TokenType::Bang, TokenType::Minus]) {
            let op = self.previous().clone();
            let operand = self.nested(Self::unary)?;
            Ok(Expr::boxed(ExprKind::Unary(op.data, operand), op.pos))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        while self.check_same_line(&TokenType::LeftParen) {
            self.index += 1;
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: ExprRef) -> ExprResult {
        let pos = callee.pos;
        let mut args = vec![];
        if !self.check(&TokenType::RightParen) {
            args.push(self.expression()?);
            while self.match_next_lits([TokenType::Comma]) {
                args.push(self.expression()?);
            }
        }

        self.consume(&TokenType::RightParen, "')' after arguments")?;

        Ok(Expr::boxed(ExprKind::Call(callee, args), pos))
    }

    fn primary(&mut self) -> ExprResult {
        let tok = self
            .advance()
            .cloned()
            .ok_or(ParseErr::new(ParseErrType::UnexpectedToken, None))?;
        let res = match &tok.data {
            TokenType::Keyword(Keyword::True) => ExprKind::Literal(Val::Bool(true)),
            TokenType::Keyword(Keyword::False) => ExprKind::Literal(Val::Bool(false)),
            TokenType::Keyword(Keyword::None) => ExprKind::Literal(Val::None),
            TokenType::Keyword(Keyword::Println) => {
                ExprKind::Literal(Val::Native(NativeCall::Println))
            }
            TokenType::Integer(x) => ExprKind::Literal(Val::Int(*x)),
            TokenType::String(x) => ExprKind::Literal(Val::Str(x.clone())),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume(&TokenType::RightParen, "')'")?;
                return Ok(expr);
            }
            TokenType::Identifier(x) => ExprKind::Variable(x.clone()),
            _ => return Err(ParseErr::new(ParseErrType::UnexpectedToken, Some(tok))),
        };

        Ok(Expr::boxed(res, tok.pos))
    }
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, ParseErr> {
    Parser::new(tokens).parse()
}
