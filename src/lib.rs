pub mod expr;
pub mod interpreter;
pub mod keyword;
pub mod module;
pub mod parser;
pub mod repl;
pub mod scanner;
pub mod scope;
pub mod stack;
pub mod statement;
pub mod token;
