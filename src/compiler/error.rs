use thiserror::Error;

use crate::memory::Location;
use crate::symboltable::LineNumber;

/// Everything that can stop a compilation. Compilation stops at the first error.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum CompileError {
  /// The line does not begin with a line number. `row` counts source lines from one.
  #[error("row {row}: `{text}` does not start with a line number")]
  MalformedLine { row: usize, text: String },

  #[error("line {line}: {message}")]
  Syntax { line: LineNumber, message: String },

  #[error("line {line}: {message}")]
  UndefinedReference { line: LineNumber, message: String },

  #[error("line {line}: location {location:02} holds a constant and cannot be assigned")]
  ConstantOverwrite { line: LineNumber, location: Location },

  #[error("line {line}: `next` without a matching `for`")]
  NextWithoutFor { line: LineNumber },

  #[error("line {line}: program does not fit in {size} words of memory")]
  Capacity { line: LineNumber, size: usize },
}

impl CompileError {
  pub(crate) fn syntax<S: Into<String>>(line: LineNumber, message: S) -> CompileError {
    CompileError::Syntax { line, message: message.into() }
  }

  pub(crate) fn undefined<S: Into<String>>(line: LineNumber, message: S) -> CompileError {
    CompileError::UndefinedReference { line, message: message.into() }
  }
}

/// Problems with an arithmetic expression.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ExpressionError {
  #[error("unexpected `{found}` in expression")]
  UnexpectedCharacter { found: String },
  #[error("number {0} does not fit in a word")]
  NumberOutOfRange(String),
  #[error("unbalanced parentheses")]
  UnbalancedParentheses,
  #[error("operator `{0}` is missing an operand")]
  MissingOperand(char),
  #[error("expression leaves {0} values instead of one")]
  LeftoverOperands(usize),
  #[error("variable `{0}` has no value")]
  UnknownVariable(char),
  #[error("division by zero")]
  DivisionByZero,
  #[error("result does not fit in a word")]
  Overflow,
  #[error("empty expression")]
  Empty,
}
