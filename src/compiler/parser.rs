/*!
  This module parses source lines into `Statement`s.

  Every non-blank line has the form `<line number> <keyword> <arguments>`:
  ```text
  <statement>   ::=  'rem' <text>
                  |  'input' <variable>
                  |  'print' <variable>
                  |  'let' <operand> '=' <expression>
                  |  'goto' <line number>
                  |  'if' <operand> <comparator> <operand> 'goto' <line number>
                  |  'for' <variable> '=' <operand> 'to' <operand>
                  |  'next' <variable>?
                  |  'pause'
                  |  'end'
  <operand>     ::=  <variable> | <integer>
  <variable>    ::=  [a-z]
  <comparator>  ::=  '==' | '!=' | '<' | '>' | '<=' | '>='
  ```
  Keywords are case insensitive. Expressions are handled by `expression.rs`.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::bytecode::{in_word_range, Word};
use crate::symboltable::{LineNumber, Symbol};
use super::error::CompileError;
use super::expression::{tokenize, Token};

#[derive(StrumDisplay, EnumString, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
  #[strum(serialize = "rem")]
  Rem,
  #[strum(serialize = "input")]
  Input,
  #[strum(serialize = "let")]
  Let,
  #[strum(serialize = "print")]
  Print,
  #[strum(serialize = "goto")]
  Goto,
  #[strum(serialize = "if")]
  If,
  #[strum(serialize = "for")]
  For,
  #[strum(serialize = "next")]
  Next,
  #[strum(serialize = "pause")]
  Pause,
  #[strum(serialize = "end")]
  End,
}

#[derive(StrumDisplay, EnumString, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Comparator {
  #[strum(serialize = "==")]
  Equal,
  #[strum(serialize = "!=")]
  NotEqual,
  #[strum(serialize = "<")]
  Less,
  #[strum(serialize = ">")]
  Greater,
  #[strum(serialize = "<=")]
  LessOrEqual,
  #[strum(serialize = ">=")]
  GreaterOrEqual,
}

impl Comparator {
  pub fn holds(&self, left: Word, right: Word) -> bool {
    match self {
      Comparator::Equal          => left == right,
      Comparator::NotEqual       => left != right,
      Comparator::Less           => left < right,
      Comparator::Greater        => left > right,
      Comparator::LessOrEqual    => left <= right,
      Comparator::GreaterOrEqual => left >= right,
    }
  }
}

/// A variable or an integer literal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
  Variable(char),
  Constant(Word),
}

impl Operand {
  pub fn parse(text: &str) -> Option<Operand> {
    if let Some(name) = variable_name(text) {
      return Some(Operand::Variable(name));
    }
    match text.parse::<i64>() {
      Ok(value) if in_word_range(value) => Some(Operand::Constant(value as Word)),
      _                                 => None
    }
  }

  pub fn symbol(&self) -> Symbol {
    match self {
      Operand::Variable(name)  => Symbol::Variable(*name),
      Operand::Constant(value) => Symbol::Constant(*value),
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Variable(name)  => write!(f, "{}", name),
      Operand::Constant(value) => write!(f, "{}", value),
    }
  }
}

/// The right hand side of an assignment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rhs {
  Operand(Operand),
  /// Infix tokens.
  Expression(Vec<Token>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
  Rem(String),
  Input(char),
  Print(char),
  /// The target is parsed as an operand so that assignments to literals can be reported.
  Let { target: Operand, rhs: Rhs },
  Goto(LineNumber),
  If { left: Operand, comparator: Comparator, right: Operand, target: LineNumber },
  For { variable: char, start: Operand, bound: Operand },
  Next(Option<char>),
  Pause,
  End,
}

impl Statement {
  pub fn command(&self) -> Command {
    match self {
      Statement::Rem(_)       => Command::Rem,
      Statement::Input(_)     => Command::Input,
      Statement::Print(_)     => Command::Print,
      Statement::Let { .. }   => Command::Let,
      Statement::Goto(_)      => Command::Goto,
      Statement::If { .. }    => Command::If,
      Statement::For { .. }   => Command::For,
      Statement::Next(_)      => Command::Next,
      Statement::Pause        => Command::Pause,
      Statement::End          => Command::End,
    }
  }
}

/// A parsed source line. `row` counts physical lines of the source text from one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
  pub row       : usize,
  pub number    : LineNumber,
  pub statement : Statement,
}

/// Parses every non-blank line of `source`.
pub fn parse(source: &str) -> Result<Vec<SourceLine>, CompileError> {
  let mut lines = Vec::new();
  for (index, text) in source.lines().enumerate() {
    if let Some(line) = parse_line(index + 1, text)? {
      lines.push(line);
    }
  }
  Ok(lines)
}

/// Parses one line of source. Blank lines are `Ok(None)`.
pub fn parse_line(row: usize, text: &str) -> Result<Option<SourceLine>, CompileError> {
  let text = text.trim();
  if text.is_empty() {
    return Ok(None);
  }

  let (number_text, rest) = split_word(text);
  let number = number_text.parse::<LineNumber>()
      .map_err(|_| CompileError::MalformedLine { row, text: text.to_string() })?;

  let (keyword, arguments) = split_word(rest);
  if keyword.is_empty() {
    return Err(CompileError::syntax(number, "missing keyword"));
  }
  let command = Command::from_str(&keyword.to_lowercase())
      .map_err(|_| CompileError::syntax(number, format!("unknown keyword `{}`", keyword)))?;

  let statement = parse_statement(number, command, arguments)?;
  Ok(Some(SourceLine { row, number, statement }))
}

fn parse_statement(line: LineNumber, command: Command, arguments: &str) -> Result<Statement, CompileError> {
  let words: Vec<&str> = arguments.split_whitespace().collect();

  match command {

    Command::Rem   => Ok(Statement::Rem(arguments.to_string())),

    Command::Input => Ok(Statement::Input(single_variable(line, command, &words)?)),

    Command::Print => Ok(Statement::Print(single_variable(line, command, &words)?)),

    Command::Let   => {
      let (target, expression) = arguments.split_once('=')
          .ok_or_else(|| CompileError::syntax(line, "expected `let <variable> = <expression>`"))?;
      let target = expect_operand(line, target.trim())?;
      let expression = expression.trim();

      let rhs = match Operand::parse(expression) {
        Some(operand) => Rhs::Operand(operand),
        None          => {
          let tokens = tokenize(expression)
              .map_err(|error| CompileError::syntax(line, error.to_string()))?;
          if tokens.is_empty() {
            return Err(CompileError::syntax(line, "missing expression"));
          }
          Rhs::Expression(tokens)
        }
      };
      Ok(Statement::Let { target, rhs })
    }

    Command::Goto  => {
      match words.as_slice() {
        [target] => Ok(Statement::Goto(line_number(line, target)?)),
        _        => Err(CompileError::syntax(line, "expected `goto <line number>`"))
      }
    }

    Command::If    => {
      match words.as_slice() {

        [left, comparator, right, goto, target] if goto.eq_ignore_ascii_case("goto") => {
          Ok(Statement::If {
            left       : expect_operand(line, left)?,
            comparator : Comparator::from_str(comparator).map_err(|_| {
                           CompileError::syntax(line, format!("unknown comparison `{}`", comparator))
                         })?,
            right      : expect_operand(line, right)?,
            target     : line_number(line, target)?,
          })
        }

        _ => Err(CompileError::syntax(line, "expected `if <operand> <comparison> <operand> goto <line number>`"))

      }
    }

    Command::For   => {
      let malformed = || CompileError::syntax(line, "expected `for <variable> = <operand> to <operand>`");
      let (target, range) = arguments.split_once('=').ok_or_else(malformed)?;
      let variable = expect_variable(line, target.trim())?;
      let range: Vec<&str> = range.split_whitespace().collect();
      match range.as_slice() {

        [start, to, bound] if to.eq_ignore_ascii_case("to") => {
          Ok(Statement::For {
            variable,
            start : expect_operand(line, start)?,
            bound : expect_operand(line, bound)?,
          })
        }

        _ => Err(malformed())

      }
    }

    Command::Next  => {
      match words.as_slice() {
        []         => Ok(Statement::Next(None)),
        [variable] => Ok(Statement::Next(Some(expect_variable(line, variable)?))),
        _          => Err(CompileError::syntax(line, "expected `next [<variable>]`"))
      }
    }

    Command::Pause => no_arguments(line, command, &words, Statement::Pause),

    Command::End   => no_arguments(line, command, &words, Statement::End),

  } // end match command
}

// region Helpers

/// Splits off the first whitespace-delimited word.
fn split_word(text: &str) -> (&str, &str) {
  let text = text.trim_start();
  match text.find(char::is_whitespace) {
    Some(end) => (&text[..end], text[end..].trim()),
    None      => (text, "")
  }
}

fn variable_name(text: &str) -> Option<char> {
  let mut chars = text.chars();
  match (chars.next(), chars.next()) {
    (Some(name), None) if name.is_ascii_lowercase() => Some(name),
    _                                               => None
  }
}

fn expect_variable(line: LineNumber, text: &str) -> Result<char, CompileError> {
  variable_name(text)
      .ok_or_else(|| CompileError::syntax(line, format!("`{}` is not a variable name", text)))
}

fn expect_operand(line: LineNumber, text: &str) -> Result<Operand, CompileError> {
  Operand::parse(text)
      .ok_or_else(|| CompileError::syntax(line, format!("`{}` is neither a variable nor a word", text)))
}

fn single_variable(line: LineNumber, command: Command, words: &[&str]) -> Result<char, CompileError> {
  match words {
    [variable] => expect_variable(line, variable),
    _          => Err(CompileError::syntax(line, format!("expected `{} <variable>`", command)))
  }
}

fn line_number(line: LineNumber, text: &str) -> Result<LineNumber, CompileError> {
  text.parse::<LineNumber>()
      .map_err(|_| CompileError::syntax(line, format!("`{}` is not a line number", text)))
}

fn no_arguments(line: LineNumber, command: Command, words: &[&str], statement: Statement)
  -> Result<Statement, CompileError>
{
  match words.is_empty() {
    true  => Ok(statement),
    false => Err(CompileError::syntax(line, format!("`{}` takes no arguments", command)))
  }
}

// endregion
