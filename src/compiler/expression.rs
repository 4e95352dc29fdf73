/*!
  Arithmetic expressions of the source language.

  An expression is made of non-negative integer literals, single lowercase letter variables,
  parentheses and the binary operators `^ * / + -`. Expressions are lexed into `Token`s and
  converted to postfix order with the shunting-yard algorithm; code generation then walks the
  postfix sequence (see `compile.rs`). `evaluate` computes the value of a postfix sequence
  directly, which is how the precedence rules are checked.

  | Operator | Precedence | Associativity |
  |----------|-----------:|---------------|
  | `^`      | 30         | left          |
  | `* /`    | 20         | left          |
  | `+ -`    | 10         | left          |
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use nom::{
  branch::alt,
  character::complete::{
    char as one_char,
    digit1,
    multispace0,
    one_of
  },
  combinator::{map, map_opt, value},
  sequence::preceded,
  IResult
};

use crate::bytecode::{in_word_range, Opcode, Word};
use super::error::ExpressionError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
  Power,
  Multiply,
  Divide,
  Add,
  Subtract,
}

impl Operator {
  pub fn from_symbol(symbol: char) -> Option<Operator> {
    match symbol {
      '^' => Some(Operator::Power),
      '*' => Some(Operator::Multiply),
      '/' => Some(Operator::Divide),
      '+' => Some(Operator::Add),
      '-' => Some(Operator::Subtract),
      _   => None
    }
  }

  pub fn symbol(&self) -> char {
    match self {
      Operator::Power    => '^',
      Operator::Multiply => '*',
      Operator::Divide   => '/',
      Operator::Add      => '+',
      Operator::Subtract => '-',
    }
  }

  pub fn precedence(&self) -> u8 {
    match self {
      Operator::Power                        => 30,
      Operator::Multiply | Operator::Divide  => 20,
      Operator::Add      | Operator::Subtract => 10,
    }
  }

  /// The machine instruction computing `accumulator <op> memory`. The machine cannot raise to a power.
  pub fn opcode(&self) -> Option<Opcode> {
    match self {
      Operator::Power    => None,
      Operator::Multiply => Some(Opcode::Multiply),
      Operator::Divide   => Some(Opcode::Divide),
      Operator::Add      => Some(Opcode::Add),
      Operator::Subtract => Some(Opcode::Subtract),
    }
  }

  fn apply(&self, left: i64, right: i64) -> Result<i64, ExpressionError> {
    match self {
      Operator::Power    => {
        // Negative exponents have no integer result.
        let exponent = u32::try_from(right).map_err(|_| ExpressionError::Overflow)?;
        left.checked_pow(exponent).ok_or(ExpressionError::Overflow)
      }
      Operator::Multiply => Ok(left * right),
      Operator::Divide   => {
        match right {
          0 => Err(ExpressionError::DivisionByZero),
          _ => Ok(left / right)
        }
      }
      Operator::Add      => Ok(left + right),
      Operator::Subtract => Ok(left - right),
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Token {
  Number(Word),
  Variable(char),
  Operator(Operator),
  LeftParen,
  RightParen,
}

impl Token {
  pub fn is_operand(&self) -> bool {
    matches!(self, Token::Number(_) | Token::Variable(_))
  }
}

impl Display for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Token::Number(value)     => write!(f, "{}", value),
      Token::Variable(name)    => write!(f, "{}", name),
      Token::Operator(op)      => write!(f, "{}", op.symbol()),
      Token::LeftParen         => write!(f, "("),
      Token::RightParen        => write!(f, ")"),
    }
  }
}

// region Lexer

#[derive(Clone, Debug)]
enum Lexeme<'a> {
  Digits(&'a str),
  Token(Token),
}

fn lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
  preceded(
    multispace0,
    alt((
      map(digit1, Lexeme::Digits),
      map(one_of("abcdefghijklmnopqrstuvwxyz"), |name| Lexeme::Token(Token::Variable(name))),
      map_opt(one_of("^*/+-"), |symbol| {
        Operator::from_symbol(symbol).map(|op| Lexeme::Token(Token::Operator(op)))
      }),
      value(Lexeme::Token(Token::LeftParen), one_char('(')),
      value(Lexeme::Token(Token::RightParen), one_char(')')),
    ))
  )(input)
}

/// Splits infix text into tokens. Whitespace between tokens is ignored.
pub fn tokenize(infix: &str) -> Result<Vec<Token>, ExpressionError> {
  let mut input  = infix.trim();
  let mut tokens = Vec::new();

  while !input.is_empty() {
    let (rest, lexeme) = match lexeme(input) {
      Ok(parsed) => parsed,
      Err(_)     => {
        let found = input.trim_start().chars().next().map(String::from).unwrap_or_default();
        return Err(ExpressionError::UnexpectedCharacter { found });
      }
    };

    let token = match lexeme {

      Lexeme::Digits(digits) => {
        match digits.parse::<i64>() {
          Ok(number) if in_word_range(number) => Token::Number(number as Word),
          _                                   => return Err(ExpressionError::NumberOutOfRange(digits.to_string()))
        }
      }

      Lexeme::Token(token) => token

    };

    // Names are a single letter, so `ab` is an error rather than two variables.
    if let (Some(Token::Variable(previous)), Token::Variable(name)) = (tokens.last(), token) {
      if input.starts_with(name) {
        return Err(ExpressionError::UnexpectedCharacter { found: format!("{}{}", previous, name) });
      }
    }

    tokens.push(token);
    input = rest;
  }

  Ok(tokens)
}

// endregion

/// Reorders infix tokens into postfix order with the shunting-yard algorithm.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Token>, ExpressionError> {
  let mut output : Vec<Token> = Vec::with_capacity(tokens.len());
  let mut stack  : Vec<Token> = Vec::new();

  for token in tokens {
    match token {

      Token::Number(_) | Token::Variable(_) => output.push(*token),

      Token::LeftParen => stack.push(*token),

      Token::Operator(incoming) => {
        while let Some(Token::Operator(top)) = stack.last().copied() {
          if top.precedence() < incoming.precedence() {
            break;
          }
          output.push(Token::Operator(top));
          stack.pop();
        }
        stack.push(*token);
      }

      Token::RightParen => {
        loop {
          match stack.pop() {
            Some(Token::LeftParen) => break,
            Some(operator)         => output.push(operator),
            None                   => return Err(ExpressionError::UnbalancedParentheses)
          }
        }
      }

    } // end match token
  }

  while let Some(token) = stack.pop() {
    if token == Token::LeftParen {
      return Err(ExpressionError::UnbalancedParentheses);
    }
    output.push(token);
  }

  Ok(output)
}

/// `2 3 4 * +`
pub fn postfix_string(tokens: &[Token]) -> String {
  tokens.iter()
        .map(|token| token.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

/// Computes the value of a postfix sequence, looking variables up with `lookup`.
pub fn evaluate<F>(postfix: &[Token], lookup: F) -> Result<Word, ExpressionError>
  where F: Fn(char) -> Option<Word>
{
  let mut stack: Vec<i64> = Vec::new();

  for token in postfix {
    match token {

      Token::Number(value)  => stack.push(*value as i64),

      Token::Variable(name) => {
        let value = lookup(*name).ok_or(ExpressionError::UnknownVariable(*name))?;
        stack.push(value as i64);
      }

      Token::Operator(op)   => {
        let right = stack.pop().ok_or(ExpressionError::MissingOperand(op.symbol()))?;
        let left  = stack.pop().ok_or(ExpressionError::MissingOperand(op.symbol()))?;
        let result = op.apply(left, right)?;
        if !in_word_range(result) {
          return Err(ExpressionError::Overflow);
        }
        stack.push(result);
      }

      Token::LeftParen | Token::RightParen => return Err(ExpressionError::UnbalancedParentheses)

    }
  }

  match stack.len() {
    0 => Err(ExpressionError::Empty),
    1 => Ok(stack[0] as Word),
    n => Err(ExpressionError::LeftoverOperands(n))
  }
}
