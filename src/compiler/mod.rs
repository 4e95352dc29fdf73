/*!
  The compiler for the machine's line-numbered source language. See `compile.rs` for the
  pipeline.
*/

mod compile;
mod error;
mod expression;
mod optimize;
mod parser;

pub use compile::{compile, BranchTarget, Compilation, Compiler, Patch, MAX_PROGRAM_SIZE};
pub use error::{CompileError, ExpressionError};
pub use expression::{evaluate, postfix_string, to_postfix, tokenize, Operator, Token};
pub use optimize::{optimize, optimize_preserving};
pub use parser::{parse, parse_line, Command, Comparator, Operand, Rhs, SourceLine, Statement};
