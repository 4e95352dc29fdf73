/*!
  A decimal stored-program machine and a compiler for a small line-numbered language that
  targets it.

  The machine (`machine`) executes `Image`s of four-digit words (`bytecode`). The compiler
  (`compiler`) turns source text into such images:
  ```text
  10 rem adds two numbers
  20 input a
  30 input b
  40 let c = a + b
  50 print c
  60 end
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod compiler;
mod display;
pub mod image;
pub mod machine;
pub mod memory;
pub mod symboltable;
pub mod terminal;

pub use crate::bytecode::{Instruction, Opcode, Word};
pub use crate::compiler::{compile, Compilation, CompileError, Compiler};
pub use crate::image::{Image, ImageError};
pub use crate::machine::{Fault, Machine, State, Termination};
pub use crate::memory::{Location, Memory, MemoryError};
pub use crate::symboltable::{LineNumber, Symbol, SymbolError, SymbolTable};
pub use crate::terminal::{ScriptedTerminal, StdTerminal, Terminal};
