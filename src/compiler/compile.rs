/*!
  Translates source programs into machine images.

  The compilation pipeline is this:
  ```text
  text -> [`parser::parse`] -> `SourceLine`s -> [pass 1] -> `Image` + `Patch`es ->⋯

  ⋯-> [pass 2] -> `Image` -> [`optimize`] -> `Image`
  ```
  Pass 1 emits code for each statement in order, starting at location zero. Variables and
  constants are allocated from the top of memory downward as they are first seen, and
  constants are written into the image at their location. A branch to a line that has not
  been compiled yet is emitted with a placeholder operand and recorded as a `Patch`. Pass 2
  fills in every patch.

  Expressions are compiled from postfix order. Intermediate results go to temporaries taken
  from just below the lowest allocated symbol, so a temporary is only live for the duration
  of the statement that creates it.
*/

use std::collections::HashSet;

use tracing::debug;

use crate::bytecode::{decode, encode, Instruction, Opcode, Word};
use crate::image::Image;
use crate::memory::Location;
use crate::symboltable::{LineNumber, Symbol, SymbolError, SymbolTable};
use super::error::CompileError;
use super::expression::{to_postfix, Operator, Token};
use super::optimize::optimize_preserving;
use super::parser::{parse, Comparator, Operand, Rhs, SourceLine, Statement};

/// Two-digit operands can address no more than this many words.
pub const MAX_PROGRAM_SIZE: usize = 100;

/// Step of every `for` loop.
const LOOP_INCREMENT: Word = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchTarget {
  Line(LineNumber),
  Location(Location),
}

/// A branch whose operand is filled in by pass 2.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Patch {
  pub location    : Location,   // Location of the branch instruction
  pub target_line : LineNumber,
  pub source_line : LineNumber, // Line the branch was compiled from
}

#[derive(Clone, Copy, Debug)]
struct LoopContext {
  start     : Location, // First instruction of the loop body
  variable  : Location,
  bound     : Location,
  increment : Word,
  line      : LineNumber,
}

/// An operand of postfix code generation.
#[derive(Clone, Copy, Debug)]
enum StackEntry {
  Resolved(Location),
  Temporary(Location),
}

impl StackEntry {
  fn location(&self) -> Location {
    match self {
      StackEntry::Resolved(location) | StackEntry::Temporary(location) => *location
    }
  }
}

/// A `Compilation` is the result of compiling a program: its image and its symbol table.
#[derive(Clone, Debug)]
pub struct Compilation {
  pub image   : Image,
  pub symbols : SymbolTable,
}

impl Compilation {
  /**
    Runs the peephole optimizer over the image. Stores to variables and constants are kept, so
    only expression temporaries are eliminated. Returns the number of instruction pairs removed.
  */
  pub fn optimize(&mut self) -> usize {
    let preserved: HashSet<Location> = self.symbols.data_locations().collect();
    optimize_preserving(&mut self.image, &preserved)
  }

  /// Disassembly followed by the symbol table.
  pub fn listing(&self) -> String {
    format!("{}\n{}", self.image.disassemble(), self.symbols)
  }
}

/// Compiles `source` for a memory of `MAX_PROGRAM_SIZE` words.
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
  Compiler::default().compile(source)
}

pub struct Compiler {
  size             : usize,
  image            : Image,
  symbols          : SymbolTable,
  patches          : Vec<Patch>,
  loops            : Vec<LoopContext>,
  next_location    : Location,          // Where the next instruction goes
  lowest_temporary : Option<Location>,
  line             : LineNumber,        // Line being compiled
}

impl Default for Compiler {
  fn default() -> Compiler {
    Compiler::new(MAX_PROGRAM_SIZE)
  }
}

impl Compiler {

  /// Compiles for a memory of `memory_size` words, or `MAX_PROGRAM_SIZE` if that is smaller.
  pub fn new(memory_size: usize) -> Compiler {
    let size = memory_size.min(MAX_PROGRAM_SIZE);
    Compiler {
      size,
      image            : Image::with_size(size),
      symbols          : SymbolTable::new(size),
      patches          : Vec::new(),
      loops            : Vec::new(),
      next_location    : 0,
      lowest_temporary : None,
      line             : 0,
    }
  }

  pub fn compile(mut self, source: &str) -> Result<Compilation, CompileError> {
    let lines = parse(source)?;

    // Pass 1
    for (index, line) in lines.iter().enumerate() {
      self.line = line.number;
      self.symbols
          .insert_line(line.number, self.next_location)
          .map_err(|error| CompileError::syntax(line.number, error.to_string()))?;
      self.compile_statement(&line.statement, &lines[index + 1..])?;
    }

    if let Some(open) = self.loops.last() {
      return Err(CompileError::syntax(open.line, "`for` without a matching `next`"));
    }

    // Pass 2
    self.resolve_patches()?;

    debug!(
      instructions = self.next_location,
      symbols = self.symbols.len(),
      "compiled"
    );
    Ok(Compilation {
      image   : self.image,
      symbols : self.symbols,
    })
  }

  fn compile_statement(&mut self, statement: &Statement, following: &[SourceLine]) -> Result<(), CompileError> {
    match statement {

      Statement::Rem(remark) => {
        if self.image.description().is_empty() && !remark.is_empty() {
          self.image.set_description(remark);
        }
      }

      Statement::Input(name) => {
        let location = self.allocate(Symbol::Variable(*name))?;
        self.emit(Opcode::Read, location)?;
      }

      Statement::Print(name) => {
        let location = self.symbols.find(&Symbol::Variable(*name)).ok_or_else(|| {
          CompileError::undefined(self.line, format!("`{}` is printed but never assigned", name))
        })?;
        self.emit(Opcode::Write, location)?;
      }

      Statement::Let { target, rhs } => self.compile_let(*target, rhs)?,

      Statement::Goto(line) => {
        self.emit_branch(Opcode::Branch, BranchTarget::Line(*line))?;
      }

      Statement::If { left, comparator, right, target } => {
        self.compile_if(*left, *comparator, *right, BranchTarget::Line(*target))?;
      }

      Statement::For { variable, start, bound } => {
        self.compile_for(*variable, *start, *bound, following)?;
      }

      Statement::Next(name) => self.compile_next(*name)?,

      Statement::Pause => {
        self.emit(Opcode::Pause, 0)?;
      }

      Statement::End => {
        self.emit(Opcode::Halt, 0)?;
      }

    } // end match statement
    Ok(())
  }

  // region Statements

  /// Allocates the target, then every operand in source order, then emits the assignment.
  fn compile_let(&mut self, target: Operand, rhs: &Rhs) -> Result<(), CompileError> {
    let destination = self.allocate(target.symbol())?;
    if let Operand::Constant(_) = target {
      return Err(CompileError::ConstantOverwrite { line: self.line, location: destination });
    }

    let source = match rhs {

      Rhs::Operand(operand) => self.allocate(operand.symbol())?,

      Rhs::Expression(tokens) => {
        for token in tokens {
          match token {
            Token::Number(value)  => { self.allocate(Symbol::Constant(*value))?; }
            Token::Variable(name) => { self.allocate(Symbol::Variable(*name))?; }
            _                     => {}
          }
        }
        let postfix = to_postfix(tokens)
            .map_err(|error| CompileError::syntax(self.line, error.to_string()))?;
        self.compile_postfix(&postfix)?
      }

    };

    self.emit(Opcode::Load, source)?;
    self.emit_store(destination)?;
    Ok(())
  }

  /**
    Emits a comparison of `left` and `right` followed by the conditional branches that jump to
    `target` when the comparison holds. The machine can only test the accumulator for being
    negative or zero, so every comparison is a subtraction.
  */
  fn compile_if(&mut self, left: Operand, comparator: Comparator, right: Operand, target: BranchTarget)
    -> Result<(), CompileError>
  {
    let left  = self.allocate(left.symbol())?;
    let right = self.allocate(right.symbol())?;

    match comparator {

      Comparator::Equal => {
        self.emit_difference(left, right)?;
        self.emit_branch(Opcode::BranchZero, target)?;
      }

      Comparator::NotEqual => {
        self.emit_difference(right, left)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
        self.emit_difference(left, right)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
      }

      Comparator::Less => {
        self.emit_difference(left, right)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
      }

      Comparator::Greater => {
        self.emit_difference(right, left)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
      }

      Comparator::LessOrEqual => {
        self.emit_difference(left, right)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
        self.emit_branch(Opcode::BranchZero, target)?;
      }

      Comparator::GreaterOrEqual => {
        self.emit_difference(right, left)?;
        self.emit_branch(Opcode::BranchNeg, target)?;
        self.emit_branch(Opcode::BranchZero, target)?;
      }

    } // end match comparator
    Ok(())
  }

  fn compile_for(&mut self, variable: char, start: Operand, bound: Operand, following: &[SourceLine])
    -> Result<(), CompileError>
  {
    let closed = following.iter().any(|line| matches!(line.statement, Statement::Next(_)));
    if !closed {
      return Err(CompileError::syntax(self.line, "`for` without a matching `next`"));
    }

    self.allocate(Symbol::Constant(LOOP_INCREMENT))?;
    let counter = self.allocate(Symbol::Variable(variable))?;
    self.allocate(start.symbol())?;
    let bound_location = self.allocate(bound.symbol())?;

    self.compile_let(Operand::Variable(variable), &Rhs::Operand(start))?;

    self.loops.push(LoopContext {
      start     : self.next_location,
      variable  : counter,
      bound     : bound_location,
      increment : LOOP_INCREMENT,
      line      : self.line,
    });
    Ok(())
  }

  /// Closes the innermost loop: increments the counter and branches back while it is in range.
  fn compile_next(&mut self, name: Option<char>) -> Result<(), CompileError> {
    let context = self.loops.pop().ok_or(CompileError::NextWithoutFor { line: self.line })?;

    let variable = match self.symbols.find_by_location(context.variable) {
      Some(Symbol::Variable(variable)) => variable,
      _                                => {
        return Err(CompileError::syntax(self.line, "loop variable is no longer allocated"));
      }
    };
    if let Some(name) = name {
      if name != variable {
        return Err(CompileError::syntax(
          self.line,
          format!("`next {}` closes the loop over `{}` from line {}", name, variable, context.line)
        ));
      }
    }
    let bound = match self.symbols.find_by_location(context.bound) {
      Some(Symbol::Variable(name))  => Operand::Variable(name),
      Some(Symbol::Constant(value)) => Operand::Constant(value),
      _                             => {
        return Err(CompileError::syntax(self.line, "loop bound is no longer allocated"));
      }
    };

    let increment = vec![
      Token::Variable(variable),
      Token::Operator(Operator::Add),
      Token::Number(context.increment),
    ];
    self.compile_let(Operand::Variable(variable), &Rhs::Expression(increment))?;
    self.compile_if(
      Operand::Variable(variable),
      Comparator::LessOrEqual,
      bound,
      BranchTarget::Location(context.start)
    )
  }

  /**
    Emits code for a postfix expression whose operands are already allocated and returns the
    location holding its value. Each operation loads its left operand, applies the right one and
    stores the result to a fresh temporary.
  */
  fn compile_postfix(&mut self, postfix: &[Token]) -> Result<Location, CompileError> {
    let mut stack : Vec<StackEntry> = Vec::new();
    let mut live  : usize           = 0; // Temporaries on the stack

    for token in postfix {
      match token {

        Token::Number(value) => {
          stack.push(StackEntry::Resolved(self.allocate(Symbol::Constant(*value))?));
        }

        Token::Variable(name) => {
          stack.push(StackEntry::Resolved(self.allocate(Symbol::Variable(*name))?));
        }

        Token::Operator(operator) => {
          let opcode = operator.opcode().ok_or_else(|| {
            CompileError::syntax(self.line, format!("`{}` has no machine instruction", operator.symbol()))
          })?;
          let missing = || {
            CompileError::syntax(self.line, format!("`{}` is missing an operand", operator.symbol()))
          };
          let right = stack.pop().ok_or_else(missing)?;
          let left  = stack.pop().ok_or_else(missing)?;

          for entry in [left, right].iter() {
            if let StackEntry::Temporary(_) = entry {
              live -= 1;
            }
          }
          let temporary = self.temporary(live)?;
          live += 1;

          self.emit(Opcode::Load, left.location())?;
          self.emit(opcode, right.location())?;
          self.emit(Opcode::Store, temporary)?;
          stack.push(StackEntry::Temporary(temporary));
        }

        Token::LeftParen | Token::RightParen => {
          return Err(CompileError::syntax(self.line, "unbalanced parentheses"));
        }

      } // end match token
    }

    match stack.as_slice() {
      [result] => Ok(result.location()),
      []       => Err(CompileError::syntax(self.line, "missing expression")),
      _        => Err(CompileError::syntax(self.line, "expression has operands without an operator"))
    }
  }

  // endregion

  // region Allocation

  /// Finds or allocates a variable or constant. New constants are written into the image.
  fn allocate(&mut self, symbol: Symbol) -> Result<Location, CompileError> {
    if let Some(location) = self.symbols.find(&symbol) {
      return Ok(location);
    }
    // Temporaries of earlier statements are written at run time.
    if let Some(lowest) = self.lowest_temporary {
      self.symbols.reserve_from(lowest);
    }

    let location = self.symbols.find_or_add(symbol).map_err(|error| match error {
      SymbolError::Exhausted(_) => CompileError::Capacity { line: self.line, size: self.size },
      error                     => CompileError::syntax(self.line, error.to_string())
    })?;
    if location < self.next_location {
      return Err(CompileError::Capacity { line: self.line, size: self.size });
    }

    if let Symbol::Constant(value) = symbol {
      self.image.set(location, value);
    }
    debug!(line = self.line, symbol = %symbol, location, "allocated");
    Ok(location)
  }

  /// Location of the temporary above `live` others.
  fn temporary(&mut self, live: usize) -> Result<Location, CompileError> {
    let capacity = CompileError::Capacity { line: self.line, size: self.size };
    let base     = self.symbols.next_free().ok_or_else(|| capacity.clone())?;
    let location = base.checked_sub(live).ok_or_else(|| capacity.clone())?;
    if location < self.next_location {
      return Err(capacity);
    }
    self.lowest_temporary = Some(self.lowest_temporary.map_or(location, |lowest| lowest.min(location)));
    Ok(location)
  }

  /// Instructions must stay below every location holding data.
  fn code_limit(&self) -> Location {
    let data = self.symbols.data_floor().unwrap_or(self.size);
    let temporaries = self.lowest_temporary.unwrap_or(self.size);
    data.min(temporaries)
  }

  // endregion

  // region Emission

  fn emit(&mut self, opcode: Opcode, operand: Location) -> Result<Location, CompileError> {
    let location = self.next_location;
    if location >= self.code_limit() {
      return Err(CompileError::Capacity { line: self.line, size: self.size });
    }

    let instruction = Instruction::new(opcode, operand);
    self.image.emit(location, instruction.encode());
    self.next_location += 1;
    debug!(line = self.line, location, instruction = %instruction, "emitted");
    Ok(location)
  }

  fn emit_store(&mut self, destination: Location) -> Result<Location, CompileError> {
    if let Some(Symbol::Constant(_)) = self.symbols.find_by_location(destination) {
      return Err(CompileError::ConstantOverwrite { line: self.line, location: destination });
    }
    self.emit(Opcode::Store, destination)
  }

  /// `accumulator <- minuend - subtrahend`
  fn emit_difference(&mut self, minuend: Location, subtrahend: Location) -> Result<(), CompileError> {
    self.emit(Opcode::Load, minuend)?;
    self.emit(Opcode::Subtract, subtrahend)?;
    Ok(())
  }

  /// Emits a branch, recording a patch if the target line has not been compiled yet.
  fn emit_branch(&mut self, opcode: Opcode, target: BranchTarget) -> Result<Location, CompileError> {
    let resolved = match target {
      BranchTarget::Location(location) => Some(location),
      BranchTarget::Line(line)         => self.symbols.find(&Symbol::Line(line))
    };

    let location = self.emit(opcode, resolved.unwrap_or(0))?;
    if let (None, BranchTarget::Line(target_line)) = (resolved, target) {
      debug!(line = self.line, location, target_line, "forward branch");
      self.patches.push(Patch { location, target_line, source_line: self.line });
    }
    Ok(location)
  }

  // endregion

  /// Pass 2: points every forward branch at its target line.
  fn resolve_patches(&mut self) -> Result<(), CompileError> {
    for patch in std::mem::take(&mut self.patches) {
      let target = self.symbols.find(&Symbol::Line(patch.target_line)).ok_or_else(|| {
        CompileError::undefined(patch.source_line, format!("line {} does not exist", patch.target_line))
      })?;
      let (opcode, _) = decode(self.image.get(patch.location).unwrap_or(0));
      self.image.set(patch.location, encode(opcode, target as Word));
      debug!(location = patch.location, target, "patched");
    }
    Ok(())
  }
}
