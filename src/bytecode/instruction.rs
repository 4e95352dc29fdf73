use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use thiserror::Error;

use super::binary::{decode, encode, Word};
use crate::memory::Location;

/**
  Opcodes of the machine.

  The discriminant of each variant is the two leading decimal digits of the instruction word,
  so the numeric value of an opcode is exactly what appears in memory. Words whose leading
  digits do not name a variant fail to decode rather than silently doing nothing.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,        Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Input/output //
  #[strum(serialize = "READ")]
  Read       = 10, // Read a word from the terminal into memory[operand]
  #[strum(serialize = "WRITE")]
  Write      = 11, // Write memory[operand] to the terminal

  // Load/store //
  #[strum(serialize = "LOAD")]
  Load       = 20, // accumulator <- memory[operand]
  #[strum(serialize = "STORE")]
  Store      = 21, // memory[operand] <- accumulator, then accumulator <- 0

  // Arithmetic //
  #[strum(serialize = "MULTIPLY")]
  Multiply   = 30,
  #[strum(serialize = "DIVIDE")]
  Divide     = 31,
  #[strum(serialize = "ADD")]
  Add        = 32,
  #[strum(serialize = "SUBTRACT")]
  Subtract   = 33,

  // Transfer of control //
  #[strum(serialize = "BRANCH")]
  Branch     = 40,
  #[strum(serialize = "BRANCHNEG")]
  BranchNeg  = 41, // Taken iff accumulator < 0
  #[strum(serialize = "BRANCHZERO")]
  BranchZero = 42, // Taken iff accumulator == 0
  #[strum(serialize = "HALT")]
  Halt       = 50,
  #[strum(serialize = "PAUSE")]
  Pause      = 51,
}

const ALL_OPCODES: [Opcode; 13] = [
  Opcode::Read,     Opcode::Write,
  Opcode::Load,     Opcode::Store,
  Opcode::Multiply, Opcode::Divide,   Opcode::Add,       Opcode::Subtract,
  Opcode::Branch,   Opcode::BranchNeg, Opcode::BranchZero,
  Opcode::Halt,     Opcode::Pause,
];

impl Opcode {
  pub fn code(&self) -> Word {
    Into::<u8>::into(*self) as Word
  }

  /// Every opcode, in numeric order.
  pub fn all() -> &'static [Opcode] {
    &ALL_OPCODES
  }

  /// Looks up the opcode named by the leading digits of an instruction word.
  pub fn from_code(code: Word) -> Option<Opcode> {
    let byte = u8::try_from(code).ok()?;
    Opcode::try_from(byte).ok()
  }

  /// Branch operands are code locations; every other operand is a data location.
  pub fn is_branch(&self) -> bool {
    match self {
      | Opcode::Branch
      | Opcode::BranchNeg
      | Opcode::BranchZero => true,
      _                    => false
    }
  }
}

#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodeError {
  #[error("{word:+05} does not hold a known operation code")]
  UnknownOpcode { word: Word },
}

/// Holds the decoded components of an instruction word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode  : Opcode,
  pub operand : Location,
}

impl Instruction {
  pub fn new(opcode: Opcode, operand: Location) -> Instruction {
    Instruction { opcode, operand }
  }

  pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let (code, operand) = decode(word);
    match (Opcode::from_code(code), operand >= 0) {

      (Some(opcode), true) => Ok(Instruction { opcode, operand: operand as Location }),

      _                    => Err(DecodeError::UnknownOpcode { word })

    }
  }

  /**
    Encodes the instruction into a word. It is the caller's responsibility to keep the operand
    within the two decimal digits an instruction word can address.
  */
  pub fn encode(&self) -> Word {
    encode(self.opcode.code(), self.operand as Word)
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {:02}", self.opcode, self.operand)
  }
}


#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn opcodes_carry_their_machine_codes() {
    assert_eq!(Opcode::Read.code(), 10);
    assert_eq!(Opcode::Store.code(), 21);
    assert_eq!(Opcode::BranchZero.code(), 42);
    assert_eq!(Opcode::Pause.code(), 51);
    assert_eq!(Opcode::from_code(33), Some(Opcode::Subtract));
    assert_eq!(Opcode::from_code(12), None);
    assert_eq!(Opcode::from_code(-20), None);
    assert_eq!(Opcode::from_code(300), None);
  }

  #[test]
  fn opcode_names_round_trip() {
    for opcode in Opcode::all() {
      let name: &'static str = (*opcode).into();
      assert_eq!(Opcode::from_str(name), Ok(*opcode));
    }
    assert_eq!(Opcode::BranchNeg.to_string(), "BRANCHNEG");
  }

  #[test]
  fn decode_rejects_unknown_words() {
    assert_eq!(Instruction::decode(2098), Ok(Instruction::new(Opcode::Load, 98)));
    assert_eq!(Instruction::decode(0), Err(DecodeError::UnknownOpcode { word: 0 }));
    assert_eq!(Instruction::decode(1299), Err(DecodeError::UnknownOpcode { word: 1299 }));
    assert_eq!(Instruction::decode(-2098), Err(DecodeError::UnknownOpcode { word: -2098 }));
  }

  #[test]
  fn only_transfers_are_branches() {
    let branches: Vec<Opcode> = Opcode::all().iter().copied().filter(Opcode::is_branch).collect();
    assert_eq!(branches, vec![Opcode::Branch, Opcode::BranchNeg, Opcode::BranchZero]);
  }

  #[test]
  fn display() {
    assert_eq!(Instruction::new(Opcode::Write, 7).to_string(), "WRITE 07");
  }
}
