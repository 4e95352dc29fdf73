/*!
  This module is responsible for the encoding and decoding of instruction words.

  A word is a signed decimal numeral of at most four digits. An instruction word is
  `opcode * 100 + operand`, so the two leading digits select the operation and the two
  trailing digits address a memory location. Nothing here validates its input; callers that
  need a checked decode use `Instruction::decode`.
*/

use super::Opcode;

// If you change this you must also change `WORD_MIN` and `WORD_MAX`.
pub type Word = i32;

pub const WORD_MIN: Word = -9999;
pub const WORD_MAX: Word = 9999;

/// Splits a word into its (opcode, operand) digits, truncating toward zero.
pub fn decode(word: Word) -> (Word, Word) {
  (word / 100, word % 100)
}

pub fn encode(opcode: Word, operand: Word) -> Word {
  opcode * 100 + operand
}

pub fn in_word_range(value: i64) -> bool {
  (WORD_MIN as i64) <= value && value <= (WORD_MAX as i64)
}

/**
  Distinguishes instruction words from raw data when rendering memory. Zero is the default
  content of every cell and counts as valid.
*/
pub fn is_valid_word(word: Word) -> bool {
  if word == 0 {
    return true;
  }
  word >= 1000 && Opcode::from_code(decode(word).0).is_some()
}

/// Renders instruction words as signed four digit numerals and anything else as a plain number.
pub fn format_word(word: Word) -> String {
  match is_valid_word(word) {
    true  => format!("{:+05}", word),
    false => format!("{}", word)
  }
}
