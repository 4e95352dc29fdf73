/*!

  The machine uses signed decimal words of at most four digits. Every memory cell holds one
  word, and a word is either data or an instruction; nothing in the word itself says which.
  An instruction word packs two decimal fields:

    Opcode:  two leading digits (10 to 51)
    Operand: two trailing digits (00 to 99), a memory location

  Since operands have two digits, compiled programs address at most one hundred words no matter
  how large the memory of the machine executing them is.

  The opcode is an enum with one variant per operation whose discriminant is the opcode digits
  themselves. Decoding goes through `num_enum`, so a word with unknown leading digits is an
  error instead of a silent no-op, and `strum` supplies the textual names used in dumps and
  listings.

*/

mod binary;
mod instruction;

pub use binary::{decode, encode, format_word, in_word_range, is_valid_word, Word, WORD_MAX, WORD_MIN};
pub use instruction::{DecodeError, Instruction, Opcode};
