//! The machine's store: a fixed number of words, every one of them always populated.

use prettytable::{Cell, Row, Table};
use thiserror::Error;

use crate::bytecode::{format_word, Word};
use crate::display::TABLE_DISPLAY_FORMAT;

/// A `Location` is an index into memory. Instruction operands can only name locations below 100.
pub type Location = usize;

pub const DEFAULT_MEMORY_SIZE: usize = 100;

/// Number of cells per row of a memory dump.
const DUMP_COLUMNS: usize = 10;

#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoryError {
  #[error("memory location {index} is outside of memory of size {size}")]
  OutOfRange { index: Location, size: usize },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
  cells: Vec<Word>,
}

impl Memory {

  pub fn new(size: usize) -> Memory {
    Memory {
      cells: vec![0; size]
    }
  }

  pub fn size(&self) -> usize {
    self.cells.len()
  }

  pub fn get(&self, index: Location) -> Result<Word, MemoryError> {
    self.cells
        .get(index)
        .copied()
        .ok_or(MemoryError::OutOfRange { index, size: self.size() })
  }

  pub fn put(&mut self, value: Word, index: Location) -> Result<(), MemoryError> {
    let size = self.size();
    match self.cells.get_mut(index) {

      Some(cell) => {
        *cell = value;
        Ok(())
      }

      None => Err(MemoryError::OutOfRange { index, size })

    }
  }

  pub fn clear(&mut self) {
    for cell in self.cells.iter_mut() {
      *cell = 0;
    }
  }

  /// Copies `words` into memory starting at location zero and returns how many fit.
  pub fn load(&mut self, words: &[Word]) -> usize {
    let count = words.len().min(self.size());
    self.cells[..count].copy_from_slice(&words[..count]);
    count
  }

  pub fn cells(&self) -> &[Word] {
    &self.cells
  }

  /**
    Renders memory as a grid of `DUMP_COLUMNS` columns. The column headings are the last digit
    of the location and each row is labeled with the location of its first cell.
  */
  pub fn dump(&self) -> String {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);

    let mut titles = vec![Cell::new("")];
    titles.extend((0..DUMP_COLUMNS).map(|column| Cell::new(&format!("{:02}", column)).style_spec("br")));
    table.set_titles(Row::new(titles));

    for (row, chunk) in self.cells.chunks(DUMP_COLUMNS).enumerate() {
      let mut cells = vec![Cell::new(&format!("{:02}", row * DUMP_COLUMNS)).style_spec("br")];
      cells.extend(chunk.iter().map(|word| Cell::new(&format_word(*word)).style_spec("r")));
      table.add_row(Row::new(cells));
    }

    format!("MEMORY:\n{}", table)
  }
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new(DEFAULT_MEMORY_SIZE)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_zeroed() {
    let memory = Memory::new(20);
    assert_eq!(memory.size(), 20);
    assert!(memory.cells().iter().all(|word| *word == 0));
  }

  #[test]
  fn bounds_checked() {
    let mut memory = Memory::default();
    assert_eq!(memory.put(1007, 99), Ok(()));
    assert_eq!(memory.get(99), Ok(1007));
    assert_eq!(memory.put(1, 100), Err(MemoryError::OutOfRange { index: 100, size: 100 }));
    assert_eq!(memory.get(250), Err(MemoryError::OutOfRange { index: 250, size: 100 }));
  }

  #[test]
  fn clear_resets_every_cell() {
    let mut memory = Memory::new(10);
    for i in 0..10 {
      memory.put(i as Word * 3, i).unwrap();
    }
    memory.clear();
    assert_eq!(memory.cells(), &[0; 10]);
  }

  #[test]
  fn load_truncates_to_size() {
    let mut memory = Memory::new(3);
    assert_eq!(memory.load(&[1, 2]), 2);
    assert_eq!(memory.cells(), &[1, 2, 0]);
    assert_eq!(memory.load(&[5, 6, 7, 8]), 3);
    assert_eq!(memory.cells(), &[5, 6, 7]);
  }

  #[test]
  fn dump_formats_instructions_and_data_differently() {
    let mut memory = Memory::new(12);
    memory.put(1007, 0).unwrap();
    memory.put(-3, 1).unwrap();
    memory.put(42, 11).unwrap();
    let dump = memory.dump();
    assert!(dump.starts_with("MEMORY:"));
    assert!(dump.contains("+1007"));
    assert!(dump.contains("-3"));
    assert!(dump.contains("+0000"));
    assert!(dump.contains(" 42 "));
    // One row label per ten cells.
    assert!(dump.contains("10"));
    assert_eq!(dump.matches("+1007").count(), 1);
  }
}
