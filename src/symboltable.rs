/*!
  The translator's symbol table maps variables, constants and line numbers to memory locations.

  Variables and constants are data. They are allocated downward from the top of memory, so the
  first data symbol seen lives at the highest location. Each data location holds exactly one
  symbol and the table is really just a convenience wrapper around a `BiMap`. Line numbers name
  instruction locations instead, and several lines may share one location, so they are kept in
  a separate map.
*/

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use bimap::BiMap;
use prettytable::Table;
use thiserror::Error;

use crate::bytecode::Word;
use crate::display::TABLE_DISPLAY_FORMAT;
use crate::memory::Location;

pub type LineNumber = u32;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Symbol {
  Variable(char),
  Constant(Word),
  Line(LineNumber),
}

impl Symbol {
  /// Variables and constants occupy memory; line numbers only name it.
  pub fn is_data(&self) -> bool {
    !matches!(self, Symbol::Line(_))
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Symbol::Variable(_) => "Variable",
      Symbol::Constant(_) => "Constant",
      Symbol::Line(_)     => "LineNumber",
    }
  }

  /// The integer a symbol is keyed by: character code, value, or line number.
  pub fn key(&self) -> i64 {
    match self {
      Symbol::Variable(name)  => *name as i64,
      Symbol::Constant(value) => *value as i64,
      Symbol::Line(line)      => *line as i64,
    }
  }
}

impl Display for Symbol {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Symbol::Variable(name)  => write!(f, "{}", name),
      Symbol::Constant(value) => write!(f, "{}", value),
      Symbol::Line(line)      => write!(f, "{}", line),
    }
  }
}

#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolError {
  #[error("line number {0} cannot be allocated data memory")]
  NotAllocatable(Symbol),
  #[error("no memory left for `{0}`")]
  Exhausted(Symbol),
  #[error("line number {0} appears more than once")]
  DuplicateLine(LineNumber),
}

#[derive(Clone, Debug)]
pub struct SymbolTable {
  data   : BiMap<Symbol, Location>,
  lines  : BTreeMap<LineNumber, Location>,
  // The next location to allocate. `None` once location zero is taken.
  cursor : Option<Location>,
}

impl SymbolTable {

  pub fn new(memory_size: usize) -> SymbolTable {
    SymbolTable {
      data   : BiMap::new(),
      lines  : BTreeMap::new(),
      cursor : memory_size.checked_sub(1),
    }
  }

  /// Looks up a symbol without allocating.
  pub fn find(&self, symbol: &Symbol) -> Option<Location> {
    match symbol {
      Symbol::Line(line) => self.lines.get(line).copied(),
      _                  => self.data.get_by_left(symbol).copied()
    }
  }

  /// The variable or constant stored at `location`, if any.
  pub fn find_by_location(&self, location: Location) -> Option<Symbol> {
    self.data.get_by_right(&location).copied()
  }

  /**
    Returns the location of a variable or constant, allocating the next free location from the
    top of memory the first time the symbol is seen.
  */
  pub fn find_or_add(&mut self, symbol: Symbol) -> Result<Location, SymbolError> {
    if !symbol.is_data() {
      return Err(SymbolError::NotAllocatable(symbol));
    }
    if let Some(location) = self.data.get_by_left(&symbol) {
      return Ok(*location);
    }

    let location = self.cursor.ok_or(SymbolError::Exhausted(symbol))?;
    self.data.insert(symbol, location);
    self.cursor = location.checked_sub(1);
    Ok(location)
  }

  /// Records the instruction location a source line starts at.
  pub fn insert_line(&mut self, line: LineNumber, location: Location) -> Result<(), SymbolError> {
    match self.lines.contains_key(&line) {
      true  => Err(SymbolError::DuplicateLine(line)),
      false => {
        self.lines.insert(line, location);
        Ok(())
      }
    }
  }

  /**
    The highest location not yet allocated, which is where expression temporaries start. `None`
    when data memory is exhausted.
  */
  pub fn next_free(&self) -> Option<Location> {
    self.cursor
  }

  /// Keeps every later allocation below `location`, which the caller has taken for itself.
  pub fn reserve_from(&mut self, location: Location) {
    if let Some(cursor) = self.cursor {
      if cursor >= location {
        self.cursor = location.checked_sub(1);
      }
    }
  }

  /// The lowest location holding a variable or constant.
  pub fn data_floor(&self) -> Option<Location> {
    self.data.right_values().min().copied()
  }

  /// Locations of every variable and constant.
  pub fn data_locations(&self) -> impl Iterator<Item = Location> + '_ {
    self.data.right_values().copied()
  }

  /// Data symbols in allocation order (highest location first), then line numbers.
  pub fn entries(&self) -> Vec<(Symbol, Location)> {
    let mut data: Vec<(Symbol, Location)> =
      self.data.iter().map(|(symbol, location)| (*symbol, *location)).collect();
    data.sort_by(|a, b| b.1.cmp(&a.1));
    data.extend(self.lines.iter().map(|(line, location)| (Symbol::Line(*line), *location)));
    data
  }

  pub fn len(&self) -> usize {
    self.data.len() + self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Display for SymbolTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Symbol", ubl->"Type", ubr->"Location"]);

    for (symbol, location) in self.entries() {
      table.add_row(row![r->symbol, symbol.kind(), r->format!("{:02}", location)]);
    }

    write!(f, "{}", table)
  }
}
