//! The word machine: an accumulator, a handful of registers, and a decimal memory that holds
//! both the program and its data.

use std::fmt::{Display, Formatter};
use std::io;

use prettytable::Table;
use strum_macros::Display as StrumDisplay;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bytecode::{decode, format_word, in_word_range, DecodeError, Instruction, Opcode, Word};
use crate::display::TABLE_DISPLAY_FORMAT;
use crate::image::Image;
use crate::memory::{Location, Memory, MemoryError, DEFAULT_MEMORY_SIZE};
use crate::terminal::{Terminal, OUTPUT_PREFIX};

/// Ends program entry.
pub const SENTINEL: &str = "-99999";

const BANNER_WIDTH: usize = 50;

const WELCOME: [&str; 7] = [
  "Welcome to the word machine!",
  "Please enter your program one instruction",
  "(or data word) at a time. I will display the",
  "location number and a question mark (?). You",
  "then type the word for that location. Enter",
  "-99999 to stop entering your program.",
  "",
];

const LOADING_COMPLETED : &str = "*** Program loading completed ***";
const EXECUTION_BEGINS  : &str = "*** Program execution begins ***";
const EXECUTION_ENDED   : &str = "*** Machine execution terminated ***";
const READ_PROMPT       : &str = "Enter an integer ? ";
const PAUSE_PROMPT      : &str = "Program paused. View memory dump (N/y)? ";

#[derive(StrumDisplay, Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
  Idle,
  Loading,
  Executing,
  Paused,
  Halted,
}

/// Conditions that stop a running program.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum Fault {
  #[error("attempt to divide by zero at location {location:02}")]
  DivideByZero { location: Location },
  #[error("accumulator overflow: {value} does not fit in a word")]
  Overflow { value: i64 },
  #[error(transparent)]
  Memory(#[from] MemoryError),
  #[error(transparent)]
  UnknownOpcode(#[from] DecodeError),
  #[error("input closed while waiting for a value")]
  InputClosed,
}

/// How a run ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination {
  Halted,
  /// The program counter walked off the end of memory.
  EndOfMemory,
  Faulted(Fault),
}

/// What the cycle does after an instruction.
enum Flow {
  Next,
  Jump(Location),
  Halt,
}

/// Anything that cuts an instruction short.
enum Interrupt {
  Fault(Fault),
  Terminal(io::Error),
}

impl From<Fault> for Interrupt {
  fn from(fault: Fault) -> Interrupt {
    Interrupt::Fault(fault)
  }
}

impl From<MemoryError> for Interrupt {
  fn from(error: MemoryError) -> Interrupt {
    Interrupt::Fault(error.into())
  }
}

impl From<DecodeError> for Interrupt {
  fn from(error: DecodeError) -> Interrupt {
    Interrupt::Fault(error.into())
  }
}

impl From<io::Error> for Interrupt {
  fn from(error: io::Error) -> Interrupt {
    Interrupt::Terminal(error)
  }
}

pub struct Machine {
  memory : Memory,
  state  : State,

  // Registers //
  accumulator          : Word,
  instruction_counter  : usize,    // Instructions executed, or words entered while loading
  program_counter      : Location, // Location of the current instruction
  instruction_register : Word,
  operation_code       : Word,     // Raw leading digits of the instruction register
  operand              : Word,     // Raw trailing digits of the instruction register
}

impl Machine {

  pub fn new(memory_size: usize) -> Machine {
    Machine {
      memory               : Memory::new(memory_size),
      state                : State::Idle,
      accumulator          : 0,
      instruction_counter  : 0,
      program_counter      : 0,
      instruction_register : 0,
      operation_code       : 0,
      operand              : 0,
    }
  }

  // region Accessors

  pub fn state(&self) -> State {
    self.state
  }

  pub fn accumulator(&self) -> Word {
    self.accumulator
  }

  pub fn instruction_counter(&self) -> usize {
    self.instruction_counter
  }

  pub fn program_counter(&self) -> Location {
    self.program_counter
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  // endregion

  fn reset(&mut self) {
    self.memory.clear();
    self.state                = State::Idle;
    self.accumulator          = 0;
    self.instruction_counter  = 0;
    self.program_counter      = 0;
    self.instruction_register = 0;
    self.operation_code       = 0;
    self.operand              = 0;
  }

  // region Loading

  /**
    Interactive program entry. The operator types one word per location, prompted with the
    location number, until the sentinel `-99999`, the end of input, or a full memory. Anything
    that is not a word is ignored and the same location is prompted again. The entered program
    is then executed.
  */
  pub fn run(&mut self, terminal: &mut dyn Terminal) -> io::Result<Termination> {
    self.reset();
    self.state = State::Loading;

    let banner: Vec<String> =
      WELCOME.iter()
             .map(|line| format!("*** {:<width$} ***", line, width = BANNER_WIDTH))
             .collect();
    terminal.write_line(&banner.join("\n"))?;

    while self.instruction_counter < self.memory.size() {
      let prompt = format!("{:02} ? ", self.instruction_counter);
      let entry = match terminal.read_line(&prompt)? {
        Some(entry) => entry,
        None        => break
      };
      let entry = entry.trim();
      if entry == SENTINEL {
        break;
      }
      match entry.parse::<i64>() {

        Ok(value) if in_word_range(value) => {
          if self.memory.put(value as Word, self.instruction_counter).is_ok() {
            self.instruction_counter += 1;
          }
        }

        _ => debug!(entry, "ignored program entry")

      }
    }

    terminal.write_line(LOADING_COMPLETED)?;
    terminal.write_line(EXECUTION_BEGINS)?;
    self.execute(terminal)
  }

  /// Loads `image` into a cleared memory and executes it.
  pub fn run_image(&mut self, image: &Image, terminal: &mut dyn Terminal) -> io::Result<Termination> {
    self.reset();
    self.state = State::Loading;

    terminal.write_line("*** Loading program into memory ***")?;
    if !image.description().is_empty() {
      terminal.write_line(&format!("*** {} ***", image.description()))?;
    }

    let loaded = self.memory.load(image.words());
    if loaded < image.len() {
      warn!(
        image_size = image.len(),
        memory_size = self.memory.size(),
        "image does not fit in memory, truncated"
      );
    }

    terminal.write_line(LOADING_COMPLETED)?;
    terminal.write_line(EXECUTION_BEGINS)?;
    self.execute(terminal)
  }

  // endregion

  // region Execution

  /**
    The fetch-decode-execute cycle. Runs until `HALT`, a fault, or the program counter leaving
    memory. Faults are reported on the terminal together with a dump and end the run; only
    terminal failures are returned as errors.
  */
  fn execute(&mut self, terminal: &mut dyn Terminal) -> io::Result<Termination> {
    self.state = State::Executing;

    let termination = loop {
      if self.program_counter >= self.memory.size() {
        debug!(program_counter = self.program_counter, "program counter left memory");
        break Termination::EndOfMemory;
      }

      match self.step(terminal) {

        Ok(Flow::Next)           => self.program_counter += 1,

        Ok(Flow::Jump(location)) => self.program_counter = location,

        Ok(Flow::Halt)           => break Termination::Halted,

        Err(Interrupt::Fault(fault)) => {
          terminal.write_line(&format!("*** Machine fault: {} ***", fault))?;
          terminal.write_line(&self.dump())?;
          break Termination::Faulted(fault);
        }

        Err(Interrupt::Terminal(error)) => {
          self.state = State::Halted;
          return Err(error);
        }

      } // end match step

      #[cfg(feature = "trace_computation")] println!("{}", self);
    };

    self.state = State::Halted;
    Ok(termination)
  }

  fn step(&mut self, terminal: &mut dyn Terminal) -> Result<Flow, Interrupt> {
    self.instruction_counter += 1;
    self.instruction_register = self.memory.get(self.program_counter)?;

    let (operation_code, operand) = decode(self.instruction_register);
    self.operation_code = operation_code;
    self.operand        = operand;

    // An empty cell does nothing.
    if self.instruction_register == 0 {
      return Ok(Flow::Next);
    }

    let instruction = Instruction::decode(self.instruction_register)?;
    let operand     = instruction.operand;

    match instruction.opcode {

      Opcode::Read => {
        let value = self.read_value(terminal)?;
        self.memory.put(value, operand)?;
      }

      Opcode::Write => {
        let value = self.memory.get(operand)?;
        terminal.write_line(&format!("{}{}", OUTPUT_PREFIX, value))?;
      }

      Opcode::Load => {
        self.accumulator = self.memory.get(operand)?;
      }

      Opcode::Store => {
        self.memory.put(self.accumulator, operand)?;
        self.accumulator = 0;
      }

      Opcode::Multiply => {
        let value = self.memory.get(operand)? as i64;
        self.accumulator = fit(self.accumulator as i64 * value)?;
      }

      Opcode::Divide => {
        let divisor = self.memory.get(operand)?;
        if divisor == 0 {
          return Err(Fault::DivideByZero { location: self.program_counter }.into());
        }
        // Truncates toward zero.
        self.accumulator = fit(self.accumulator as i64 / divisor as i64)?;
      }

      Opcode::Add => {
        let value = self.memory.get(operand)? as i64;
        self.accumulator = fit(self.accumulator as i64 + value)?;
      }

      Opcode::Subtract => {
        let value = self.memory.get(operand)? as i64;
        self.accumulator = fit(self.accumulator as i64 - value)?;
      }

      Opcode::Branch => return Ok(Flow::Jump(operand)),

      Opcode::BranchNeg => {
        if self.accumulator < 0 {
          return Ok(Flow::Jump(operand));
        }
      }

      Opcode::BranchZero => {
        if self.accumulator == 0 {
          return Ok(Flow::Jump(operand));
        }
      }

      Opcode::Halt => {
        terminal.write_line(EXECUTION_ENDED)?;
        terminal.write_line(&self.dump())?;
        return Ok(Flow::Halt);
      }

      Opcode::Pause => {
        self.state = State::Paused;
        let answer = terminal.read_line(PAUSE_PROMPT)?;
        if let Some("y") | Some("Y") = answer.as_deref().map(str::trim) {
          terminal.write_line(&self.dump())?;
        }
        self.state = State::Executing;
      }

    } // end match opcode

    Ok(Flow::Next)
  }

  /// Prompts until the operator supplies a word.
  fn read_value(&mut self, terminal: &mut dyn Terminal) -> Result<Word, Interrupt> {
    loop {
      let line = match terminal.read_line(READ_PROMPT)? {
        Some(line) => line,
        None       => return Err(Fault::InputClosed.into())
      };
      match line.trim().parse::<i64>() {
        Ok(value) if in_word_range(value) => return Ok(value as Word),
        _                                 => debug!(line = line.as_str(), "not a word, prompting again")
      }
    }
  }

  // endregion

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    table.add_row(row![r->"accumulator",         format!("{:+05}", self.accumulator)]);
    table.add_row(row![r->"instructionCounter",  format!("{:02}", self.instruction_counter)]);
    table.add_row(row![r->"instructionRegister", format_word(self.instruction_register)]);
    table.add_row(row![r->"operationCode",       format!("{:02}", self.operation_code)]);
    table.add_row(row![r->"operand",             format!("{:02}", self.operand)]);
    table
  }

  /// The register table followed by the memory grid.
  pub fn dump(&self) -> String {
    format!("REGISTERS:\n{}\n{}", self.make_register_table(), self.memory.dump())
  }

  // endregion

}

impl Default for Machine {
  fn default() -> Machine {
    Machine::new(DEFAULT_MEMORY_SIZE)
  }
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "State: {}\n{}", self.state, self.dump())
  }
}

/// Keeps arithmetic results inside the word range.
fn fit(value: i64) -> Result<Word, Fault> {
  match in_word_range(value) {
    true  => Ok(value as Word),
    false => Err(Fault::Overflow { value })
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::terminal::ScriptedTerminal;

  fn image(words: &[Word]) -> Image {
    let mut image = Image::new();
    for word in words {
      image.push(*word);
    }
    image
  }

  fn run(words: &[Word], inputs: &[&str]) -> (Machine, ScriptedTerminal, Termination) {
    let mut machine  = Machine::default();
    let mut terminal = ScriptedTerminal::new(inputs.iter().copied());
    let termination  = machine.run_image(&image(words), &mut terminal).unwrap();
    (machine, terminal, termination)
  }

  #[test]
  fn adds_two_numbers() {
    let adder = [1007, 1008, 2007, 3208, 2109, 1109, 5000];
    let (machine, terminal, termination) = run(&adder, &["3", "4"]);
    assert_eq!(termination, Termination::Halted);
    assert_eq!(machine.state(), State::Halted);
    assert_eq!(terminal.outputs(), vec![7]);
    assert!(terminal.transcript().iter().any(|line| line == EXECUTION_ENDED));
    assert_eq!(machine.instruction_counter(), 7);
  }

  #[test]
  fn store_clears_the_accumulator() {
    let mut words = vec![2010, 2111, 5000];
    words.resize(12, 0);
    words[10] = 5;
    let (machine, _, termination) = run(&words, &[]);
    assert_eq!(termination, Termination::Halted);
    assert_eq!(machine.accumulator(), 0);
    assert_eq!(machine.memory().get(11), Ok(5));
  }

  #[test]
  fn taken_branches_land_on_their_target() {
    let mut words = vec![4003, 1110, 5000, 1111, 5000];
    words.resize(12, 0);
    words[10] = 1;
    words[11] = 2;
    let (machine, terminal, _) = run(&words, &[]);
    assert_eq!(terminal.outputs(), vec![2]);
    assert_eq!(machine.program_counter(), 4);
  }

  #[test]
  fn conditional_branches() {
    // 00 LOAD 10; 01 BRANCHNEG 04; 02 WRITE 11; 03 HALT; 04 WRITE 12; 05 HALT
    let mut words = vec![2010, 4104, 1111, 5000, 1112, 5000];
    words.resize(13, 0);
    words[11] = 1;
    words[12] = 2;

    words[10] = -1;
    assert_eq!(run(&words, &[]).1.outputs(), vec![2]);
    words[10] = 0;
    assert_eq!(run(&words, &[]).1.outputs(), vec![1]);

    words[1] = 4204; // BRANCHZERO 04
    assert_eq!(run(&words, &[]).1.outputs(), vec![2]);
    words[10] = 3;
    assert_eq!(run(&words, &[]).1.outputs(), vec![1]);
  }

  #[test]
  fn division_truncates() {
    // -7 / 2
    let mut words = vec![2010, 3111, 2112, 1112, 5000];
    words.resize(13, 0);
    words[10] = -7;
    words[11] = 2;
    assert_eq!(run(&words, &[]).1.outputs(), vec![-3]);
  }

  #[test]
  fn faults_halt_the_machine() {
    let mut words = vec![2010, 3111, 5000];
    words.resize(12, 0);
    words[10] = 8;
    let (machine, terminal, termination) = run(&words, &[]);
    assert_eq!(termination, Termination::Faulted(Fault::DivideByZero { location: 1 }));
    assert_eq!(machine.state(), State::Halted);
    assert!(terminal.transcript().iter().any(|line| line.starts_with("*** Machine fault")));
    assert!(terminal.transcript().iter().any(|line| line == "MEMORY:"));

    words[10] = 9999;
    words[1] = 3210; // ADD 10
    assert_eq!(run(&words, &[]).2, Termination::Faulted(Fault::Overflow { value: 19998 }));

    words[1] = 1200;
    assert_eq!(
      run(&words, &[]).2,
      Termination::Faulted(Fault::UnknownOpcode(DecodeError::UnknownOpcode { word: 1200 }))
    );
  }

  #[test]
  fn read_prompts_until_a_word_arrives() {
    let (machine, terminal, _) = run(&[1005, 5000], &["abc", "12345", "5"]);
    assert_eq!(machine.memory().get(5), Ok(5));
    let prompts = terminal.transcript().iter().filter(|line| line.starts_with(READ_PROMPT)).count();
    assert_eq!(prompts, 3);
  }

  #[test]
  fn read_without_input_faults() {
    let (_, _, termination) = run(&[1005, 5000], &[]);
    assert_eq!(termination, Termination::Faulted(Fault::InputClosed));
  }

  #[test]
  fn running_off_the_end_of_memory() {
    let mut machine  = Machine::new(3);
    let mut terminal = ScriptedTerminal::default();
    let termination  = machine.run_image(&image(&[2000, 2000, 2000]), &mut terminal).unwrap();
    assert_eq!(termination, Termination::EndOfMemory);
    assert_eq!(machine.state(), State::Halted);
  }

  #[test]
  fn empty_cells_run_through_to_the_end_of_memory() {
    let mut machine  = Machine::new(5);
    let mut terminal = ScriptedTerminal::default();
    let termination  = machine.run_image(&image(&[1104, 0, 0, 0, 9]), &mut terminal).unwrap();
    assert_eq!(termination, Termination::EndOfMemory);
    assert_eq!(terminal.outputs(), vec![9]);
  }

  #[test]
  fn oversized_images_are_truncated() {
    let mut machine  = Machine::new(2);
    let mut terminal = ScriptedTerminal::default();
    let termination  = machine.run_image(&image(&[2000, 5000, 1234]), &mut terminal).unwrap();
    assert_eq!(termination, Termination::Halted);
    assert_eq!(machine.memory().cells(), &[2000, 5000]);
  }

  #[test]
  fn pause_offers_a_dump() {
    let (_, terminal, termination) = run(&[5100, 5000], &["y"]);
    assert_eq!(termination, Termination::Halted);
    assert!(terminal.transcript().iter().any(|line| line == &format!("{}y", PAUSE_PROMPT)));
    assert_eq!(terminal.transcript().iter().filter(|line| *line == "MEMORY:").count(), 2);

    let (_, terminal, _) = run(&[5100, 5000], &["n"]);
    assert_eq!(terminal.transcript().iter().filter(|line| *line == "MEMORY:").count(), 1);
  }

  #[test]
  fn interactive_entry() {
    let mut machine  = Machine::default();
    let mut terminal = ScriptedTerminal::new(vec!["1007", "junk", "1107", "5000", SENTINEL, "42"]);
    let termination  = machine.run(&mut terminal).unwrap();
    assert_eq!(termination, Termination::Halted);
    assert_eq!(terminal.outputs(), vec![42]);

    let transcript = terminal.transcript();
    assert!(transcript.iter().any(|line| line == "00 ? 1007"));
    assert!(transcript.iter().any(|line| line == "01 ? junk"));
    assert!(transcript.iter().any(|line| line == "01 ? 1107"));
    assert!(transcript.iter().any(|line| line == LOADING_COMPLETED));
  }

  #[test]
  fn entry_ends_when_input_does() {
    let mut machine  = Machine::default();
    let mut terminal = ScriptedTerminal::new(vec!["5000"]);
    assert_eq!(machine.run(&mut terminal).unwrap(), Termination::Halted);
  }

  #[test]
  fn halting_prints_the_dump() {
    let (machine, terminal, termination) = run(&[2003, 5000, 0, 17], &[]);
    assert_eq!(termination, Termination::Halted);
    let transcript = terminal.transcript();
    let ended = transcript.iter().position(|line| line == EXECUTION_ENDED).unwrap();
    assert_eq!(transcript[ended + 1], "REGISTERS:");
    assert!(transcript.iter().any(|line| line == "MEMORY:"));
    let dump = machine.dump();
    let dump_lines: Vec<&str> = dump.lines().collect();
    assert_eq!(transcript[ended + 1..], dump_lines[..]);
  }

  #[test]
  fn dump_shows_registers_and_memory() {
    let (machine, _, _) = run(&[2003, 5000, 0, 17], &[]);
    let dump = machine.dump();
    assert!(dump.starts_with("REGISTERS:"));
    assert!(dump.contains("accumulator"));
    assert!(dump.contains("+0017"));
    assert!(dump.contains("instructionRegister"));
    assert!(dump.contains("MEMORY:"));
  }
}
