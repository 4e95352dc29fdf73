/*!
  The operator's terminal. The machine never touches stdin or stdout directly; every prompt,
  answer and line of output goes through a `Terminal`, so a session can be driven from the
  console, from a file of canned answers, or from a test.
*/

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::bytecode::Word;

/// Prefix of every line a `WRITE` instruction produces.
pub const OUTPUT_PREFIX: &str = "output:  ";

pub trait Terminal {
  /**
    Shows `prompt` and reads one line of input without its line terminator. `Ok(None)` means
    the input is exhausted.
  */
  fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

  fn write_line(&mut self, text: &str) -> io::Result<()>;
}

/// The process's standard input and output.
pub struct StdTerminal {
  stdin  : io::Stdin,
  stdout : io::Stdout,
}

impl StdTerminal {
  pub fn new() -> StdTerminal {
    StdTerminal {
      stdin  : io::stdin(),
      stdout : io::stdout(),
    }
  }
}

impl Default for StdTerminal {
  fn default() -> StdTerminal {
    StdTerminal::new()
  }
}

impl Terminal for StdTerminal {
  fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
    {
      let mut out = self.stdout.lock();
      out.write_all(prompt.as_bytes())?;
      out.flush()?;
    }

    let mut buffer = String::new();
    match self.stdin.lock().read_line(&mut buffer)? {
      0 => Ok(None),
      _ => Ok(Some(buffer.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
  }

  fn write_line(&mut self, text: &str) -> io::Result<()> {
    writeln!(self.stdout.lock(), "{}", text)
  }
}

/**
  Answers prompts from a fixed list of lines and records everything shown to the operator.
  Prompts are recorded together with the answer they received, the way they would appear on a
  console.
*/
#[derive(Clone, Debug, Default)]
pub struct ScriptedTerminal {
  inputs     : VecDeque<String>,
  transcript : Vec<String>,
}

impl ScriptedTerminal {
  pub fn new<I, S>(inputs: I) -> ScriptedTerminal
    where I: IntoIterator<Item = S>,
          S: Into<String>
  {
    ScriptedTerminal {
      inputs     : inputs.into_iter().map(Into::into).collect(),
      transcript : Vec::new(),
    }
  }

  /// Lines of a file or string become the scripted answers.
  pub fn from_text(text: &str) -> ScriptedTerminal {
    ScriptedTerminal::new(text.lines().map(str::trim))
  }

  pub fn transcript(&self) -> &[String] {
    &self.transcript
  }

  /// The values printed by `WRITE` instructions, in order.
  pub fn outputs(&self) -> Vec<Word> {
    self.transcript
        .iter()
        .filter_map(|line| line.strip_prefix(OUTPUT_PREFIX))
        .filter_map(|value| value.trim().parse::<Word>().ok())
        .collect()
  }

  /// Answers not yet consumed.
  pub fn remaining(&self) -> usize {
    self.inputs.len()
  }
}

impl Terminal for ScriptedTerminal {
  fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
    let answer = self.inputs.pop_front();
    match &answer {
      Some(line) => self.transcript.push(format!("{}{}", prompt, line)),
      None       => self.transcript.push(prompt.to_string())
    }
    Ok(answer)
  }

  fn write_line(&mut self, text: &str) -> io::Result<()> {
    self.transcript.extend(text.lines().map(str::to_string));
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn answers_in_order_then_runs_dry() {
    let mut terminal = ScriptedTerminal::new(vec!["3", "4"]);
    assert_eq!(terminal.read_line("? ").unwrap(), Some("3".to_string()));
    assert_eq!(terminal.remaining(), 1);
    assert_eq!(terminal.read_line("? ").unwrap(), Some("4".to_string()));
    assert_eq!(terminal.read_line("? ").unwrap(), None);
    assert_eq!(terminal.transcript(), &["? 3", "? 4", "? "]);
  }

  #[test]
  fn collects_outputs() {
    let mut terminal = ScriptedTerminal::default();
    terminal.write_line("*** Program execution begins ***").unwrap();
    terminal.write_line(&format!("{}{}", OUTPUT_PREFIX, 7)).unwrap();
    terminal.write_line(&format!("{}{}\nnext line", OUTPUT_PREFIX, -12)).unwrap();
    assert_eq!(terminal.outputs(), vec![7, -12]);
    assert_eq!(terminal.transcript().len(), 4);
  }

  #[test]
  fn script_from_text() {
    let mut terminal = ScriptedTerminal::from_text("1\n  2 \n");
    assert_eq!(terminal.read_line("").unwrap(), Some("1".to_string()));
    assert_eq!(terminal.read_line("").unwrap(), Some("2".to_string()));
    assert_eq!(terminal.read_line("").unwrap(), None);
  }
}
