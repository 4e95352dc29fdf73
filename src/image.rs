/*!
  An `Image` is the location-indexed sequence of words the compiler produces and the machine
  loads, together with a free-text description of the program.

  The textual form of an image has one memory cell per line, `<location> <word>`, with words
  written the way memory dumps write them. Location `-1` is reserved for the description:
  ```text
  -1 Adds two numbers
  00 +1099
  01 +1098
  02 +2099
  ```
  A bare list of words, one per line, is accepted as well. There a line that is not a number
  is taken as the description.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  character::complete::{
    digit1,
    one_of,
    space0,
    space1
  },
  combinator::{all_consuming, map_res, opt, recognize, rest},
  sequence::{pair, terminated},
  IResult
};
use thiserror::Error;

use crate::bytecode::{format_word, in_word_range, Instruction, Opcode, Word};
use crate::memory::Location;

/// Images larger than this are certainly not meant for the machine.
const MAX_IMAGE_LOCATION: i64 = 9999;

#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ImageError {
  #[error("line {line}: cannot read `{text}` as a location and a word")]
  Malformed { line: usize, text: String },
  #[error("line {line}: {value} does not fit in a word")]
  WordOutOfRange { line: usize, value: i64 },
  #[error("line {line}: location {location} is not a valid image location")]
  LocationOutOfRange { line: usize, location: i64 },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Image {
  words       : Vec<Word>,
  description : String,
  // One past the last location written through `emit`.
  code_len    : usize,
}

impl Image {

  pub fn new() -> Image {
    Image::default()
  }

  /// An image of `size` zero words, as the compiler starts from.
  pub fn with_size(size: usize) -> Image {
    Image {
      words: vec![0; size],
      ..Image::default()
    }
  }

  pub fn with_description(mut self, description: &str) -> Image {
    self.set_description(description);
    self
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn set_description(&mut self, description: &str) {
    self.description = description.trim().to_string();
  }

  /// Appends a word after the last location.
  pub fn push(&mut self, word: Word) -> &mut Image {
    self.words.push(word);
    self
  }

  /// Overwrites the word at `location`, growing the image with zeros if it is too short.
  pub fn set(&mut self, location: Location, word: Word) {
    if location >= self.words.len() {
      self.words.resize(location + 1, 0);
    }
    self.words[location] = word;
  }

  /// Writes an instruction word into the code region, extending the region to cover it.
  pub fn emit(&mut self, location: Location, word: Word) {
    self.set(location, word);
    self.code_len = self.code_len.max(location + 1);
  }

  pub fn get(&self, location: Location) -> Option<Word> {
    self.words.get(location).copied()
  }

  pub fn words(&self) -> &[Word] {
    &self.words
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  /**
    One past the last instruction of the program. Images built by the compiler know this
    exactly. For any other image the code is assumed to end with its last `HALT`.
  */
  pub fn code_end(&self) -> Location {
    if self.code_len > 0 {
      return self.code_len;
    }
    self.words
        .iter()
        .rposition(|word| {
          matches!(Instruction::decode(*word), Ok(Instruction { opcode: Opcode::Halt, .. }))
        })
        .map_or(0, |halt| halt + 1)
  }

  pub(crate) fn words_mut(&mut self) -> &mut [Word] {
    &mut self.words
  }

  pub(crate) fn set_code_end(&mut self, code_end: Location) {
    self.code_len = code_end;
  }

  /// Assembly listing of the code region, one instruction per line.
  pub fn disassemble(&self) -> String {
    let mut buffer = String::new();
    for (location, word) in self.words.iter().enumerate().take(self.code_end()) {
      let text = match Instruction::decode(*word) {
        Ok(instruction) => format!("{}", instruction),
        Err(_)          => "data".to_string()
      };
      buffer.push_str(format!("{:02}  {:>6}  % {}\n", location, format_word(*word), text).as_str());
    }
    buffer
  }

  /// Reads the textual form of an image. See the module documentation for the format.
  pub fn parse(text: &str) -> Result<Image, ImageError> {
    let lines: Vec<(usize, &str)> =
      text.lines()
          .enumerate()
          .map(|(i, line)| (i + 1, line.trim()))
          .filter(|(_, line)| !line.is_empty())
          .collect();

    let mut image = Image::new();
    for (line, content) in lines {
      // A line is located when a number is followed by a second field.
      match located_line(content) {

        Ok((_, (location, remainder))) => {
          if location == -1 {
            image.set_description(remainder);
            continue;
          }
          if location < 0 || location > MAX_IMAGE_LOCATION {
            return Err(ImageError::LocationOutOfRange { line, location });
          }
          let word = read_word(line, remainder)?
              .ok_or_else(|| ImageError::Malformed { line, text: content.to_string() })?;
          image.set(location as Location, word);
        }

        Err(_) => {
          match read_word(line, content)? {
            Some(word) => { image.push(word); }
            None       => image.set_description(content)
          }
        }

      } // end match located_line
    }

    Ok(image)
  }
}

impl Display for Image {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if !self.description.is_empty() {
      writeln!(f, "-1 {}", self.description)?;
    }
    let lines: Vec<String> =
      self.words
          .iter()
          .enumerate()
          .map(|(location, word)| format!("{:02} {}", location, format_word(*word)))
          .collect();
    write!(f, "{}", lines.join("\n"))
  }
}

impl FromStr for Image {
  type Err = ImageError;

  fn from_str(text: &str) -> Result<Image, ImageError> {
    Image::parse(text)
  }
}

// region Parsers

fn signed_number(input: &str) -> IResult<&str, i64> {
  map_res(
    recognize(pair(opt(one_of("+-")), digit1)),
    |text: &str| text.parse::<i64>()
  )(input)
}

/// `<location> <rest of line>`
fn located_line(input: &str) -> IResult<&str, (i64, &str)> {
  pair(terminated(signed_number, space1), rest)(input)
}

/// Reads a lone word. `Ok(None)` means the text is not a number at all.
fn read_word(line: usize, text: &str) -> Result<Option<Word>, ImageError> {
  let parsed: IResult<&str, i64> = all_consuming(terminated(signed_number, space0))(text.trim());
  match parsed {

    Ok((_, value)) if in_word_range(value) => Ok(Some(value as Word)),

    Ok((_, value))                          => Err(ImageError::WordOutOfRange { line, value }),

    Err(_)                                  => Ok(None)

  }
}

// endregion
