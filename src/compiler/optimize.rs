/*!
  Peephole optimization of compiled images.

  Expression code ends every operation with `STORE temp`, and the assignment that consumes the
  result starts with `LOAD temp`. Whenever a `STORE X` is immediately followed by `LOAD X` and
  another `STORE`, the first pair does nothing the final store does not: the value is already
  in the accumulator. The pair is removed, the rest of the code moves up by two words, and
  branches are retargeted to follow the instructions they pointed at.
*/

use std::collections::HashSet;

use tracing::debug;

use crate::bytecode::{Instruction, Opcode};
use crate::image::Image;
use crate::memory::Location;

/// Removes every redundant store/load pair. Returns the number of pairs removed.
pub fn optimize(image: &mut Image) -> usize {
  optimize_preserving(image, &HashSet::new())
}

/**
  Like `optimize`, but a store to any of the `preserved` locations is never removed. Stores to
  program variables must be kept since later statements read them.
*/
pub fn optimize_preserving(image: &mut Image, preserved: &HashSet<Location>) -> usize {
  let mut removed = 0;
  while let Some(index) = find_redundant_pair(image, preserved) {
    remove_pair(image, index);
    removed += 1;
  }
  removed
}

fn find_redundant_pair(image: &Image, preserved: &HashSet<Location>) -> Option<Location> {
  let code_end = image.code_end().min(image.len());
  let code     = &image.words()[..code_end];

  let branch_targets: HashSet<Location> =
    code.iter()
        .filter_map(|word| Instruction::decode(*word).ok())
        .filter(|instruction| instruction.opcode.is_branch())
        .map(|instruction| instruction.operand)
        .collect();

  code.windows(3)
      .enumerate()
      .find(|(index, window)| {
        // A jump straight to the load needs the load.
        if branch_targets.contains(&(index + 1)) {
          return false;
        }
        let decoded = (
          Instruction::decode(window[0]),
          Instruction::decode(window[1]),
          Instruction::decode(window[2]),
        );
        match decoded {
          (
            Ok(Instruction { opcode: Opcode::Store, operand: stored }),
            Ok(Instruction { opcode: Opcode::Load,  operand: loaded }),
            Ok(Instruction { opcode: Opcode::Store, .. }),
          ) => stored == loaded && !preserved.contains(&stored),
          _ => false
        }
      })
      .map(|(index, _)| index)
}

/// Deletes the words at `index` and `index + 1`.
fn remove_pair(image: &mut Image, index: Location) {
  let code_end = image.code_end().min(image.len());
  let words    = image.words_mut();

  words.copy_within(index + 2..code_end, index);
  words[code_end - 2] = 0;
  words[code_end - 1] = 0;

  for word in words[..code_end - 2].iter_mut() {
    let instruction = match Instruction::decode(*word) {
      Ok(instruction) if instruction.opcode.is_branch() => instruction,
      _                                                 => continue
    };
    let target = match instruction.operand {
      operand if operand > index + 1 => operand - 2,
      operand if operand >= index    => index,
      operand                        => operand
    };
    *word = Instruction::new(instruction.opcode, target).encode();
  }

  image.set_code_end(code_end - 2);
  debug!(location = index, "removed redundant store/load pair");
}


#[cfg(test)]
mod tests {
  use super::*;

  fn compiled(words: &[i32], size: usize) -> Image {
    let mut image = Image::with_size(size);
    for (location, word) in words.iter().enumerate() {
      image.emit(location, *word);
    }
    image
  }

  #[test]
  fn removes_store_load_pairs() {
    // READ 99; READ 98; LOAD 99; ADD 98; STORE 96; LOAD 96; STORE 97; WRITE 97; HALT
    let mut image = compiled(&[1099, 1098, 2099, 3298, 2196, 2096, 2197, 1197, 5000], 100);
    assert_eq!(optimize(&mut image), 1);
    assert_eq!(&image.words()[..9], &[1099, 1098, 2099, 3298, 2197, 1197, 5000, 0, 0]);
    assert_eq!(image.code_end(), 7);
  }

  #[test]
  fn retargets_branches() {
    // 00 LOAD 90; 01 STORE 91; 02 LOAD 91; 03 STORE 92; 04 BRANCHNEG 06; 05 BRANCH 00; 06 HALT
    let mut image = compiled(&[2090, 2191, 2091, 2192, 4106, 4000, 5000], 100);
    assert_eq!(optimize(&mut image), 1);
    assert_eq!(&image.words()[..5], &[2090, 2192, 4104, 4000, 5000]);
  }

  #[test]
  fn branches_to_the_removed_store_move_to_its_successor() {
    // 00 BRANCH 02; 01 HALT; 02 STORE 91; 03 LOAD 91; 04 STORE 92; 05 BRANCH 01
    let mut image = compiled(&[4002, 5000, 2191, 2091, 2192, 4001], 100);
    assert_eq!(optimize(&mut image), 1);
    assert_eq!(&image.words()[..4], &[4002, 5000, 2192, 4001]);
  }

  #[test]
  fn keeps_pairs_entered_by_a_branch() {
    // The load at 02 is a branch target.
    let mut image = compiled(&[2090, 2191, 2091, 2192, 4002, 5000], 100);
    assert_eq!(optimize(&mut image), 0);
  }

  #[test]
  fn preserved_locations() {
    let mut image = compiled(&[2099, 2197, 2097, 2196, 5000], 100);
    let preserved: HashSet<Location> = vec![97].into_iter().collect();
    assert_eq!(optimize_preserving(&mut image, &preserved), 0);
    assert_eq!(optimize(&mut image), 1);
  }

  #[test]
  fn runs_to_a_fixed_point() {
    // Two chained temporaries.
    let mut image = compiled(&[2099, 2190, 2090, 2191, 2091, 2192, 5000], 100);
    assert_eq!(optimize(&mut image), 2);
    assert_eq!(&image.words()[..3], &[2099, 2192, 5000]);
    assert_eq!(optimize(&mut image), 0);
  }

  #[test]
  fn data_after_the_code_is_untouched() {
    let mut image = compiled(&[2199, 2099, 2198, 5000], 100);
    image.set(99, 4000);
    optimize(&mut image);
    assert_eq!(image.get(99), Some(4000));
    assert_eq!(image.len(), 100);
  }
}
