use word_machine::compiler::{compile, Comparator};
use word_machine::{Image, Machine, ScriptedTerminal, Termination, Word};

/// Compiles `source`, runs it with `inputs` as the operator's answers, and returns what it printed.
fn run(source: &str, inputs: &[&str], optimize: bool) -> Vec<Word> {
  let mut compilation = compile(source).unwrap();
  if optimize {
    compilation.optimize();
  }
  let mut machine  = Machine::default();
  let mut terminal = ScriptedTerminal::new(inputs.iter().copied());
  let termination  = machine.run_image(&compilation.image, &mut terminal).unwrap();
  assert_eq!(termination, Termination::Halted, "{:?}", terminal.transcript());
  terminal.outputs()
}

fn run_both(source: &str, inputs: &[&str]) -> Vec<Word> {
  let plain     = run(source, inputs, false);
  let optimized = run(source, inputs, true);
  assert_eq!(plain, optimized);
  plain
}

#[test]
fn adds_two_numbers() {
  let source = "10 rem adds two numbers\n\
                20 input a\n\
                30 input b\n\
                40 let c = a + b\n\
                50 print c\n\
                60 end";
  assert_eq!(run_both(source, &["3", "4"]), vec![7]);
}

#[test]
fn counts_to_three() {
  let source = "10 for x = 1 to 3\n\
                20 print x\n\
                30 next\n\
                40 end";
  assert_eq!(run_both(source, &[]), vec![1, 2, 3]);
}

#[test]
fn nested_loops() {
  let source = "10 for i = 1 to 2\n\
                20 for j = 1 to 3\n\
                30 let p = i * j\n\
                40 print p\n\
                50 next j\n\
                60 next i\n\
                70 end";
  assert_eq!(run_both(source, &[]), vec![1, 2, 3, 2, 4, 6]);
}

#[test]
fn loop_bound_from_a_variable() {
  let source = "10 input n\n\
                20 let s = 0\n\
                30 for k = 1 to n\n\
                40 let s = s + k\n\
                50 next\n\
                60 print s\n\
                70 end";
  assert_eq!(run_both(source, &["10"]), vec![55]);
}

#[test]
fn precedence() {
  assert_eq!(run_both("10 let x = 2 + 3 * 4\n20 print x\n30 end", &[]), vec![14]);
  assert_eq!(run_both("10 let x = (2 + 3) * 4\n20 print x\n30 end", &[]), vec![20]);
  assert_eq!(run_both("10 let x = 20 - 6 - 4\n20 print x\n30 end", &[]), vec![10]);
  assert_eq!(run_both("10 let x = 7 / 2 * 2\n20 print x\n30 end", &[]), vec![6]);
}

#[test]
fn operands_keep_their_order() {
  let source = "10 input a\n\
                20 input b\n\
                30 input c\n\
                40 let d = a * b - c\n\
                50 print d\n\
                60 let e = c - a / b\n\
                70 print e\n\
                80 end";
  assert_eq!(run_both(source, &["6", "2", "5"]), vec![7, 2]);
}

#[test]
fn constants_after_an_expression_keep_their_value() {
  let source = "10 input a\n\
                20 input b\n\
                30 input c\n\
                40 input d\n\
                50 let x = a * b + c * d\n\
                60 let y = 7\n\
                70 print y\n\
                80 print x\n\
                90 end";
  assert_eq!(run_both(source, &["1", "1", "2", "3"]), vec![7, 7]);
}

#[test]
fn forward_goto_skips_code() {
  let source = "10 let x = 1\n\
                20 goto 50\n\
                30 print x\n\
                40 end\n\
                50 let x = 2\n\
                60 print x\n\
                70 end";
  assert_eq!(run_both(source, &[]), vec![2]);
}

#[test]
fn goto_a_remark_lands_on_the_next_statement() {
  let source = "10 input n\n\
                20 if n == 0 goto 60\n\
                30 print n\n\
                40 let n = n - 1\n\
                50 goto 20\n\
                60 rem done\n\
                70 end";
  assert_eq!(run_both(source, &["3"]), vec![3, 2, 1]);
}

#[test]
fn comparisons_branch_exactly_when_they_hold() {
  let comparators = [
    ("==", Comparator::Equal),
    ("!=", Comparator::NotEqual),
    ("<",  Comparator::Less),
    (">",  Comparator::Greater),
    ("<=", Comparator::LessOrEqual),
    (">=", Comparator::GreaterOrEqual),
  ];
  let pairs: [(Word, Word); 5] = [(1, 2), (2, 1), (3, 3), (-4, 0), (0, -4)];

  for (text, comparator) in comparators.iter() {
    let source = format!(
      "10 input a\n\
       20 input b\n\
       22 let z = 0\n\
       24 let o = 1\n\
       30 if a {} b goto 60\n\
       40 print z\n\
       50 end\n\
       60 print o\n\
       70 end",
      text
    );
    for (a, b) in pairs.iter() {
      let inputs = [a.to_string(), b.to_string()];
      let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
      let expected = if comparator.holds(*a, *b) { 1 } else { 0 };
      assert_eq!(run(&source, &inputs, false), vec![expected], "{} {} {}", a, text, b);
    }
  }
}

#[test]
fn pause_and_resume() {
  let compilation = compile("10 let x = 5\n20 pause\n30 print x\n40 end").unwrap();
  let mut machine  = Machine::default();
  let mut terminal = ScriptedTerminal::new(vec!["n"]);
  let termination  = machine.run_image(&compilation.image, &mut terminal).unwrap();
  assert_eq!(termination, Termination::Halted);
  assert_eq!(terminal.outputs(), vec![5]);
}

#[test]
fn store_clears_the_accumulator() {
  let compilation = compile("10 let x = 9\n20 end").unwrap();
  let mut machine  = Machine::default();
  let mut terminal = ScriptedTerminal::default();
  machine.run_image(&compilation.image, &mut terminal).unwrap();
  assert_eq!(machine.accumulator(), 0);
  assert_eq!(machine.memory().get(99), Ok(9));
}

#[test]
fn images_survive_the_text_format() {
  let mut compilation = compile("10 rem squares\n20 input a\n30 let b = a * a\n40 print b\n50 end").unwrap();
  compilation.optimize();
  let text  = compilation.image.to_string();
  let image = Image::parse(&text).unwrap();
  assert_eq!(image.description(), "squares");

  let mut machine  = Machine::default();
  let mut terminal = ScriptedTerminal::new(vec!["12"]);
  machine.run_image(&image, &mut terminal).unwrap();
  assert_eq!(terminal.outputs(), vec![144]);
}

#[test]
fn runtime_faults_are_reported() {
  let compilation = compile("10 input a\n20 let b = 10 / a\n30 print b\n40 end").unwrap();
  let mut machine  = Machine::default();
  let mut terminal = ScriptedTerminal::new(vec!["0"]);
  let termination  = machine.run_image(&compilation.image, &mut terminal).unwrap();
  assert!(matches!(termination, Termination::Faulted(_)));
  assert!(terminal.outputs().is_empty());
}
