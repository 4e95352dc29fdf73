use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use word_machine::compiler::Compiler;
use word_machine::memory::DEFAULT_MEMORY_SIZE;
use word_machine::{Compilation, Image, Machine, ScriptedTerminal, StdTerminal, Terminal, Termination};

#[derive(Parser, Debug)]
#[command(name = "wm")]
#[command(about = "Compile and run programs for the word machine", long_about = None)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Compile a source program into an image
  Compile {
    source: PathBuf,

    /// Remove redundant store/load pairs
    #[arg(long)]
    optimize: bool,

    /// Write the image here instead of printing it
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also print the disassembly and the symbol table
    #[arg(long)]
    listing: bool,

    /// Words of memory to compile for
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory: usize,
  },

  /// Load an image file and run it
  Run {
    image: PathBuf,

    /// Answer prompts from this file instead of the console
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Words of machine memory
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory: usize,
  },

  /// Compile a source program and run it
  Exec {
    source: PathBuf,

    /// Remove redundant store/load pairs
    #[arg(long)]
    optimize: bool,

    /// Answer prompts from this file instead of the console
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
  },

  /// Enter a program word by word and run it
  Enter {
    /// Words of machine memory
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory: usize,
  },
}

fn main() -> Result<()> {
  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let args = Args::parse();

  match args.command {

    Command::Compile { source, optimize, output, listing, memory } => {
      let compilation = compile_file(&source, memory, optimize)?;
      match output {
        Some(path) => {
          fs::write(&path, format!("{}\n", compilation.image))
              .with_context(|| format!("cannot write {}", path.display()))?;
        }
        None => println!("{}", compilation.image)
      }
      if listing {
        println!("\n{}", compilation.listing());
      }
    }

    Command::Run { image, input, memory } => {
      let text = fs::read_to_string(&image)
          .with_context(|| format!("cannot read {}", image.display()))?;
      let image = Image::parse(&text)
          .with_context(|| format!("{} is not a valid image", image.display()))?;
      let mut machine = Machine::new(memory);
      run_with(input.as_deref(), |terminal| machine.run_image(&image, terminal))?;
    }

    Command::Exec { source, optimize, input } => {
      let compilation = compile_file(&source, DEFAULT_MEMORY_SIZE, optimize)?;
      let mut machine = Machine::default();
      run_with(input.as_deref(), |terminal| machine.run_image(&compilation.image, terminal))?;
    }

    Command::Enter { memory } => {
      let mut machine = Machine::new(memory);
      run_with(None, |terminal| machine.run(terminal))?;
    }

  } // end match command

  Ok(())
}

fn compile_file(source: &Path, memory: usize, optimize: bool) -> Result<Compilation> {
  let text = fs::read_to_string(source)
      .with_context(|| format!("cannot read {}", source.display()))?;
  let mut compilation = Compiler::new(memory)
      .compile(&text)
      .with_context(|| format!("cannot compile {}", source.display()))?;
  if optimize {
    let removed = compilation.optimize();
    eprintln!("Removed {} redundant instruction pairs.", removed);
  }
  Ok(compilation)
}

/// Runs `session` against the console, or against the answers in `input` if given.
fn run_with<F>(input: Option<&Path>, session: F) -> Result<()>
  where F: FnOnce(&mut dyn Terminal) -> std::io::Result<Termination>
{
  let termination = match input {

    Some(path) => {
      let answers = fs::read_to_string(path)
          .with_context(|| format!("cannot read {}", path.display()))?;
      let mut terminal = ScriptedTerminal::from_text(&answers);
      let termination = session(&mut terminal);
      for line in terminal.transcript() {
        println!("{}", line);
      }
      termination?
    }

    None => session(&mut StdTerminal::new())?

  };

  if let Termination::Faulted(fault) = termination {
    anyhow::bail!("program stopped: {}", fault);
  }
  Ok(())
}
