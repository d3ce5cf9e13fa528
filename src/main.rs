//! The minimal CLI front-end: decodes positional arguments into `NUM`
//! links, builds a call to `Main`, normalizes it, and prints the readback
//! plus (optionally) rewrite statistics. A surface-syntax parser, a rule
//! compiler, and pre-reduction transform passes live upstream of this crate.

use clap::Parser;
use hvmr::gen;
use hvmr::heap::{DEFAULT_HEAP_WORDS, ROOT};
use hvmr::link::Lnk;
use hvmr::readback::readback;
use hvmr::runtime::{Runtime, RuntimeConfig};
use hvmr::util::parse_abbrev_number;
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about = "A parallel interaction-net reduction runtime")]
struct RuntimeOpts {
  #[arg(short = 's', long = "stats")]
  /// Show rewrite-count and timing statistics.
  show_stats: bool,
  #[arg(short = '1', long = "single")]
  /// Single-core mode (no parallelism).
  single_core: bool,
  #[arg(short = 'w', long = "workers")]
  /// Number of workers to use. Defaults to the available parallelism.
  workers: Option<usize>,
  #[arg(short = 'm', long = "memory", value_parser = parse_abbrev_number::<usize>)]
  /// How much memory to allocate on startup. Supports abbreviations such as
  /// '4G' or '400M'.
  memory: Option<usize>,
  /// Arguments passed to `Main`, each decoded as a decimal NUM (a token not
  /// starting with a digit decodes to NUM 0).
  args: Vec<String>,
}

fn main() {
  let opts = RuntimeOpts::parse();

  let workers = if opts.single_core { 1 } else { opts.workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)) };
  let heap_words = opts.memory.unwrap_or(DEFAULT_HEAP_WORDS);

  let program = gen::demo_program();
  let Some(main_id) = program.fun_id_by_name("Main") else {
    eprintln!("generated rule table has no `Main` function");
    process::exit(1);
  };
  let arity = program.fun(main_id).expect("looked up by id we just found").arity;

  let runtime = match Runtime::new(program, RuntimeConfig { heap_words, workers }) {
    Ok(runtime) => runtime,
    Err(e) => {
      eprintln!("{e}");
      process::exit(1);
    }
  };

  // The call's own argument block sits right after its root word, mirroring
  // the layout the original C front-end relied on (`mem.node[0]` is the
  // call link, `mem.node[1..]` its arguments). `normalize` is told exactly
  // how many of those words are already occupied so worker 0's allocator
  // never bump-allocates back over live argument data.
  for i in 0..arity {
    let value = opts.args.get(i as usize).map_or(Lnk::num_val(0), |tok| Lnk::num_val(parse_arg(tok)));
    runtime.heap.set(1 + i, value);
  }
  let args_loc = if arity == 0 { 0 } else { 1 };
  runtime.set_root(Lnk::fun(main_id, args_loc));

  let (stats, _root) = runtime.normalize(arity);
  println!("{}", readback(&runtime.heap, &runtime.program, ROOT));
  if opts.show_stats {
    stats.print();
  }
}

/// Mirrors the original front-end's `parse_arg`: a leading digit decodes the
/// whole token as decimal; anything else becomes `0`.
fn parse_arg(token: &str) -> u64 {
  if token.as_bytes().first().is_some_and(u8::is_ascii_digit) {
    token.parse().unwrap_or(0)
  } else {
    0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_arg_decodes_leading_digits() {
    assert_eq!(parse_arg("42"), 42);
    assert_eq!(parse_arg("007"), 7);
  }

  #[test]
  fn parse_arg_defaults_non_numeric_to_zero() {
    assert_eq!(parse_arg("x"), 0);
    assert_eq!(parse_arg(""), 0);
  }
}
