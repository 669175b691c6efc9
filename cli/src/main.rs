use std::env;
use std::io;
use std::io::Write;
use std::process;

use mcfg::agenda::{parse_chart, BoundedAgendaStrategy};
use mcfg::grammar::Mode;
use mcfg::{Err, Grammar};

fn usage(prog_name: &str) -> String {
  format!(
    r"
Usage: {} FILE [options]

Options:
  -h, --help        Print this message
  -c, --chart       Print the saturated chart
  -n, --no-trees    Don't print parse trees, just the count (defaults to printing)
  -m, --mode MODE   \"recognize\" or \"parse\" (defaults to \"parse\")
  -b, --budget N    Cap the agenda loop at N steps; reports a timeout instead of hanging",
    prog_name
  )
}

fn run(g: &Grammar, sentence: &str, mode: Mode, print_chart: bool, print_trees: bool) {
  let tokens = sentence.split(' ').filter(|t| !t.is_empty()).collect::<Vec<_>>();

  if print_chart {
    let chart = parse_chart(g, &tokens);
    println!("chart:\n{}\n", chart);
  }

  match g.run(&tokens, mode) {
    mcfg::Outcome::Recognized(ok) => println!("{}", ok),
    mcfg::Outcome::Parsed(trees) => {
      println!("{} tree{}", trees.len(), if trees.len() == 1 { "" } else { "s" });
      if print_trees {
        for t in trees {
          println!("{}", t);
        }
      }
    }
    mcfg::Outcome::TimedOut => println!("(timed out)"),
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt::init();

  let opts: Vec<String> = env::args().collect();
  let prog_name = opts[0].clone();

  if opts.len() < 2 {
    println!("{}", usage(&prog_name));
    process::exit(1);
  }

  let mut opts = opts.into_iter().skip(1);
  let filename = opts.next().unwrap();

  let mut print_chart = false;
  let mut print_trees = true;
  let mut mode = Mode::Parse;
  let mut budget: Option<usize> = None;
  let mut opts = opts.peekable();
  while let Some(o) = opts.next() {
    if o == "-h" || o == "--help" {
      println!("{}", usage(&prog_name));
      process::exit(0);
    } else if o == "-c" || o == "--chart" {
      print_chart = true;
    } else if o == "-n" || o == "--no-trees" {
      print_trees = false;
    } else if o == "-m" || o == "--mode" {
      let value = opts.next().ok_or("--mode requires a value")?;
      mode = value.parse()?;
    } else if o == "-b" || o == "--budget" {
      let value = opts.next().ok_or("--budget requires a value")?;
      budget = Some(value.parse::<usize>().map_err(|e| format!("invalid --budget: {}", e))?);
    }
  }

  let mut g = Grammar::read_from_file(&filename)?;
  if let Some(steps) = budget {
    g = g.with_strategy(Box::new(BoundedAgendaStrategy { budget: steps }));
  }

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(0) => return Ok(()),
      Ok(_) => {
        input.make_ascii_lowercase();
        run(&g, input.trim(), mode, print_chart, print_trees);
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
