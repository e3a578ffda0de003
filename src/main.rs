use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossfill::{Crossword, CrosswordSolver, SolverConfig};
use instant::Duration;

/// Fill a crossword grid with words from a word list.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Grid structure file, with `_` for open cells and anything else for blocks.
    structure: PathBuf,

    /// Word list, one word per line.
    words: PathBuf,

    /// Give up after this many milliseconds.
    #[arg(long, value_name = "MS")]
    time_limit_ms: Option<u64>,

    /// Re-run arc consistency after every choice during search.
    #[arg(long)]
    inference: bool,

    /// Print statistics about the fill.
    #[arg(long)]
    stats: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let crossword = Crossword::from_files(&args.structure, &args.words).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });

    let config = SolverConfig {
        time_limit: args.time_limit_ms.map(Duration::from_millis),
        inference: args.inference,
    };
    let mut solver = CrosswordSolver::with_config(&crossword, config);

    match solver.solve() {
        Some(assignment) => print!("{assignment}"),
        None => println!("No solution."),
    }

    if args.stats {
        println!("{:?}", solver.statistics());
    }
}
