use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use gridfill::solver::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};
use gridfill::{fill, fill_generated, FillOptions, FillSuccess, GridSpec, Lexicon};

/// Crossword grid filler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid template file: '#' for black squares, '.' for open cells, letters to pin
    template: Option<PathBuf>,

    /// JSON grid specification file (overrides the template)
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Side length of a generated square grid
    #[arg(short, long, default_value_t = 5)]
    size: usize,

    /// Width of a generated grid (defaults to --size)
    #[arg(long)]
    width: Option<usize>,

    /// Height of a generated grid (defaults to --size)
    #[arg(long)]
    height: Option<usize>,

    /// Extra entry list (entry;score per line) merged into the built-in words
    #[arg(short, long)]
    word_list: Option<PathBuf>,

    /// Minimum word score
    #[arg(short = 'm', long, default_value_t = 50)]
    min_score: i32,

    /// Seed for a reproducible fill
    #[arg(long)]
    seed: Option<u64>,

    /// Per-attempt time limit in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Number of attempts before giving up
    #[arg(short, long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    attempts: usize,

    /// Skip the arc-consistency pass before searching
    #[arg(long)]
    no_arc_consistency: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let debug_enabled = std::env::var("GRIDFILL_DEBUG").is_ok();
    gridfill::log::init_logger(debug_enabled);

    if let Err(e) = try_main() {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut lexicon = Lexicon::builtin();
    if let Some(path) = &cli.word_list {
        let added = lexicon.merge_word_list(&fs::read_to_string(path)?)?;
        log::info!("merged {added} entries from {}", path.display());
    }

    let options = FillOptions {
        timeout: Duration::from_millis(cli.timeout_ms),
        max_attempts: cli.attempts,
        arc_consistency: !cli.no_arc_consistency,
    };

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let spec = if let Some(path) = &cli.spec {
        Some(serde_json::from_str::<GridSpec>(&fs::read_to_string(path)?)?)
    } else if let Some(path) = &cli.template {
        Some(GridSpec::from_template(&fs::read_to_string(path)?)?.with_min_word_score(cli.min_score))
    } else {
        None
    };

    let success = match spec {
        Some(spec) => fill(&spec, &lexicon, &options, &mut rng)?,
        None => {
            let width = cli.width.unwrap_or(cli.size);
            let height = cli.height.unwrap_or(cli.size);
            fill_generated(width, height, cli.min_score, &lexicon, &options, &mut rng)?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&success)?);
    } else {
        print_fill(&success);
    }

    Ok(())
}

fn print_fill(success: &FillSuccess) {
    println!("{}", success.grid.render());
    println!();

    for entry in &success.grid.entries {
        println!(
            "{:>8} {:<6} {} ({})",
            entry.slot.start.to_string(),
            entry.slot.direction.to_string(),
            entry.word,
            entry.score
        );
    }

    let stats = &success.statistics;
    eprintln!(
        "Filled in {:.3}s: {} attempt(s), {} states, {} backtracks.",
        stats.duration.as_secs_f64(),
        stats.attempts,
        stats.states,
        stats.backtracks
    );
}
