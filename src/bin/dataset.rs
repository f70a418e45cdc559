use anyhow::{Context, Result};
use chess::ALL_PIECES;
use chess_dataset::{
    best_move_kinds, dense_state, Board, Dataset, DatasetConfig, GeneratorKind, TensorSet,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Build training tensors from recorded chess games",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load cached arrays for a generator, building them on a miss
    Cache {
        /// PGN file (optionally .gz) or EPD suite
        source: PathBuf,

        /// Generator name, e.g. random_black_state
        #[arg(short, long)]
        generator: String,

        /// Use the 27-channel influence features
        #[arg(long)]
        featurized: bool,

        /// Rebuild even when a cache exists
        #[arg(long)]
        refresh: bool,

        /// JSON dataset configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Pull items from a generator and log a summary of each
    Stream {
        source: PathBuf,

        #[arg(short, long)]
        generator: String,

        /// Stop after this many items
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Rewind to the first game at end of file
        #[arg(long = "loop")]
        loop_forever: bool,

        #[arg(long)]
        featurized: bool,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the tensor of one position channel by channel
    Encode {
        #[arg(long)]
        fen: String,

        #[arg(long)]
        featurized: bool,
    },

    /// Load a strategic test suite and count best moves per piece kind
    Suite {
        epd: PathBuf,

        #[arg(long)]
        featurized: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<DatasetConfig> {
    match path {
        Some(path) => DatasetConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(DatasetConfig::default()),
    }
}

fn shape_of(array: &ndarray::ArrayD<f32>) -> String {
    format!("{:?}", array.shape())
}

fn print_set(kind: GeneratorKind, set: &TensorSet) {
    println!("{}: {} samples", kind, set.len());
    println!("  X  {}", shape_of(&set.x));
    println!("  y  {}", shape_of(&set.y));
    if let Some(y2) = &set.y2 {
        println!("  y2 {}", shape_of(y2));
    }
}

fn stream(dataset: &Dataset, kind: GeneratorKind, featurized: bool, limit: usize) -> Result<()> {
    let featurized = kind.featurized(featurized);
    match kind {
        GeneratorKind::RandomWhiteState => {
            for (i, sample) in dataset.random_white_states(featurized)?.take(limit).enumerate() {
                let sample = sample?;
                info!(
                    "#{}: ply {} action {} outcome {}",
                    i, sample.ply, sample.action, sample.outcome
                );
            }
        }
        GeneratorKind::RandomBlackState => {
            for (i, sample) in dataset.random_black_states(featurized)?.take(limit).enumerate() {
                let sample = sample?;
                info!(
                    "#{}: ply {} moves remaining {} reward {:.4}",
                    i, sample.ply, sample.moves_remaining, sample.reward
                );
            }
        }
        GeneratorKind::WhiteSarsa => {
            for (i, transition) in dataset.transitions()?.take(limit).enumerate() {
                let t = transition?;
                info!(
                    "#{}: action {} reward {} next action {:?}{}",
                    i,
                    t.action,
                    t.reward,
                    t.next_action,
                    if t.new_game { " (new game)" } else { "" }
                );
            }
        }
        GeneratorKind::StrategicTestSuite => {
            let suite = dataset.strategic_test_suite(featurized)?;
            for (i, id) in suite.ids.iter().take(limit).enumerate() {
                info!("#{}: {}", i, id.as_deref().unwrap_or("(no id)"));
            }
        }
        _ => {
            for (i, batch) in dataset.state_action_batches(featurized)?.take(limit).enumerate() {
                let batch = batch?;
                info!(
                    "#{}: batch of {} states {:?} ({:?} labels)",
                    i,
                    batch.len(),
                    batch.states.shape(),
                    kind.action_labels()
                );
            }
        }
    }
    Ok(())
}

fn encode(fen: &str, featurized: bool) -> Result<()> {
    let board = Board::from_fen(fen).with_context(|| format!("parsing FEN '{}'", fen))?;
    let tensor = dense_state(&board.position(), featurized);
    for (channel, plane) in tensor.outer_iter().enumerate() {
        println!("channel {}", channel);
        // row 7 is rank 8
        for row in plane.outer_iter().rev() {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>2}", v)).collect();
            println!("  {}", cells.join(" "));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Cache {
            source,
            generator,
            featurized,
            refresh,
            config,
        } => {
            let kind: GeneratorKind = generator.parse()?;
            let dataset = Dataset::new(&source, load_config(config.as_ref())?);
            let set = dataset
                .load(kind, featurized, refresh)
                .with_context(|| format!("caching {} for {}", kind, source.display()))?;
            print_set(kind, &set);
        }
        Command::Stream {
            source,
            generator,
            limit,
            loop_forever,
            featurized,
            config,
        } => {
            let kind: GeneratorKind = generator.parse()?;
            let config = load_config(config.as_ref())?.with_loop(loop_forever);
            let dataset = Dataset::new(&source, config);
            stream(&dataset, kind, featurized, limit)
                .with_context(|| format!("streaming {} from {}", kind, source.display()))?;
        }
        Command::Encode { fen, featurized } => encode(&fen, featurized)?,
        Command::Suite { epd, featurized } => {
            let dataset = Dataset::new(&epd, DatasetConfig::default());
            let suite = dataset
                .strategic_test_suite(featurized)
                .with_context(|| format!("loading test suite {}", epd.display()))?;
            println!("{} positions, states {:?}", suite.len(), suite.states.shape());
            for (piece, count) in ALL_PIECES.iter().zip(best_move_kinds(&suite)) {
                println!("  {:?}: {}", piece, count);
            }
        }
    }
    Ok(())
}
