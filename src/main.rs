use std::hint::black_box;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use nnue_eval::board::fen::STARTPOS;
use nnue_eval::board::Board;
use nnue_eval::evaluation::arch::Arch;
use nnue_eval::evaluation::network::Network;
use nnue_eval::evaluation::NNUE;
use nnue_eval::score::format_score;
use nnue_eval::wdl::{self, Wdl};

const BENCH_FENS: [&str; 8] = [
    STARTPOS,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "r1bq1rk1/pp2nppp/2n1p3/3pP3/1b1P4/2NB1N2/PP3PPP/R1BQK2R w KQ - 4 9",
    "2kr3r/ppp2ppp/2n5/2b1p3/4P1n1/2NP1N2/PPP1BPPP/R1BQ1RK1 w - - 3 11",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 12 40",
    "8/5k2/3p4/1p1Pp2p/pP2Pp1P/P4P1K/8/8 b - - 0 50",
    "4k3/8/8/8/8/8/8/4K2Q w - - 0 1",
];

#[derive(Parser)]
#[command(name = "nnue-eval")]
#[command(about = "Evaluate chess positions with a quantised NNUE network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the score and win/draw/loss estimate of each position
    Eval {
        /// Network weight file
        #[arg(short, long)]
        net: PathBuf,

        /// Positions to evaluate (default: the start position)
        #[arg(short, long)]
        fen: Vec<String>,
    },

    /// Time accumulator refreshes and evaluations over a fixed set of positions
    Bench {
        /// Network weight file; a seeded random network is used when absent
        #[arg(short, long)]
        net: Option<PathBuf>,

        /// Evaluations per position
        #[arg(short, long, default_value_t = 10_000)]
        iterations: usize,
    },
}

fn load_network(path: Option<&Path>) -> Result<Arc<Network>> {
    let arch = Arch::default();
    let network = match path {
        Some(path) => Network::load(path, arch)
            .with_context(|| format!("failed to load network from {}", path.display()))?,
        None => {
            log::warn!("no network given, using random weights");
            Network::random(arch, 0xbe7c4)?
        }
    };
    Ok(Arc::new(network))
}

fn eval(net: &Path, fens: &[String]) -> Result<()> {
    let network = load_network(Some(net))?;
    let mut nnue = NNUE::new(network);

    let fens: Vec<&str> = if fens.is_empty() {
        vec![STARTPOS]
    } else {
        fens.iter().map(String::as_str).collect()
    };

    for fen in fens {
        let board = Board::from_fen(fen).with_context(|| format!("invalid fen '{fen}'"))?;
        nnue.activate(&board);
        let score = nnue.evaluate(&board);
        let material = wdl::material(&board);
        let Wdl { win, draw, loss } = Wdl::from_score(score, material);

        println!("fen {fen}");
        println!("raw {score} score {} wdl {win} {draw} {loss}", format_score(score, material));
    }
    Ok(())
}

fn bench(net: Option<&Path>, iterations: usize) -> Result<()> {
    let network = load_network(net)?;
    let mut nnue = NNUE::new(network);

    let boards = BENCH_FENS
        .iter()
        .map(|fen| Board::from_fen(fen).with_context(|| format!("invalid bench fen '{fen}'")))
        .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();
    let mut evals = 0u64;
    for board in &boards {
        nnue.activate(board);
        for _ in 0..iterations {
            black_box(nnue.evaluate(black_box(board)));
            evals += 1;
        }
    }
    let elapsed = start.elapsed();

    let ms = elapsed.as_millis().max(1);
    println!("info evals {evals}");
    println!("info ms {ms}");
    println!("info eps {}", evals as u128 * 1000 / ms);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Eval { net, fen } => eval(net, fen),
        Command::Bench { net, iterations } => bench(net.as_deref(), *iterations),
    }
}
