use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "danmaku-cli")]
#[command(about = "Declarative bullet patterns: check and run")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate pattern files.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, short)]
        verbose: bool,
    },
    /// Run the simulation loop headless.
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "pattern")]
        patterns: Vec<PathBuf>,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long)]
        dt: Option<f64>,
        /// 0 = auto, 1 = sequential
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long = "diag-jsonl", alias = "diag")]
        diag_jsonl: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, short)]
        quiet: bool,
    },
    /// List the bundled patterns.
    Patterns,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { files, verbose } => {
            let args = cli::check::CheckArgs { verbose };
            let mut failed = false;
            for file in &files {
                match cli::check::run(file, &args) {
                    Ok(report) => {
                        for line in report.ok {
                            println!("{}", line);
                        }
                        for line in &report.errors {
                            eprintln!("{}", line);
                        }
                        failed |= !report.errors.is_empty();
                    }
                    Err(err) => {
                        eprintln!("{}", err);
                        failed = true;
                    }
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Run {
            config,
            patterns,
            seed,
            ticks,
            dt,
            threads,
            diag_jsonl,
            out,
            quiet,
        } => {
            let seed = match seed.as_deref().map(cli::config::parse_seed).transpose() {
                Ok(seed) => seed,
                Err(message) => {
                    eprintln!("E_CLI_BAD_SEED {}", message);
                    std::process::exit(1);
                }
            };
            let options = cli::run::RunOptions {
                config,
                patterns,
                seed,
                ticks,
                dt,
                threads,
                diag_jsonl,
                out,
                quiet,
            };
            if let Err(err) = cli::run::run(options) {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        }
        Commands::Patterns => match danmaku_sim::PatternLibrary::builtin() {
            Ok(library) => {
                for name in library.names() {
                    println!("{}", name);
                }
            }
            Err(err) => {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        },
    }
}
