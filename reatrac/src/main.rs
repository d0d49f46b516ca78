use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "reatrac")]
#[command(version = "0.1.0")]
#[command(about = "WAV <-> AEA converter for the ATRAC1 codec core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a 44.1 kHz WAV file to AEA
    Encode {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,
        /// Output AEA file
        #[arg(short, long)]
        output: PathBuf,
        /// Title stored in the AEA header (ASCII, up to 255 bytes)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Decode an AEA file to a 32-bit float WAV
    Decode {
        /// Input AEA file
        #[arg(short, long)]
        input: PathBuf,
        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Dump an AEA file's header and frame structure as JSON
    Dump {
        /// Input AEA file
        #[arg(short, long)]
        input: PathBuf,
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are not usage errors.
            if e.use_stderr() {
                eprintln!("{}", e);
                return ExitCode::from(1);
            }
            print!("{}", e);
            return ExitCode::SUCCESS;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(reatrac::exit_code(&e) as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Encode {
            input,
            output,
            title,
        } => {
            println!("Reading {}...", input.display());
            let summary = reatrac::encode_file(&input, &output, title.as_deref())?;
            println!("  Channels: {}", summary.channels);
            println!("  Duration: {:.2}s", summary.duration_secs);
            println!("Done!");
            println!("  Output: {}", output.display());
            println!(
                "  Size: {} bytes ({} units/channel)",
                summary.output_bytes, summary.units_per_channel
            );
        }
        Commands::Decode { input, output } => {
            println!("Reading {}...", input.display());
            let summary = reatrac::decode_file(&input, &output)?;
            if !summary.title.is_empty() {
                println!("  Title: {}", summary.title);
            }
            println!("  Channels: {}", summary.channels);
            println!(
                "  Duration: {:.2}s",
                summary.samples_per_channel as f64 / 44100.0
            );
            println!("Done!");
            println!("  Output: {}", output.display());
        }
        Commands::Dump { input, output } => {
            println!("Reading {}...", input.display());
            let units = reatrac::dump_file(&input, &output)?;
            println!("Done!");
            println!("  {} units dumped to {}", units, output.display());
        }
    }
    Ok(())
}
