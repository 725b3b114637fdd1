//! embedload CLI: inspect `.npy` embeddings and import JSONL records

mod commands;
mod utils;

use anyhow::Result;
use clap::CommandFactory;
use clap::{Parser, Subcommand};

use commands::{
    import_records, load_tensor, print_records_table, print_tensor_summary, print_values_preview,
    write_records,
};
use embedload::DecoderOptions;

#[derive(Parser)]
#[command(
    name = "embedload",
    version,
    about = "embedload CLI: inspect .npy embeddings and import JSONL records",
    long_about = "embedload CLI is a tool for inspecting NumPy .npy tensors and importing line-delimited JSON records.\n\nSources can be local paths or http(s) URLs. Set RUST_LOG=debug for per-chunk logging.",
    author,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dtype, shape and leading values of a .npy tensor
    #[command(
        about = "Show dtype, shape and leading values of a .npy tensor.",
        long_about = "Fetch (or read) a .npy file, decode it and print a summary table.\n\nExamples:\n  embedload info vectors.npy\n  embedload info https://example.com/embeddings.npy --raw-float16\n"
    )]
    Info {
        #[arg(help = "Path or http(s) URL of the .npy file")]
        source: String,
        #[arg(long, help = "Keep float16 payloads as raw 16-bit patterns instead of expanding to f32")]
        raw_float16: bool,
        #[arg(long, value_name = "N", default_value_t = 8, help = "Number of leading values to print")]
        preview: usize,
    },
    /// Import a JSONL record stream
    #[command(
        about = "Import a line-delimited JSON record stream.",
        long_about = "Stream a JSONL file from a URL, validate and normalize every line and upsert it into an in-memory store.\nInvalid lines are skipped and logged.\n\nExamples:\n  embedload import https://example.com/novels.jsonl\n  embedload import https://example.com/novels.jsonl --output novels.json --progress-interval 500\n"
    )]
    Import {
        #[arg(help = "http(s) URL of the JSONL stream")]
        url: String,
        #[arg(long, value_name = "FILE", help = "Write the stored records to FILE as a JSON array")]
        output: Option<String>,
        #[arg(long, value_name = "N", default_value_t = 100, help = "Records between progress updates (0 disables them)")]
        progress_interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Info {
            source,
            raw_float16,
            preview,
        }) => {
            let options = DecoderOptions {
                convert_float16: !raw_float16,
            };
            let (tensor, payload_bytes) = load_tensor(&source, options).await?;
            print_tensor_summary(&source, &tensor, payload_bytes);
            if preview > 0 {
                print_values_preview(&tensor, preview);
            }
        }
        Some(Commands::Import {
            url,
            output,
            progress_interval,
        }) => {
            let (store, processed) = import_records(&url, progress_interval).await?;
            let records = store.snapshot().await;
            println!(
                "Imported {} record(s) from {} ({} unique)",
                processed,
                url,
                records.len()
            );
            if !records.is_empty() {
                print_records_table(&records, 10);
            }
            if let Some(output) = output {
                write_records(&records, &output)?;
                println!("Wrote {} record(s) to {}", records.len(), output);
            }
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
