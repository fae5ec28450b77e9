use blobfetch::api::BlobscanClient;
use blobfetch::config::{self, BlobOrder, Config};
use blobfetch::op_stack;
use blobfetch::retrieve;

use std::{path::PathBuf, process::exit, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::{error, LevelFilter};
use simple_logger::{set_up_color_terminal, SimpleLogger};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "blobfetch",
    about = "Reassembles the blobs of a transaction from the Blobscan API into a single file"
)]
struct Cli {
    /// Transaction hash, defaults to a known blob carrying transaction
    #[arg(default_value = config::DEFAULT_TRANSACTION)]
    transaction: String,

    /// Base url of the Blobscan API
    #[arg(long, default_value = config::DEFAULT_API_BASE)]
    api_url: String,

    /// Directory the .blob files are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Request timeout in seconds, requests wait forever when unset
    #[arg(long)]
    timeout: Option<u64>,

    /// Fetch blobs by ascending index instead of the order the API lists them in
    #[arg(long)]
    sort_by_index: bool,

    /// Also write every blob to its own {tx}_{index}.blob file
    #[arg(long)]
    write_parts: bool,

    /// Decode the written file as OP stack batcher data and print the span batch
    #[arg(long)]
    decode: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::new(&self.api_url)?;
        config.output_dir = self.output_dir.clone();
        config.timeout = self.timeout.map(Duration::from_secs);
        config.write_parts = self.write_parts;
        if self.sort_by_index {
            config.order = BlobOrder::ByIndex;
        }

        Ok(config)
    }
}

fn run(args: Cli) -> Result<()> {
    let config = args.config()?;
    let client = BlobscanClient::new(&config)?;

    let path = retrieve::retrieve(&client, &config, &args.transaction)?;

    if args.decode {
        let batch = op_stack::decode_file(&path)?;
        println!("{}", batch);
    }

    Ok(())
}

fn main() {
    let args = Cli::parse();

    set_up_color_terminal();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = SimpleLogger::new().with_level(level).without_timestamps();

    if let Err(err) = logger.init() {
        eprintln!("failed to set up logger: {}", err);
        exit(1)
    }

    if let Err(err) = run(args) {
        error!("{:#}", err);
        exit(1)
    }
}
