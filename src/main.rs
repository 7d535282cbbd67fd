//! nmea-relay command line
//!
//! Run with: nmea-relay serve --file track.nmea --address 0.0.0.0:8888
//!
//! Examples:
//!   nmea-relay serve                                  # ./output.nmea on localhost:8888
//!   nmea-relay serve --file track.nmea --loop         # replay forever
//!   nmea-relay serve --delay 200000 --kind GGA        # GGA every 200 ms
//!   nmea-relay send --address 10.0.0.5:8888           # push to a remote listener
//!
//! Connect with: nc localhost 8888

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use nmea_relay::server::{parse_addr, wait_for_signal};
use nmea_relay::source::{ParseErrorPolicy, SourceConfig, DEFAULT_TARGET_KIND};
use nmea_relay::{NmeaParser, RecordSender, RelayConfig, RelayServer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Broadcast sentences to every client that connects
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds to wait for components to stop before forcing exit
        #[arg(long, default_value_t = 3)]
        grace_secs: u64,
    },

    /// Push sentences to a single remote listener
    Send {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Sentence file to read
    #[arg(short, long, default_value = "./output.nmea")]
    file: PathBuf,

    /// Listen address for `serve`, remote address for `send`
    #[arg(short, long, default_value = "localhost:8888")]
    address: String,

    /// Delay between records, in microseconds
    #[arg(short, long, default_value_t = 1_000_000)]
    delay: u64,

    /// Restart from the top of the file when it runs out
    #[arg(short = 'l', long = "loop")]
    loop_forever: bool,

    /// Sentence kind to forward
    #[arg(short, long, default_value = DEFAULT_TARGET_KIND)]
    kind: String,

    /// Skip malformed lines instead of stopping the reader
    #[arg(long)]
    skip_malformed: bool,
}

impl SourceArgs {
    fn source_config(&self) -> SourceConfig {
        let policy = if self.skip_malformed {
            ParseErrorPolicy::Skip
        } else {
            ParseErrorPolicy::Stop
        };

        SourceConfig::new(&self.file)
            .delay_micros(self.delay)
            .loop_forever(self.loop_forever)
            .target_kind(&self.kind)
            .parse_error_policy(policy)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nmea_relay=info".parse()?),
        )
        .init();

    match cli.command {
        Command::Serve { source, grace_secs } => {
            let config = RelayConfig::with_addr(parse_addr(&source.address)?)
                .source(source.source_config())
                .shutdown_grace(Duration::from_secs(grace_secs));

            let server = RelayServer::bind(config, NmeaParser).await?;
            println!("Relaying {} on {}", source.file.display(), server.local_addr());

            let summary = server.run().await?;
            if let Err(e) = summary.reader {
                eprintln!("Source error: {}", e);
            }
        }
        Command::Send { source } => {
            let remote = parse_addr(&source.address)?;
            let (sender, _events) = RecordSender::new(remote, source.source_config(), NmeaParser);

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if wait_for_signal().await.is_ok() {
                    signal_cancel.cancel();
                }
            });

            let summary = sender.run(cancel).await?;
            println!("Sent {} records to {}", summary.records_sent, remote);
        }
    }

    Ok(())
}
