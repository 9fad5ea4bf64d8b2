use std::path::PathBuf;

use async_compression::tokio::bufread::ZstdDecoder;
use clap::{Parser, Subcommand};
use futures_util::TryStreamExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::io::{ReaderStream, StreamReader};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Client for the streaming compression relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8002")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a file (or stdin) to the relay as a producer
    Put {
        file: Option<PathBuf>,
    },
    /// Receive the next compressed stream as a consumer
    Get {
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the decompressed bytes instead
        #[arg(short, long)]
        decompress: bool,
    },
    /// Compress a file (or stdin) over the raw socket listener
    Compress {
        #[arg(short, long, default_value = "localhost:8001")]
        addr: String,

        file: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print relay health
    Health,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/compressions", cli.url);

    match cli.command {
        Commands::Put { file } => {
            let body = reqwest::Body::wrap_stream(ReaderStream::new(open_input(file).await?));
            let res = client.put(&endpoint).body(body).send().await?;
            check_status(res).await?;
        }
        Commands::Get { output, decompress } => {
            let res = check_status(client.get(&endpoint).send().await?).await?;
            let mut reader =
                StreamReader::new(Box::pin(res.bytes_stream().map_err(std::io::Error::other)));
            let mut out = open_output(output).await?;
            if decompress {
                tokio::io::copy(&mut ZstdDecoder::new(reader), &mut out).await?;
            } else {
                tokio::io::copy(&mut reader, &mut out).await?;
            }
            out.flush().await?;
        }
        Commands::Compress { addr, file, output } => {
            let stream = TcpStream::connect(&addr).await?;
            let (mut from_peer, mut to_peer) = stream.into_split();
            let mut input = open_input(file).await?;
            let mut out = open_output(output).await?;

            let send = async {
                tokio::io::copy(&mut input, &mut to_peer).await?;
                // Half-close: the relay finalizes once it sees EOF.
                to_peer.shutdown().await
            };
            let receive = async {
                tokio::io::copy(&mut from_peer, &mut out).await?;
                out.flush().await
            };
            tokio::try_join!(send, receive)?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/_health", cli.url)).send().await?;
            // Draining is reported with 503 but still carries the JSON body.
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

async fn open_input(file: Option<PathBuf>) -> CliResult<Box<dyn AsyncRead + Send + Unpin>> {
    Ok(match file {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    })
}

async fn open_output(file: Option<PathBuf>) -> CliResult<Box<dyn AsyncWrite + Send + Unpin>> {
    Ok(match file {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    })
}

async fn check_status(res: reqwest::Response) -> CliResult<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(format!("relay returned {status}: {text}").into())
}
