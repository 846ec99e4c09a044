use clap::{Args, Parser, Subcommand};
use ir_proxy::cache::DigestCache;
use ir_proxy::digest::Digest;
use ir_proxy::http::HttpRetriever;
use ir_proxy::imagestream::FileImageStreamGetter;
use ir_proxy::{Config, ProxyResult, RemoteBlobGetter};
use log::info;
use std::sync::Arc;

#[derive(Args, Debug)]
struct SourceArgs
{
    /// image stream JSON document listing the tag history
    #[arg(short, long)]
    stream: String,

    /// JSON configuration file, none to use built-in defaults
    #[arg(short, long)]
    config: Option<String>,

    /// override the location cache TTL (seconds)
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// override the remote request timeout (seconds)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli
{
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Locate a blob and print its descriptor
    Stat(StatArgs),
    /// Locate a blob and download it
    Get(GetArgs),
}

#[derive(Args, Debug)]
struct StatArgs
{
    /// blob digest, e.g. sha256:...
    digest: String,
}

#[derive(Args, Debug)]
struct GetArgs
{
    /// blob digest, e.g. sha256:...
    digest: String,

    /// file to write the blob to [default: ./{hash}]
    #[arg(short, long)]
    out: Option<String>,
}

fn build_getter(source: &SourceArgs) -> ProxyResult<RemoteBlobGetter>
{
    let mut config = match &source.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(ttl) = source.cache_ttl {
        config.blob_repository_cache_ttl = ttl;
    }
    if let Some(timeout) = source.timeout {
        config.timeout = timeout;
    }
    info!("{:?}", config);

    let cache = DigestCache::new(config.cache_digests, config.cache_repositories_per_digest);

    Ok(RemoteBlobGetter::new(
        Arc::new(FileImageStreamGetter::new(&source.stream)),
        Arc::new(HttpRetriever::new(config.request_timeout())?),
        Arc::new(cache),
        config.cache_ttl(),
    ))
}

#[tokio::main]
async fn main() -> ProxyResult<()>
{
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let getter = build_getter(&cli.source)?;

    match cli.command {
        Commands::Stat(args) => {
            let digest = Digest::try_from(args.digest)?;
            let desc = getter.stat(&digest).await?;
            println!("{}\t{}\t{}", desc.digest, desc.size, desc.media_type);
        }
        Commands::Get(args) => {
            let digest = Digest::try_from(args.digest)?;
            let out = args.out.unwrap_or_else(|| digest.get_hash().to_string());

            let mut reader = getter.open(&digest).await?;
            let mut file = tokio::fs::File::create(&out).await?;
            let written = tokio::io::copy(&mut reader, &mut file).await?;

            info!("Blob {} ({} bytes) saved to \"{}\"", digest, written, out);
        }
    }

    Ok(())
}
