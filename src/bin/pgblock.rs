//! pgblock: generate or serve a PeerGuardian v2 IP blocklist.

use clap::{CommandFactory, Parser};
use pgblock::config::{parse_listen_addr, DEFAULT_FEED_URL};
use pgblock::{
    output, server, BlocklistBuilder, Config, Country, HttpFetcher, OutputMode, OutputSink,
    Refresher, Sources,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pgblock")]
#[command(author = "Kaitu.io")]
#[command(version)]
#[command(about = "Generate bittorrent peer IP blocklist in PeerGuardian v2 format")]
#[command(long_about = "Generate bittorrent peer IP blocklist in PeerGuardian v2 format.

This tool can also serve the blocklist from an HTTP server and update it
every 24 hours. This is useful for clients that can auto-update from an
HTTP server, like Transmission.")]
struct Cli {
    /// Link to a GZIP compressed PGv2 blocklist to include
    #[arg(short = 'g', long, num_args = 1.., value_name = "URL")]
    gzip_url: Vec<String>,

    /// Country code or name to block
    #[arg(short, long, num_args = 1.., value_parser = parse_country)]
    country: Vec<Country>,

    /// Don't compress the output as GZIP
    #[arg(short, long)]
    no_compress: bool,

    /// The file to write the blocklist to ("-" for stdout)
    #[arg(short, long, value_name = "PATH", conflicts_with = "serve")]
    output: Option<String>,

    /// Instead of writing to a file, serve the blocklist over HTTP.
    /// The blocklist is rebuilt every 24 hours.
    /// Example: --serve 0.0.0.0:8080
    #[arg(short, long, value_name = "HOST:PORT")]
    serve: Option<String>,

    /// Base URL of the per-country range feeds
    #[arg(long, value_name = "URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Seconds between rebuilds in serve mode
    #[arg(long, value_name = "SECS", default_value_t = 86400)]
    refresh_interval: u64,

    /// Timeout for each source download, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout: u64,
}

fn parse_country(value: &str) -> Result<Country, String> {
    Country::parse(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Resolve the command line into a validated configuration.
    fn into_config(self) -> pgblock::Result<Config> {
        // Reject a source-less run before any notice or address lookup
        let sources = Sources::new(self.country, self.gzip_url);
        sources.validate()?;

        let mut compress = !self.no_compress;

        let mode = match (self.serve, self.output) {
            (Some(addr), _) => OutputMode::Serve(parse_listen_addr(&addr)?),
            (None, Some(path)) => OutputMode::OneShot(OutputSink::from_arg(&path)),
            (None, None) => {
                eprintln!(
                    "No output file passed - writing uncompressed list to stdout. \
                     Pass \"-o -\" to force compression."
                );
                compress = false;
                OutputMode::OneShot(OutputSink::Stdout)
            }
        };

        Config::new(sources, compress, mode)?
            .with_feed_url(&self.feed_url)
            .with_fetch_timeout(Duration::from_secs(self.timeout))
            .with_refresh_interval(Duration::from_secs(self.refresh_interval))
    }
}

fn run(config: Config) -> pgblock::Result<()> {
    let fetcher = HttpFetcher::with_timeout(config.fetch_timeout);
    let builder = BlocklistBuilder::new(fetcher).with_feed_url(&config.feed_url);

    match config.mode {
        OutputMode::OneShot(sink) => {
            output::generate(&builder, &config.sources, config.compress, &sink)?;
            Ok(())
        }
        OutputMode::Serve(addr) => {
            let refresher = Refresher::new(
                builder,
                config.sources,
                config.compress,
                config.refresh_interval,
            );
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(addr, refresher))
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", Cli::command().render_help());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pgblock").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_sources_is_config_error() {
        let result = parse(&["-o", "out.gz"]).into_config();
        assert!(matches!(result, Err(pgblock::Error::Config(_))));
    }

    #[test]
    fn test_no_sources_checked_before_listen_addr() {
        let result = parse(&["-s", "no-such-host.invalid:8080"]).into_config();
        assert!(matches!(result, Err(pgblock::Error::Config(msg)) if msg.contains("source")));
    }

    #[test]
    fn test_oversized_refresh_interval_rejected() {
        let result =
            parse(&["-c", "US", "--refresh-interval", "18446744073709551615"]).into_config();
        assert!(matches!(result, Err(pgblock::Error::Config(_))));
    }

    #[test]
    fn test_stdout_default_is_uncompressed() {
        let config = parse(&["-c", "US"]).into_config().unwrap();
        assert_eq!(config.mode, OutputMode::OneShot(OutputSink::Stdout));
        assert!(!config.compress);
    }

    #[test]
    fn test_dash_forces_compressed_stdout() {
        let config = parse(&["-c", "US", "-o", "-"]).into_config().unwrap();
        assert_eq!(config.mode, OutputMode::OneShot(OutputSink::Stdout));
        assert!(config.compress);
    }

    #[test]
    fn test_multiple_sources() {
        let config = parse(&["-c", "US", "germany", "-g", "http://a/1.gz", "http://a/2.gz", "-n"])
            .into_config()
            .unwrap();
        let names: Vec<_> = config.sources.countries.iter().map(|c| c.alpha2()).collect();
        assert_eq!(names, ["US", "DE"]);
        assert_eq!(config.sources.prebuilt_urls.len(), 2);
        assert!(!config.compress);
    }

    #[test]
    fn test_serve_mode() {
        let config = parse(&["-c", "US", "-s", "127.0.0.1:8080", "--refresh-interval", "3600"])
            .into_config()
            .unwrap();
        assert_eq!(config.mode, OutputMode::Serve("127.0.0.1:8080".parse().unwrap()));
        assert_eq!(config.refresh_interval, Duration::from_secs(3600));
        assert!(config.compress);
    }

    #[test]
    fn test_output_and_serve_conflict() {
        let args = ["pgblock", "-c", "US", "-o", "x", "-s", "127.0.0.1:80"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_unknown_country_rejected() {
        assert!(Cli::try_parse_from(["pgblock", "-c", "Atlantis"]).is_err());
    }
}
