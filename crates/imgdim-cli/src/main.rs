//! imgdim - resolve image dimensions through a bounded LRU cache

mod manifest;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use imgdim::{
    DimensionLookup, Dimensions, DimensionsObserver, FixedDisplay, ImageSource, LookupConfig,
    DEFAULT_CAPACITY, DEFAULT_FALLBACK_HEIGHT_RATIO,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::manifest::Manifest;

/// Screen size assumed when neither the flag nor the manifest sets one
const DEFAULT_SCREEN: Dimensions = Dimensions {
    width: 1080.0,
    height: 1920.0,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image sources: numeric resource ids or URIs ("-" reads them from stdin)
    sources: Vec<String>,

    /// JSON asset manifest
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Cache capacity (number of entries)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Screen size as WIDTHxHEIGHT, overrides the manifest
    #[arg(long, value_parser = parse_screen)]
    screen: Option<Dimensions>,

    /// Fallback height as a share of the screen height
    #[arg(long, default_value_t = DEFAULT_FALLBACK_HEIGHT_RATIO)]
    fallback_ratio: f64,

    /// Timeout per probe attempt in milliseconds
    #[arg(long)]
    probe_timeout_ms: Option<u64>,

    /// Extra probe attempts after a failure
    #[arg(long, default_value_t = 0)]
    probe_retries: u32,

    /// Request header for remote sources ("Name: value"), repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[derive(Serialize)]
struct Resolved<'a> {
    source: &'a str,
    width: f64,
    height: f64,
}

fn parse_screen(s: &str) -> Result<Dimensions> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let width: f64 = w.trim().parse().context("invalid screen width")?;
    let height: f64 = h.trim().parse().context("invalid screen height")?;
    Ok(Dimensions::new(width, height)?)
}

fn parse_header(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("expected \"Name: value\", got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("empty header name in {:?}", s);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse a source and attach the command-line headers to remote ones
fn parse_source(raw: &str, headers: &[(String, String)]) -> Result<ImageSource> {
    let mut source: ImageSource = raw.parse()?;
    if let ImageSource::Remote(remote) = &mut source {
        for (name, value) in headers {
            remote.headers.insert(name.clone(), value.clone());
        }
    }
    Ok(source)
}

fn collect_sources(args: &[String]) -> Result<Vec<String>> {
    if args.len() == 1 && args[0] == "-" {
        let stdin = io::stdin();
        let mut sources = Vec::new();
        for line in stdin.lock().lines() {
            let line = line.context("Failed to read sources from stdin")?;
            if !line.trim().is_empty() {
                sources.push(line.trim().to_string());
            }
        }
        return Ok(sources);
    }
    Ok(args.to_vec())
}

/// Resolve each source through `lookup` and write one JSON line per source
///
/// Unparseable sources are logged and skipped. Returns the number of lines written.
async fn resolve_sources<W: Write>(
    lookup: &DimensionLookup,
    sources: &[String],
    headers: &[(String, String)],
    out: &mut W,
) -> Result<usize> {
    let observer = DimensionsObserver::new();
    let mut written = 0;

    for raw in sources {
        let source = match parse_source(raw, headers) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping {:?}: {}", raw, e);
                continue;
            }
        };

        observer.observe(lookup, &source).await;
        let Some(dims) = observer.current() else {
            continue;
        };

        let line = serde_json::to_string(&Resolved {
            source: raw,
            width: dims.width,
            height: dims.height,
        })?;
        writeln!(out, "{}", line)?;
        written += 1;
    }

    Ok(written)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout carries results, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let manifest = match &args.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };
    let screen = args.screen.or(manifest.screen).unwrap_or(DEFAULT_SCREEN);
    let headers = args
        .headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<Vec<_>>>()?;

    let config = LookupConfig {
        capacity: args.capacity,
        fallback_height_ratio: args.fallback_ratio,
        probe_timeout: args.probe_timeout_ms.map(Duration::from_millis),
        probe_retries: args.probe_retries,
    };

    info!("Starting imgdim v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {}", config.capacity);
    info!("Screen: {}", screen);

    let (assets, prober) = manifest.into_parts();
    let lookup = DimensionLookup::new(
        config,
        Arc::new(assets),
        Arc::new(prober),
        Arc::new(FixedDisplay(screen)),
    )
    .context("Failed to create dimension cache")?;

    let sources = collect_sources(&args.sources)?;
    if sources.is_empty() {
        warn!("No sources given");
    }

    let mut stdout = io::stdout().lock();
    let written = resolve_sources(&lookup, &sources, &headers, &mut stdout).await?;

    info!(
        "Resolved {} of {} sources; cache holds {} entries: {}",
        written,
        sources.len(),
        lookup.cache_len(),
        lookup.stats().snapshot()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn lookup_from_manifest(json: &str, config: LookupConfig) -> Result<DimensionLookup> {
        let mut file = NamedTempFile::new()?;
        file.write_all(json.as_bytes())?;
        let manifest = Manifest::load(file.path())?;
        let screen = manifest.screen.unwrap_or(DEFAULT_SCREEN);
        let (assets, prober) = manifest.into_parts();
        Ok(DimensionLookup::new(
            config,
            Arc::new(assets),
            Arc::new(prober),
            Arc::new(FixedDisplay(screen)),
        )?)
    }

    #[tokio::test]
    async fn test_resolve_sources_writes_json_lines() {
        let lookup = lookup_from_manifest(
            r#"{
                "screen": {"width": 400, "height": 800},
                "assets": {"3": {"width": 64, "height": 32}, "4": {"width": 10}},
                "remote": {"https://cdn/a.png": {"width": 640, "height": 480}}
            }"#,
            LookupConfig::default(),
        )
        .unwrap();
        let sources: Vec<String> = ["3", "4", "https://cdn/a.png", "https://cdn/missing.png", " ", "3"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut out = Vec::new();
        let written = resolve_sources(&lookup, &sources, &[], &mut out).await.unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(written, 5);
        assert_eq!(
            lines,
            vec![
                serde_json::json!({"source": "3", "width": 64.0, "height": 32.0}),
                serde_json::json!({"source": "4", "width": 10.0, "height": 600.0}),
                serde_json::json!({"source": "https://cdn/a.png", "width": 640.0, "height": 480.0}),
                serde_json::json!({"source": "https://cdn/missing.png", "width": 400.0, "height": 600.0}),
                serde_json::json!({"source": "3", "width": 64.0, "height": 32.0}),
            ]
        );
        assert_eq!(lookup.stats().hits(), 1);
        assert_eq!(lookup.stats().probe_failures(), 1);
    }

    #[test]
    fn test_invalid_fallback_ratio_rejected() {
        let config = LookupConfig {
            fallback_height_ratio: -1.0,
            ..LookupConfig::default()
        };
        assert!(lookup_from_manifest("{}", config).is_err());
    }

    #[test]
    fn test_negative_asset_rejected() {
        let result = lookup_from_manifest(r#"{"assets": {"3": {"width": -5}}}"#, LookupConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_screen() {
        assert_eq!(
            parse_screen("1080x1920").unwrap(),
            Dimensions { width: 1080.0, height: 1920.0 }
        );
        assert_eq!(
            parse_screen("390.5 X 844").unwrap(),
            Dimensions { width: 390.5, height: 844.0 }
        );
        assert!(parse_screen("1080").is_err());
        assert!(parse_screen("-1x10").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer abc").unwrap(),
            ("Authorization".to_string(), "Bearer abc".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_parse_source_attaches_headers() {
        let headers = vec![("X-Token".to_string(), "t".to_string())];

        match parse_source("https://cdn/a.png", &headers).unwrap() {
            ImageSource::Remote(remote) => {
                assert_eq!(remote.headers.get("X-Token").map(String::as_str), Some("t"));
            }
            other => panic!("expected remote source, got {:?}", other),
        }
        assert_eq!(parse_source("12", &headers).unwrap(), ImageSource::Resource(12));
        assert!(parse_source("", &headers).is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["imgdim", "1", "https://cdn/a.png"]);

        assert_eq!(args.sources, vec!["1", "https://cdn/a.png"]);
        assert_eq!(args.capacity, DEFAULT_CAPACITY);
        assert_eq!(args.probe_retries, 0);
        assert!(args.screen.is_none());
    }

    #[test]
    fn test_args_screen_flag() {
        let args = Args::parse_from(["imgdim", "--screen", "800x600", "-H", "A: b", "1"]);

        assert_eq!(args.screen, Some(Dimensions { width: 800.0, height: 600.0 }));
        assert_eq!(args.headers, vec!["A: b"]);
    }
}
