use anyhow::{Result, bail};
use feedtext::{
    config::Config,
    pipeline::{ExtractionPipeline, PdfStrategy},
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: feedtext [--json] [--scan] <url>...";

struct Args {
    json: bool,
    strategy: PdfStrategy,
    urls: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        json: false,
        strategy: PdfStrategy::Full,
        urls: Vec::new(),
    };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => args.json = true,
            "--scan" => args.strategy = PdfStrategy::ByteScanner,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            _ => args.urls.push(arg),
        }
    }
    if args.urls.is_empty() {
        bail!(USAGE);
    }
    Ok(args)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedtext=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var("FEEDTEXT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = parse_args()?;
    let config = Config::from_env()?;
    let pipeline = ExtractionPipeline::new(&config)?;

    let mut missing = 0;
    for url in &args.urls {
        match pipeline.item_text(url, args.strategy).await {
            Some(item) if args.json => println!("{}", serde_json::to_string(&item)?),
            Some(item) => println!("{}\n", item.text),
            None => {
                missing += 1;
                tracing::warn!(url = %url, "no text extracted");
            }
        }
    }

    if missing == args.urls.len() {
        bail!("no text extracted from any of {} url(s)", missing);
    }
    Ok(())
}
