use anyhow::{bail, Context, Result};
use custflow::{
    config::Config,
    pipeline,
    sink::{ClickHouseSink, MemorySink, Sink},
};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: custflow [--dry-run] <command>

commands:
  extract <CSV> <RAW_PARQUET>                 read the source CSV
  transform <RAW_PARQUET> <CANONICAL_PARQUET> clean into the canonical shape
  load <CANONICAL_PARQUET> [TABLE]            append to the ClickHouse table
  run <CSV> [TABLE]                           extract → transform → load
  ping                                        check the ClickHouse connection";

enum Command {
    Extract { source: PathBuf, out: PathBuf },
    Transform { input: PathBuf, out: PathBuf },
    Load { input: PathBuf, table: Option<String> },
    Run { source: PathBuf, table: Option<String> },
    Ping,
}

fn parse_args(args: Vec<String>) -> Result<(Command, bool)> {
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let rest: Vec<String> = args.into_iter().filter(|a| a != "--dry-run").collect();

    let cmd = match rest.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["extract", source, out] => Command::Extract {
            source: source.into(),
            out: out.into(),
        },
        ["transform", input, out] => Command::Transform {
            input: input.into(),
            out: out.into(),
        },
        ["load", input] => Command::Load {
            input: input.into(),
            table: None,
        },
        ["load", input, table] => Command::Load {
            input: input.into(),
            table: Some(table.to_string()),
        },
        ["run", source] => Command::Run {
            source: source.into(),
            table: None,
        },
        ["run", source, table] => Command::Run {
            source: source.into(),
            table: Some(table.to_string()),
        },
        ["ping"] => Command::Ping,
        _ => bail!("{USAGE}"),
    };
    Ok((cmd, dry_run))
}

async fn dispatch<S: Sink>(sink: &S, cmd: Command, cfg: &Config) -> Result<()> {
    match cmd {
        Command::Extract { source, out } => {
            let rows = pipeline::extract_stage(&source, &out)
                .with_context(|| format!("extracting {}", source.display()))?;
            info!(rows, out = %out.display(), "extract done");
        }
        Command::Transform { input, out } => {
            let rows = pipeline::transform_stage(&input, &out)
                .with_context(|| format!("transforming {}", input.display()))?;
            info!(rows, out = %out.display(), "transform done");
        }
        Command::Load { input, table } => {
            let table = table.unwrap_or_else(|| cfg.table.clone());
            let summary = pipeline::load_stage(sink, &input, &table)
                .await
                .with_context(|| format!("loading {} into {}", input.display(), table))?;
            info!(
                table = %table,
                inserted = summary.inserted,
                total = summary.table_total,
                "load done"
            );
        }
        Command::Run { source, table } => {
            let table = table.unwrap_or_else(|| cfg.table.clone());
            let report = pipeline::run(sink, &source, &table)
                .await
                .with_context(|| format!("running pipeline for {}", source.display()))?;
            info!(
                table = %table,
                extracted = report.extracted,
                transformed = report.transformed,
                inserted = report.load.inserted,
                total = report.load.table_total,
                "run done"
            );
        }
        Command::Ping => {
            let rows = sink.query("SELECT 1").await.context("pinging ClickHouse")?;
            match rows.first().and_then(|r| r.first()).map(String::as_str) {
                Some("1") => info!("ClickHouse reachable"),
                other => bail!("unexpected ping response: {:?}", other),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) args + config ────────────────────────────────────────────
    let (cmd, dry_run) = parse_args(env::args().skip(1).collect())?;
    let cfg = Config::load().context("loading configuration")?;

    // ─── 3) run against the chosen sink ──────────────────────────────
    if dry_run {
        info!("dry run: loading into an in-memory sink");
        dispatch(&MemorySink::new(), cmd, &cfg).await
    } else {
        let sink = ClickHouseSink::new(&cfg.clickhouse).context("building ClickHouse client")?;
        dispatch(&sink, cmd, &cfg).await
    }
}
