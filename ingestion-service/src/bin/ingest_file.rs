use anyhow::{bail, Context, Result};
use meter_ingestion_service::{
    config::AppConfig,
    observability,
    pipeline::{self, IngestMode},
    sources::check_upload,
    stores::Store,
    transform::RowParser,
};
use std::{env, fs::File, io::BufReader, path::Path};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (path, mode) = match args.as_slice() {
        [path] => (path, IngestMode::Upload),
        [path, flag] if flag == "--validate" => (path, IngestMode::Validate),
        _ => bail!("usage: ingest_file <file_path> [--validate]"),
    };

    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path.as_str())
        .to_string();

    let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
    let len = file.metadata()?.len();
    check_upload(&file_name, usize::try_from(len)?)?;

    let parser = RowParser::for_today();
    let partitioned =
        tokio::task::spawn_blocking(move || pipeline::partition(BufReader::new(file), &parser)).await??;

    let report = match mode {
        IngestMode::Validate => partitioned.into_validation_report(&file_name),
        IngestMode::Upload => {
            // Load configuration (point METER_REGISTRY_CONFIG at the target store).
            let cfg = AppConfig::load()?;
            let store = Store::connect(&cfg.storage).await?;
            partitioned.store(&file_name, &store).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
