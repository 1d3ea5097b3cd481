use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

use nextup::ranking::{BacklogItem, RankOptions};
use nextup::{NextUp, PipelineConfig, SearchOptions};

const USAGE: &str = "usage: nextup <config.json> (search <query> | get <id> | rank <backlog.json> [mood] | stats | clear)";

fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PipelineConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

fn cache_db_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nextup")
        .join("catalog_cache.db")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!(USAGE);
    }

    let config = load_config(Path::new(&args[0]))?;
    let app = NextUp::with_sqlite(config, &cache_db_path()).await?;

    match (args[1].as_str(), args.get(2)) {
        ("search", Some(_)) => {
            let query = args[2..].join(" ");
            let page = app.search(&query, &SearchOptions::default()).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        ("get", Some(id)) => {
            let id: u64 = id.parse().with_context(|| format!("invalid id {}", id))?;
            let record = app.get_by_id(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        ("rank", Some(path)) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading backlog {}", path))?;
            let mut items: Vec<BacklogItem> =
                serde_json::from_str(&raw).with_context(|| format!("parsing backlog {}", path))?;

            let enriched = app.enrich(&mut items).await;
            log::info!("Enriched {} of {} backlog items", enriched, items.len());

            let options = RankOptions {
                mood: args.get(3).cloned(),
                limit: Some(10),
                ..Default::default()
            };
            let ranked = app.rank(items, &options);
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        ("stats", _) => {
            println!("{}", serde_json::to_string_pretty(&app.cache_stats().await)?);
        }
        ("clear", _) => app.clear_cache().await,
        _ => bail!(USAGE),
    }

    Ok(())
}
