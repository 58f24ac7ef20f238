use std::fs::read;
use std::path::Path;

use anyhow::Context;
use anyhow::bail;
use quadlife::hashlife::Universe;
use quadlife::hashlife::UniverseConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: quadlife <pattern.rle> [generations-log2] [steps]";

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();

    let Some(path) = args.get(1).map(Path::new) else {
        bail!(USAGE);
    };

    let generations: u32 = match args.get(2) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("Invalid generation count \"{arg}\"\n{USAGE}"))?,
        None => 0,
    };

    let steps: u64 = match args.get(3) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("Invalid step count \"{arg}\"\n{USAGE}"))?,
        None => 1,
    };

    let data = read(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut universe = Universe::with_config(UniverseConfig::default())?;
    let file = universe
        .load_rle(&data)
        .with_context(|| format!("Failed to read RLE file {}", path.display()))?;

    if let Some(name) = file.name {
        info!(name = %String::from_utf8_lossy(name), "loaded pattern");
    }

    info!(
        population = universe.population(),
        level = universe.level(),
        rule = ?universe.rule(),
        "initial state"
    );

    for _ in 0..steps {
        universe.step(generations)?;

        info!(
            generation = universe.generation(),
            population = universe.population(),
            level = universe.level(),
            "step"
        );
    }

    let stats = universe.cache_stats();
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        "cache"
    );

    Ok(())
}
