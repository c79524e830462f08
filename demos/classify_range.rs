use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use resonances::batch::{build_catalog, classify_range};
use resonances::catalog::{Catalog, LibrationFilter, ResonanceKind};
use resonances::coefficients::ResonanceTable;
use resonances::config::ResonanceConfig;
use resonances::libration::classifier::ClassifyMode;
use resonances::resonance_errors::ResonanceError;
use tracing_subscriber::EnvFilter;

/// Build the catalog of an asteroid range, classify it and list the librating asteroids.
///
/// Arguments
/// -----------------
/// * `config` – Planets, aei directory and thresholds.
/// * `table` – Coefficient table path.
/// * `catalog` – SQLite file, created when missing.
/// * `first`, `last` – Inclusive asteroid range.
/// * `reuse` – Keep librations already stored in the catalog.
fn run(
    config: &ResonanceConfig,
    table: &Utf8Path,
    catalog: &Utf8Path,
    first: u32,
    last: u32,
    reuse: bool,
) -> Result<(), ResonanceError> {
    let catalog = Catalog::open(catalog)?;
    let table = ResonanceTable::from_path(table)?;

    let built = build_catalog(&catalog, config, &table, first..=last)?;
    println!("catalog: {built}");

    let mode = if reuse {
        ClassifyMode::ReadFromCatalog
    } else {
        ClassifyMode::Build
    };
    let report = classify_range(&catalog, config, mode, first..=last)?;
    println!("{:#}", report.summary);

    let kind = ResonanceKind::from_big_bodies(config.big_body_count())?;
    for filter in [LibrationFilter::Pure, LibrationFilter::Transient] {
        for (asteroid, libration) in catalog.librations_in_range(kind, first..=last, filter)? {
            let resonance = catalog.resonance(kind, libration.resonance_id)?;
            println!(
                "{filter:?}\tA{asteroid}\t{resonance}\tbreaks={}",
                libration.circulation_breaks.len()
            );
        }
    }
    Ok(())
}

/// Usage:
///   classify_range <CONFIG.toml> <TABLE> <CATALOG.sqlite> <FIRST> <LAST> [--reuse]
/// Example:
///   RUST_LOG=resonances=debug classify_range resonances.toml 3body.txt catalog.sqlite 1 1000
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 6 {
        eprintln!("usage: {} <CONFIG.toml> <TABLE> <CATALOG.sqlite> <FIRST> <LAST> [--reuse]", args[0]);
        std::process::exit(2);
    }

    let config = match ResonanceConfig::from_toml_file(Utf8Path::new(&args[1])) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    let (first, last) = match (args[4].parse::<u32>(), args[5].parse::<u32>()) {
        (Ok(first), Ok(last)) => (first, last),
        _ => {
            eprintln!("asteroid bounds must be integers");
            std::process::exit(2);
        }
    };
    let reuse = args.iter().any(|a| a == "--reuse");

    println!("{config:#}");
    if let Err(e) = run(
        &config,
        &Utf8PathBuf::from(&args[2]),
        &Utf8PathBuf::from(&args[3]),
        first,
        last,
        reuse,
    ) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
