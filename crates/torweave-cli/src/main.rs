//! torweave CLI
//!
//! Builds consensus snapshots from documents and inspects them.
//!
//! Usage:
//!   torweave build <consensus-file> <descriptor-db> <snapshot-out>
//!   torweave inspect <snapshot>
//!   torweave weights <snapshot>

use std::path::Path;
use std::process;

use torweave_consensus::{Consensus, RelayRole};
use torweave_pathsel::{PathWeights, StandardPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("torweave - directory consensus modeling and relay-selection weights");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  torweave build <consensus-file> <descriptor-db> <snapshot-out>");
    eprintln!("                                    Parse a document, enrich it from the");
    eprintln!("                                    descriptor database, save a snapshot");
    eprintln!("  torweave inspect <snapshot>       Summarize a saved snapshot");
    eprintln!("  torweave weights <snapshot>       Compute selection weights under the");
    eprintln!("                                    default policy");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG  Log filter (default: torweave=info)");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "torweave=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["build", document, db, output] => build(document, db, output),
        ["inspect", snapshot] => inspect(snapshot),
        ["weights", snapshot] => weights(snapshot),
        _ => {
            print_usage();
            process::exit(2);
        }
    }
}

fn build(document: &str, db: &str, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(document, db, output, "building consensus snapshot");
    let consensus = Consensus::load(Path::new(document), Path::new(db))?;
    consensus.save_snapshot(Path::new(output))?;

    println!(
        "built consensus of {} relays (valid-after {}) -> {}",
        consensus.len(),
        consensus.valid_after(),
        output
    );
    Ok(())
}

fn inspect(snapshot: &str) -> Result<(), Box<dyn std::error::Error>> {
    let consensus = Consensus::from_snapshot(Path::new(snapshot))?;

    println!("valid-after:    {}", consensus.valid_after());
    println!("relays:         {}", consensus.len());
    println!("related pairs:  {}", consensus.relations().count_pairs());
    println!("max modifier:   {}", consensus.max_modifier());

    let mods = consensus.weight_mods();
    println!(
        "exit mods:      Wed={} Weg={} Wee={} Wem={}",
        mods.wed, mods.weg, mods.wee, mods.wem
    );
    println!(
        "entry mods:     Wgd={} Wgg={} Wgm={}",
        mods.wgd, mods.wgg, mods.wgm
    );
    println!(
        "middle mods:    Wmd={} Wmg={} Wme={} Wmm={}",
        mods.wmd, mods.wmg, mods.wme, mods.wmm
    );
    Ok(())
}

fn weights(snapshot: &str) -> Result<(), Box<dyn std::error::Error>> {
    let consensus = Consensus::from_snapshot(Path::new(snapshot))?;
    let weights = PathWeights::compute(&consensus, &StandardPolicy::default())?;

    for role in [RelayRole::Entry, RelayRole::Exit, RelayRole::Middle] {
        let eligible = (0..weights.len())
            .filter(|&i| weights.possible(role, i))
            .count();
        println!(
            "{role}: {eligible}/{} eligible, weight sum {:.1}",
            weights.len(),
            weights.weight_sum(role)
        );
    }

    // The heaviest exits dominate sampling; show the top of the list.
    let mut by_exit: Vec<usize> = (0..weights.len()).collect();
    by_exit.sort_by(|&a, &b| {
        weights
            .exit_probability(b)
            .total_cmp(&weights.exit_probability(a))
    });
    for &i in by_exit.iter().take(5) {
        let relay = consensus.relay(i);
        println!(
            "  {:<20} {}  p(exit)={:.4}",
            relay.nickname,
            relay.fingerprint,
            weights.exit_probability(i)
        );
    }
    Ok(())
}
