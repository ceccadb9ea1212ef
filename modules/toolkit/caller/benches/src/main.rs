use std::sync::Arc;
use std::time::Instant;

use diffpeak_caller_rs::{Config, Orchestrator, ReplicateSpec};
use diffpeak_core_rs::source::{MemoryDataset, MemoryOpener, Read};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const THREADS: isize = -1;
const SEED: u64 = 17;
const READ_LENGTH: u64 = 50;
const CHROMOSOMES: &[(&str, u64)] = &[
    ("chr1", 5_000_000),
    ("chr2", 3_000_000),
    ("chr3", 1_000_000),
    ("chrM", 16_569),
];
// (replicate, reads per kb of the background, enrichment of the experiment inside sites)
const REPLICATES: &[(&str, f64, f64)] = &[("rep1", 2.0, 8.0), ("rep2", 2.5, 6.0), ("rep3", 1.5, 4.0)];
const SITES: usize = 500;
const SITE_LENGTH: u64 = 600;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn simulate(rng: &mut StdRng, density: f64, sites: &[(usize, u64)], enrichment: f64) -> MemoryDataset {
    let mut dataset = MemoryDataset::new();
    for (contig, (name, length)) in CHROMOSOMES.iter().enumerate() {
        dataset.add_chromosome(*name, *length);

        let reads = (*length as f64 / 1000.0 * density) as usize;
        let mut batch = Vec::with_capacity(reads);
        for _ in 0..reads {
            let start = rng.random_range(0..length - READ_LENGTH);
            let quality = vec![rng.random_range(20..41); READ_LENGTH as usize];
            batch.push(Read::new(start, start + READ_LENGTH, quality).unwrap());
        }

        let extra = (SITE_LENGTH as f64 / 1000.0 * density * enrichment) as usize;
        for (_, start) in sites.iter().filter(|x| x.0 == contig) {
            for _ in 0..extra {
                let at = start + rng.random_range(0..SITE_LENGTH - READ_LENGTH);
                batch.push(Read::new(at, at + READ_LENGTH, vec![38; READ_LENGTH as usize]).unwrap());
            }
        }
        dataset.add_reads(name, batch).unwrap();
    }
    dataset
}

fn main() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let sites = (0..SITES)
        .map(|_| {
            let contig = rng.random_range(0..CHROMOSOMES.len() - 1);
            (contig, rng.random_range(0..CHROMOSOMES[contig].1 - SITE_LENGTH))
        })
        .collect::<Vec<_>>();

    let mut opener = MemoryOpener::new();
    let mut config = Config::new();
    for (name, density, enrichment) in REPLICATES {
        let (exp, bg) = (format!("{name}.exp"), format!("{name}.bg"));
        opener
            .insert(&exp, simulate(&mut rng, *density, &sites, *enrichment))
            .insert(&bg, simulate(&mut rng, *density, &[], 0.0));
        config
            .add_replicate(ReplicateSpec::new(*name, exp, bg))
            .unwrap();
    }
    config
        .set_threads(THREADS)
        .unwrap()
        .set_fit_weights(true)
        .set_quality_counting(true);

    let orchestrator = Orchestrator::new(Arc::new(opener));
    orchestrator.set_config(config).unwrap();

    let timer = Instant::now();
    let result = {
        #[cfg(feature = "dhat-heap")]
        let _profiler = dhat::Profiler::new_heap();
        orchestrator.start().unwrap();
        orchestrator.wait().unwrap().unwrap()
    };
    println!("Calculation: {:.2?}", timer.elapsed());

    for replicate in result.replicates() {
        println!(
            "{}: weight {:.3}, scaling {:.3}, significant {}",
            replicate.name(),
            replicate.weight(),
            replicate.scaling_factor(),
            replicate.counters().corrected
        );
    }
    println!(
        "Planted sites: {SITES}, narrow peaks: {}, broad peaks: {}, rho: {:?}",
        result.narrow().len(),
        result.broad().len(),
        result.summary().rho()
    );

    let timer = Instant::now();
    orchestrator
        .recalculate(None, Some(vec![true, true, false]), None)
        .unwrap();
    let result = orchestrator.wait().unwrap().unwrap();
    println!(
        "Recalculation without rep3: {:.2?}, narrow peaks: {}",
        timer.elapsed(),
        result.narrow().len()
    );
}
