#![allow(dead_code)]

use diffpeak_caller_rs::{Config, ReplicateSpec};
use diffpeak_core_rs::source::{MemoryDataset, MemoryOpener, Read};
use eyre::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const WINDOW_SIZE: u64 = 200;
pub const WINDOW_OFFSET: u64 = 50;
pub const READ_LENGTH: u64 = 50;

/// Uniform background with optional enriched sites of `site_length` bases.
pub struct Simulation {
    pub chromosomes: Vec<(String, u64)>,
    pub density: f64,
    pub sites: Vec<(usize, u64)>,
    pub site_length: u64,
    pub enrichment: usize,
}

impl Simulation {
    pub fn new(chromosomes: &[(&str, u64)], density: f64) -> Self {
        Self {
            chromosomes: chromosomes
                .iter()
                .map(|(name, length)| (name.to_string(), *length))
                .collect(),
            density,
            sites: Vec::new(),
            site_length: 600,
            enrichment: 0,
        }
    }

    pub fn with_sites(mut self, sites: &[(usize, u64)], enrichment: usize) -> Self {
        self.sites = sites.to_vec();
        self.enrichment = enrichment;
        self
    }

    pub fn dataset(&self, seed: u64, enriched: bool) -> Result<MemoryDataset> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dataset = MemoryDataset::new();
        for (contig, (name, length)) in self.chromosomes.iter().enumerate() {
            dataset.add_chromosome(name.as_str(), *length);

            let total = (*length as f64 * self.density) as usize;
            let mut reads = Vec::with_capacity(total);
            for _ in 0..total {
                let start = rng.random_range(0..length - READ_LENGTH);
                reads.push(Read::new(start, start + READ_LENGTH, vec![30; READ_LENGTH as usize])?);
            }
            if enriched {
                for (_, site) in self.sites.iter().filter(|x| x.0 == contig) {
                    for _ in 0..self.enrichment {
                        let start = site + rng.random_range(0..self.site_length - READ_LENGTH);
                        reads.push(Read::new(start, start + READ_LENGTH, vec![38; READ_LENGTH as usize])?);
                    }
                }
            }
            dataset.add_reads(name, reads)?;
        }
        Ok(dataset)
    }

    /// Register `replicates` pairs of datasets and describe them in a configuration.
    pub fn setup(&self, replicates: usize) -> Result<(MemoryOpener, Config)> {
        let mut opener = MemoryOpener::new();
        let mut config = Config::new();
        for ind in 0..replicates {
            let (exp, bg) = (format!("exp{ind}"), format!("bg{ind}"));
            opener
                .insert(&exp, self.dataset(2 * ind as u64, true)?)
                .insert(&bg, self.dataset(2 * ind as u64 + 1, false)?);
            config.add_replicate(ReplicateSpec::new(format!("rep{ind}"), exp, bg))?;
        }
        config
            .set_window(WINDOW_SIZE, WINDOW_OFFSET)?
            .set_chunk_size(64)?;
        Ok((opener, config))
    }
}
