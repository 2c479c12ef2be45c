//! DataLoader: batched iteration over N-body datasets.
//!
//! Wraps any `Dataset` of `NBodySample`s and yields collated `NBodyBatch`es,
//! optionally shuffled with a per-epoch seed.

use std::cell::Cell;

use gast_core::{GastError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::batch::{NBodyBatch, NBodySample};
use crate::synthetic::{mock_sample, random_edges, MockConfig};

/// Trait for indexable graph datasets.
pub trait Dataset: Send + Sync {
    /// Total number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a single sample by index, or `None` past the end.
    fn get(&self, index: usize) -> Option<NBodySample>;
}

/// In-memory dataset of graph samples.
#[derive(Debug, Clone, Default)]
pub struct NBodyDataset {
    samples: Vec<NBodySample>,
}

impl NBodyDataset {
    pub fn new(samples: Vec<NBodySample>) -> Result<Self> {
        for s in &samples {
            s.validate()?;
        }
        Ok(Self { samples })
    }

    /// `len` random graphs; topology is shared when the config asks for it.
    pub fn synthetic<R: Rng + ?Sized>(config: &MockConfig, len: usize, rng: &mut R) -> Result<Self> {
        let shared = if config.shared_topology { Some(random_edges(config, rng)?) } else { None };
        let samples = (0..len)
            .map(|_| mock_sample(config, shared.as_deref(), rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { samples })
    }
}

impl Dataset for NBodyDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Option<NBodySample> {
        self.samples.get(index).cloned()
    }
}

pub struct DataLoader {
    dataset: Box<dyn Dataset>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
    epoch_counter: Cell<u64>,
}

impl DataLoader {
    /// Create a new DataLoader. A zero `batch_size` is treated as one.
    ///
    /// - `shuffle`: shuffle indices each epoch
    /// - `drop_last`: drop the last incomplete batch
    /// - `seed`: optional RNG seed for reproducible shuffling
    pub fn new(dataset: Box<dyn Dataset>, batch_size: usize, shuffle: bool, drop_last: bool, seed: Option<u64>) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            drop_last,
            seed,
            epoch_counter: Cell::new(0),
        }
    }

    /// Number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Current epoch counter (incremented by each shuffled `iter()` call).
    pub fn epoch(&self) -> u64 {
        self.epoch_counter.get()
    }

    pub fn iter(&self) -> DataLoaderIter<'_> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();

        if self.shuffle {
            let epoch = self.epoch_counter.get();
            self.epoch_counter.set(epoch + 1);
            match self.seed {
                Some(seed) => {
                    let mut rng = rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(epoch));
                    indices.shuffle(&mut rng);
                }
                None => indices.shuffle(&mut rand::thread_rng()),
            }
        }

        DataLoaderIter { loader: self, indices, pos: 0 }
    }
}

/// Iterator over collated batches of one epoch.
pub struct DataLoaderIter<'a> {
    loader: &'a DataLoader,
    indices: Vec<usize>,
    pos: usize,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Result<NBodyBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.indices.len();
        if self.pos >= n {
            return None;
        }

        let end = (self.pos + self.loader.batch_size).min(n);
        if self.loader.drop_last && end - self.pos < self.loader.batch_size {
            return None;
        }

        let dataset = &self.loader.dataset;
        let samples: Result<Vec<NBodySample>> = self.indices[self.pos..end]
            .iter()
            .map(|&i| dataset.get(i).ok_or(GastError::IndexOutOfRange { index: i, size: dataset.len() }))
            .collect();
        self.pos = end;

        Some(samples.and_then(|s| NBodyBatch::collate(&s)))
    }
}
