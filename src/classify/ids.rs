use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ID_LEN: usize = 8;

/// Hands out 8-character alphanumeric ids, never the same one twice.
#[derive(Debug)]
pub struct IdGenerator {
    rng: StdRng,
    issued: HashSet<String>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            issued: HashSet::new(),
        }
    }

    /// Deterministic sequence, for tests and reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    pub fn next_id(&mut self) -> String {
        loop {
            let id: String = (&mut self.rng)
                .sample_iter(&Alphanumeric)
                .take(ID_LEN)
                .map(char::from)
                .collect();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}
