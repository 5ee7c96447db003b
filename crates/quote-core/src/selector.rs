//! Random quote selection without immediate repetition

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::filter::CategoryFilter;
use crate::quote::Quote;

/// Picks quotes at random from a filtered pool
///
/// Within an unchanged filter the same position is never returned twice in a
/// row, as long as the pool has more than one quote. Changing the filter
/// resets that constraint.
#[derive(Debug)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
    last_category: CategoryFilter,
    last_index: Option<usize>,
}

impl RandomSelector<StdRng> {
    /// Create a selector seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for RandomSelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomSelector<R> {
    /// Create a selector with a caller-supplied random source
    pub fn with_rng(rng: R) -> Self {
        Self { rng, last_category: CategoryFilter::All, last_index: None }
    }

    /// Pick a quote from `pool`, which was listed with `category`
    ///
    /// Returns `None` for an empty pool.
    pub fn pick<'a>(&mut self, pool: &'a [Quote], category: &CategoryFilter) -> Option<&'a Quote> {
        if pool.is_empty() {
            return None;
        }

        let mut index = self.rng.gen_range(0..pool.len());
        if *category == self.last_category && pool.len() > 1 {
            while Some(index) == self.last_index {
                index = self.rng.gen_range(0..pool.len());
            }
        }

        self.last_category = category.clone();
        self.last_index = Some(index);
        pool.get(index)
    }

    /// Position returned by the most recent pick
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Filter used by the most recent pick
    pub fn last_category(&self) -> &CategoryFilter {
        &self.last_category
    }
}
