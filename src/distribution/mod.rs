//! Uniform random page selection
//!
//! Every worker draws page indexes from its own uniform distribution over
//! `[0, num_pages)`. The distribution generates page numbers rather than byte
//! offsets; the worker multiplies by the page size, which keeps every access
//! naturally page-aligned.
//!
//! # Performance
//!
//! Uses the xoshiro256++ PRNG, which is very fast and has good statistical
//! properties. This matters because `next_page()` runs once per memory
//! access in the hot loop.
//!
//! # Example
//!
//! ```
//! use mmapbench::distribution::UniformPageDistribution;
//!
//! let mut dist = UniformPageDistribution::new();
//!
//! let page = dist.next_page(1024);
//! assert!(page < 1024);
//!
//! // Worker converts to a byte offset:
//! let offset = page * 4096; // Always 4K-aligned
//! ```

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform page-index distribution
///
/// Generates page numbers with equal probability across the entire range.
/// Each instance owns its PRNG; instances are never shared between threads,
/// so the hot path has no synchronization.
pub struct UniformPageDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformPageDistribution {
    /// Create a new distribution with a random seed
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a new distribution with a specific seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Next page index, uniform in `[0, num_pages)`
    #[inline(always)]
    pub fn next_page(&mut self, num_pages: u64) -> u64 {
        if num_pages == 0 {
            return 0;
        }
        self.rng.gen_range(0..num_pages)
    }
}

impl Default for UniformPageDistribution {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_pages_basic() {
        let mut dist = UniformPageDistribution::new();

        for _ in 0..100 {
            let page = dist.next_page(1000);
            assert!(page < 1000);
        }
    }

    #[test]
    fn test_uniform_pages_zero_range() {
        let mut dist = UniformPageDistribution::new();
        assert_eq!(dist.next_page(0), 0);
    }

    #[test]
    fn test_uniform_pages_seeded() {
        let mut dist1 = UniformPageDistribution::with_seed(12345);
        let mut dist2 = UniformPageDistribution::with_seed(12345);

        // Same seed should produce the same sequence
        for _ in 0..10 {
            assert_eq!(dist1.next_page(1000), dist2.next_page(1000));
        }
    }

    #[test]
    fn test_uniform_pages_coverage() {
        let mut dist = UniformPageDistribution::with_seed(42);
        let num_pages = 100u64;
        let mut buckets = vec![0u32; 10];

        for _ in 0..10000 {
            let page = dist.next_page(num_pages);
            let bucket = (page * 10 / num_pages) as usize;
            if bucket < 10 {
                buckets[bucket] += 1;
            }
        }

        // Each bucket should hold roughly 1000 samples (10000 / 10).
        // Allow 20% deviation for randomness.
        for count in buckets {
            assert!(
                count > 800 && count < 1200,
                "Bucket count {} outside expected range",
                count
            );
        }
    }

    #[test]
    fn test_uniform_pages_one_gib_alignment() {
        // A 1 GiB region has 262144 pages; every generated offset must stay
        // inside the region and land on a 4096-byte boundary.
        let mut dist = UniformPageDistribution::with_seed(7);
        let num_pages = (1u64 << 30) / 4096;

        for _ in 0..10000 {
            let offset = dist.next_page(num_pages) * 4096;
            assert!(offset < (1u64 << 30));
            assert_eq!(offset % 4096, 0);
        }
    }

    #[test]
    fn test_uniform_pages_large_range() {
        let mut dist = UniformPageDistribution::new();
        let num_pages = 1024 * 1024 * 1024u64;

        for _ in 0..100 {
            let page = dist.next_page(num_pages);
            assert!(page < num_pages);
        }
    }
}
