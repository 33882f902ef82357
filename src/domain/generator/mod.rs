pub mod arrival;
pub mod duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded generator, or one seeded from the thread RNG when no seed is configured.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}
