//! Seedable, domain-separated randomness for slide outcomes.
//!
//! Every random roll in the core draws from one of these streams so a run
//! replays identically for the same user seed.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Independent RNG streams owned by a descent session.
#[derive(Debug)]
pub struct RngBundle {
    seed: u64,
    arrest: RefCell<CountingRng<SmallRng>>,
    injury: RefCell<CountingRng<SmallRng>>,
    gear: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            arrest: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"arrest"))),
            injury: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"injury"))),
            gear: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"gear"))),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Self-arrest success and tumble rolls.
    #[must_use]
    pub fn arrest(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.arrest.borrow_mut()
    }

    /// Injury chance and severity rolls.
    #[must_use]
    pub fn injury(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.injury.borrow_mut()
    }

    /// Gear damage rolls.
    #[must_use]
    pub fn gear(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.gear.borrow_mut()
    }

    /// Total draws across all streams.
    #[must_use]
    pub fn total_draws(&self) -> u64 {
        self.arrest.borrow().draws() + self.injury.borrow().draws() + self.gear.borrow().draws()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    for (dst, src) in seed_bytes.iter_mut().zip(digest.iter()) {
        *dst = *src;
    }
    u64::from_le_bytes(seed_bytes)
}
