//! Run identifiers.
//!
//! A run id is `<unix millis, hex>-<8 random hex digits>`: sortable by start
//! time and unique enough to tell concurrent runs apart in logs.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Generate a fresh run id from `rng`.
///
/// The caller owns the randomness source so runs are reproducible in tests.
pub fn generate_run_id<R: Rng + ?Sized>(rng: &mut R) -> String {
  let millis = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis())
    .unwrap_or_default();
  format!("{:x}-{:08x}", millis, rng.r#gen::<u32>())
}
