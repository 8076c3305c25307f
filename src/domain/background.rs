//! Background clip selection.

use crate::domain::media::BackgroundAsset;
use crate::error::ConfigurationError;
use rand::seq::SliceRandom;
use rand::Rng;

/// Pick a background uniformly at random, never repeating `previous` unless
/// the pool has a single clip.
pub fn select_background<'a, R: Rng + ?Sized>(
    pool: &'a [BackgroundAsset],
    previous: Option<&BackgroundAsset>,
    rng: &mut R,
) -> Result<&'a BackgroundAsset, ConfigurationError> {
    if pool.len() == 1 {
        return Ok(&pool[0]);
    }

    let candidates: Vec<&BackgroundAsset> = pool
        .iter()
        .filter(|asset| previous.map_or(true, |p| p.path != asset.path))
        .collect();

    // Every clip equals `previous` only when the pool holds duplicates
    let candidates = if candidates.is_empty() {
        pool.iter().collect()
    } else {
        candidates
    };

    candidates
        .choose(rng)
        .copied()
        .ok_or(ConfigurationError::EmptyPool)
}

/// Where to start reading the background so it covers `audio_ms` of voiceover.
///
/// `fraction` in `[0, 1)` is drawn up front so the choice stays reproducible.
pub fn pick_start_offset(background_ms: u64, audio_ms: u64, fraction: f64) -> u64 {
    let slack = background_ms.saturating_sub(audio_ms);
    let offset = (slack as f64 * fraction.clamp(0.0, 1.0)).floor() as u64;
    offset.min(slack)
}
