use crate::config::Config;
use crate::peaks::Peak;

const ANCHOR_BITS: u32 = 12;
const TARGET_BITS: u32 = 10;
const DELTA_BITS: u32 = 10;

const ANCHOR_MASK: u32 = (1 << ANCHOR_BITS) - 1;
const TARGET_MASK: u32 = (1 << TARGET_BITS) - 1;
const DELTA_MASK: u32 = (1 << DELTA_BITS) - 1;

/// One fingerprint hash: the packed 32-bit value and the anchor peak's time
/// frame, which becomes the offset used for time-coherence checks during
/// matching (spec section 4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintHash {
    pub value: u32,
    pub anchor_time_idx: u32,
}

/// Packs `(f_anchor, f_target, delta_t)` into a 32-bit value: 12 bits of
/// anchor frequency bin, 10 bits of target frequency bin, 10 bits of frame
/// delta. Each field is masked to its width rather than range-checked —
/// bins or deltas that overflow their field collide, as in the reference
/// implementation.
pub fn pack_hash(f_anchor_bin: u32, f_target_bin: u32, delta_t: u32) -> u32 {
    ((f_anchor_bin & ANCHOR_MASK) << (TARGET_BITS + DELTA_BITS))
        | ((f_target_bin & TARGET_MASK) << DELTA_BITS)
        | (delta_t & DELTA_MASK)
}

/// Unpacks a hash back into its three fields. Exposed mainly for tests and
/// diagnostics; matching only ever needs the packed `value`.
pub fn unpack_hash(hash: u32) -> (u32, u32, u32) {
    let delta_t = hash & DELTA_MASK;
    let f_target_bin = (hash >> DELTA_BITS) & TARGET_MASK;
    let f_anchor_bin = (hash >> (TARGET_BITS + DELTA_BITS)) & ANCHOR_MASK;
    (f_anchor_bin, f_target_bin, delta_t)
}

/// Builds the constellation pairing and hash set for a peak list, per spec
/// section 4.4. Peaks are first ordered by `(time_idx, freq_idx)` (the
/// order [`crate::peaks::find_peaks`] already produces). For each anchor,
/// candidate targets are every later peak whose time delta falls in
/// `[target_zone_t_start, target_zone_t_start + target_zone_t_len)` (and,
/// if set, whose frequency distance is within `target_zone_f_len`); only
/// the first `fan_value` candidates, ordered by increasing delta_t then
/// increasing frequency bin, are kept.
pub fn generate_hashes(peaks: &[Peak], cfg: &Config) -> Vec<FingerprintHash> {
    let mut ordered: Vec<&Peak> = peaks.iter().collect();
    ordered.sort_by_key(|p| (p.time_idx, p.freq_idx));

    let t_start = cfg.target_zone_t_start as i64;
    let t_end = t_start + cfg.target_zone_t_len as i64;

    let mut hashes = Vec::new();

    for (i, anchor) in ordered.iter().enumerate() {
        let mut candidates: Vec<(u32, &Peak)> = Vec::new();

        for target in &ordered[i + 1..] {
            let delta_t = target.time_idx as i64 - anchor.time_idx as i64;
            if delta_t < t_start {
                continue;
            }
            if delta_t >= t_end {
                break;
            }
            if let Some(f_len) = cfg.target_zone_f_len {
                let delta_f = (target.freq_idx as i64 - anchor.freq_idx as i64).unsigned_abs();
                if delta_f > f_len as u64 {
                    continue;
                }
            }
            candidates.push((delta_t as u32, target));
        }

        candidates.sort_by_key(|(delta_t, target)| (*delta_t, target.freq_idx));

        for (delta_t, target) in candidates.into_iter().take(cfg.fan_value) {
            let value = pack_hash(anchor.freq_idx as u32, target.freq_idx as u32, delta_t);
            hashes.push(FingerprintHash {
                value,
                anchor_time_idx: anchor.time_idx as u32,
            });
        }
    }

    hashes
}
