//! Animation Orchestrator (spec §4.10).
//!
//! Combines however many animated textures a model references into one
//! loop: the loop length is the least common multiple of each texture's own
//! animation length, and frames are produced lazily, one per distinct tick,
//! rather than eagerly materializing every texture's pixel data up front.
//! Grounded on the teacher's clip/track duration math
//! (`panxinmiao-myth/src/animation/clip.rs`), which computes a combined
//! playback length from several independently-timed tracks the same way.

use crate::texture::AnimationMeta;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        return a.max(b);
    }
    a / gcd(a, b) * b
}

/// Least common multiple of several animated textures' individual loop
/// durations. Durations of `0` are ignored; an empty or all-zero input
/// degenerates to `1` tick — the single-frame fallback.
#[must_use]
pub fn loop_duration_ticks(durations: &[u64]) -> u64 {
    durations.iter().copied().filter(|d| *d > 0).fold(1, lcm)
}

/// The frame index `meta` shows at `tick`, wrapping at its own total
/// duration (not the combined loop length).
#[must_use]
pub fn frame_at(meta: &AnimationMeta, tick: u64) -> u32 {
    if meta.frames.is_empty() {
        return 0;
    }
    let total = meta.total_duration_ticks().max(1);
    let t = tick % total;
    let mut acc = 0u64;
    for f in &meta.frames {
        acc += u64::from(f.duration_ticks);
        if t < acc {
            return f.index;
        }
    }
    meta.frames.last().map_or(0, |f| f.index)
}

/// A lazily-enumerated sequence of ticks spanning one full combined loop.
/// When none of the model's textures are animated, `metas` is empty and the
/// sequence degenerates to the single tick `0`.
pub struct AnimationSequence {
    total_ticks: u64,
}

impl AnimationSequence {
    #[must_use]
    pub fn new(metas: &[AnimationMeta]) -> Self {
        let durations: Vec<u64> = metas.iter().map(AnimationMeta::total_duration_ticks).collect();
        Self {
            total_ticks: loop_duration_ticks(&durations),
        }
    }

    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Ticks `0..total_ticks`, produced lazily — nothing here pre-renders
    /// frames, it only hands out the tick indices to render.
    pub fn ticks(&self) -> impl Iterator<Item = u64> {
        0..self.total_ticks.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::AnimationFrame;

    fn meta(durations: &[u32]) -> AnimationMeta {
        AnimationMeta {
            frame_height: 16,
            frames: durations
                .iter()
                .enumerate()
                .map(|(i, d)| AnimationFrame { index: i as u32, duration_ticks: *d })
                .collect(),
            interpolate: false,
        }
    }

    #[test]
    fn no_animated_textures_yields_single_frame() {
        let seq = AnimationSequence::new(&[]);
        assert_eq!(seq.total_ticks(), 1);
        assert_eq!(seq.ticks().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn loop_duration_is_lcm_of_inputs() {
        assert_eq!(loop_duration_ticks(&[4, 6]), 12);
        assert_eq!(loop_duration_ticks(&[3, 0, 5]), 15);
    }

    #[test]
    fn frame_at_wraps_within_own_duration() {
        let m = meta(&[2, 3]);
        assert_eq!(frame_at(&m, 0), 0);
        assert_eq!(frame_at(&m, 1), 0);
        assert_eq!(frame_at(&m, 2), 1);
        assert_eq!(frame_at(&m, 4), 1);
        assert_eq!(frame_at(&m, 5), 0);
    }
}
