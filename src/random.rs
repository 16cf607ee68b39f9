//! Uniform random numbers backed by the operating system CSPRNG.
//!
//! Every draw goes straight to the OS byte source. There is no seeded
//! generator in between, so rapid successive calls in a long running
//! process never share a stream.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Resolution of a single draw: 24 bits.
const UNIT_SCALE: f64 = (1u32 << 24) as f64;

#[derive(Error, Debug)]
pub enum RandomError {
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(#[from] rand::Error),
}

/// Returns a value in `[0, 1)` built from three secure random bytes.
pub fn random_unit_interval() -> Result<f64, RandomError> {
    let mut bytes = [0u8; 3];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(unit_from_bytes(bytes))
}

/// Little-endian 24-bit integer scaled down to `[0, 1)`.
fn unit_from_bytes([a, b, c]: [u8; 3]) -> f64 {
    let value = u32::from(a) | (u32::from(b) << 8) | (u32::from(c) << 16);
    f64::from(value) / UNIT_SCALE
}

/// A source of uniform draws in `[0, 1)`.
pub trait UniformSource {
    fn next_unit(&mut self) -> Result<f64, RandomError>;
}

/// Production source, delegates to [`random_unit_interval`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureSource;

impl UniformSource for SecureSource {
    fn next_unit(&mut self) -> Result<f64, RandomError> {
        random_unit_interval()
    }
}

/// Picks an index in `0..len`. `len` must be non-zero.
pub fn pick_index<S: UniformSource + ?Sized>(source: &mut S, len: usize) -> Result<usize, RandomError> {
    let unit = source.next_unit()?;
    let index = (unit * len as f64) as usize;
    Ok(index.min(len.saturating_sub(1)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed list of draws, then cycles through it again.
    pub(crate) struct ScriptedSource {
        draws: VecDeque<f64>,
    }

    impl ScriptedSource {
        pub(crate) fn new(draws: &[f64]) -> Self {
            Self {
                draws: draws.iter().copied().collect(),
            }
        }
    }

    impl UniformSource for ScriptedSource {
        fn next_unit(&mut self) -> Result<f64, RandomError> {
            let draw = self.draws.pop_front().unwrap_or(0.0);
            self.draws.push_back(draw);
            Ok(draw)
        }
    }

    #[test]
    fn test_unit_from_bytes_little_endian() {
        assert_eq!(unit_from_bytes([0, 0, 0]), 0.0);
        assert_eq!(unit_from_bytes([0, 0, 0x80]), 0.5);
        assert_eq!(unit_from_bytes([1, 0, 0]), 1.0 / UNIT_SCALE);
        assert!(unit_from_bytes([0xff, 0xff, 0xff]) < 1.0);
    }

    #[test]
    fn test_random_unit_interval_distribution() {
        const DRAWS: usize = 100_000;
        let mut sum = 0.0;
        let mut low_bytes = [false; 256];

        for _ in 0..DRAWS {
            let value = random_unit_interval().unwrap();
            assert!((0.0..1.0).contains(&value));
            sum += value;
            let low = (value * UNIT_SCALE) as u32 & 0xff;
            low_bytes[low as usize] = true;
        }

        let mean = sum / DRAWS as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean was {mean}");
        assert!(low_bytes.iter().all(|seen| *seen), "stuck low-order bits");
    }

    #[test]
    fn test_pick_index_stays_in_range() {
        let mut source = ScriptedSource::new(&[0.0, 0.5, 0.999_999_99]);
        assert_eq!(pick_index(&mut source, 4).unwrap(), 0);
        assert_eq!(pick_index(&mut source, 4).unwrap(), 2);
        assert_eq!(pick_index(&mut source, 4).unwrap(), 3);
    }

    #[test]
    fn test_secure_source_draws() {
        let mut source = SecureSource;
        for _ in 0..100 {
            let index = pick_index(&mut source, 7).unwrap();
            assert!(index < 7);
        }
    }
}
