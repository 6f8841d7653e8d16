// CPU affinity mask helpers

use std::fmt;

/// Width of the mask in bits. Processors past this index are not represented.
pub const MASK_BITS: usize = u64::BITS as usize;

/// Set of logical CPUs a thread may be scheduled on, as reported by the host.
///
/// Bit `n` set means CPU `n` is allowed. The value is a point-in-time
/// observation: the same thread can report a different mask a moment later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AffinityMask(u64);

impl AffinityMask {
    /// Zero mask, also used as the "could not query" sentinel.
    pub const EMPTY: AffinityMask = AffinityMask(0);

    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Builds a mask from CPU indices. Indices at or past [`MASK_BITS`] are
    /// dropped.
    pub fn from_cpus<I: IntoIterator<Item = usize>>(cpus: I) -> Self {
        let bits = cpus
            .into_iter()
            .filter(|&cpu| cpu < MASK_BITS)
            .fold(0u64, |acc, cpu| acc | (1u64 << cpu));
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of CPUs in the mask.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn contains(self, cpu: usize) -> bool {
        cpu < MASK_BITS && self.0 & (1u64 << cpu) != 0
    }

    /// Ascending iterator over the CPU indices in the mask.
    pub fn cpus(self) -> Cpus {
        Cpus { remaining: self.0 }
    }

    /// Compact CPU list such as `0-3,6`. Empty masks render as `none`.
    pub fn cpu_list(self) -> String {
        if self.is_empty() {
            return "none".to_string();
        }

        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for cpu in self.cpus() {
            match ranges.last_mut() {
                Some((_, end)) if *end + 1 == cpu => *end = cpu,
                _ => ranges.push((cpu, cpu)),
            }
        }

        ranges
            .iter()
            .map(|&(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Zero-padded lowercase hex with at least `width` digits, no prefix.
    pub fn to_hex(self, width: usize) -> String {
        format!("{:0width$x}", self.0, width = width)
    }
}

impl From<u64> for AffinityMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for AffinityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for AffinityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Iterator returned by [`AffinityMask::cpus`].
#[derive(Debug, Clone)]
pub struct Cpus {
    remaining: u64,
}

impl Iterator for Cpus {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let cpu = self.remaining.trailing_zeros() as usize;
        // clear lowest set bit
        self.remaining &= self.remaining - 1;
        Some(cpu)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Cpus {}
