//! Simulated system resource stats

use rand::Rng;
use serde::Serialize;

/// Cosmetic CPU, memory and network readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    /// CPU load percentage
    pub cpu: u8,
    /// Memory usage percentage
    pub mem: u8,
    /// Network throughput in Mbps
    pub net: u16,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self {
            cpu: 12,
            mem: 24,
            net: 120,
        }
    }
}

impl SystemStats {
    /// Draw a fresh reading
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cpu: rng.gen_range(5..25),
            mem: rng.gen_range(20..30),
            net: rng.gen_range(100..150),
        }
    }

    /// Status line used in the system instruction
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "CPU {}%, Memory {}%, Network {} Mbps",
            self.cpu, self.mem, self.net
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_sample_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let stats = SystemStats::sample(&mut rng);
            assert!((5..25).contains(&stats.cpu));
            assert!((20..30).contains(&stats.mem));
            assert!((100..150).contains(&stats.net));
        }
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            SystemStats::default().status_line(),
            "CPU 12%, Memory 24%, Network 120 Mbps"
        );
    }
}
