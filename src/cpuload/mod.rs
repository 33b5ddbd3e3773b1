//! Background CPU loader
//!
//! One auxiliary thread keeps a core saturated with transcendental
//! floating-point work (exponential/logarithm round-trips, 10 000 per round)
//! as a noise source competing with the workers. It has no observable output
//! besides CPU utilization and never reads the workers' stop flag.
//!
//! The loader carries its own cancellation token so the thread can be joined
//! at process exit and in tests; during the measured run the token is never
//! signalled.

use crate::util::cancel::CancelToken;
use crate::Result;
use anyhow::Context;
use std::hint::black_box;
use std::thread::JoinHandle;

/// Floating-point round-trips per cancellation check
const OPS_PER_ROUND: u32 = 10_000;

/// Handle to the running loader thread
pub struct CpuLoader {
    handle: JoinHandle<u64>,
    cancel: CancelToken,
}

impl CpuLoader {
    /// Spawn the loader thread
    pub fn spawn() -> Result<Self> {
        let cancel = CancelToken::new();
        let thread_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name("cpuload".to_string())
            .spawn(move || run_loader(&thread_cancel))
            .context("Failed to spawn CPU loader")?;
        Ok(Self { handle, cancel })
    }

    /// Signal the loader and wait for it, returning its round count
    pub fn stop(self) -> Result<u64> {
        self.cancel.cancel();
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("CPU loader panicked"))
    }
}

/// Burn the core until cancelled, checking the token once per round
///
/// `exp(ln(x))` is an identity, so the chain never drifts toward a value the
/// FPU handles specially (0, infinity, NaN); `black_box` keeps the compiler
/// from collapsing the round-trip.
fn run_loader(cancel: &CancelToken) -> u64 {
    let mut rounds = 0u64;
    let mut x = 1.5f64;
    while !cancel.is_cancelled() {
        for _ in 0..OPS_PER_ROUND {
            x = black_box(black_box(x).ln().exp());
        }
        rounds += 1;
    }
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_loader_spawns_and_stops() {
        let loader = CpuLoader::spawn().unwrap();
        thread::sleep(Duration::from_millis(20));
        // stop() returning at all proves the token reached the thread.
        loader.stop().unwrap();
    }

    #[test]
    fn test_loader_performs_work() {
        let loader = CpuLoader::spawn().unwrap();
        thread::sleep(Duration::from_millis(100));
        let rounds = loader.stop().unwrap();
        assert!(rounds > 0, "loader completed no rounds in 100ms");
    }

    #[test]
    fn test_loader_token_is_private() {
        // The loader's token is its own; cancelling an unrelated token must
        // not stop it.
        let unrelated = CancelToken::new();
        let loader = CpuLoader::spawn().unwrap();

        unrelated.cancel();
        thread::sleep(Duration::from_millis(20));

        let rounds = loader.stop().unwrap();
        assert!(rounds > 0);
    }
}
