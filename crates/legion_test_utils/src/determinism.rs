//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical results
//! given identical state and input.
//!
//! # Testing Strategy
//!
//! One tick must produce bit-for-bit identical state from identical state
//! and input, because hit timing depends on exact threshold arithmetic.
//! Sources of non-determinism include:
//!
//! - **Unseeded randomness**: Stab pre-rolls draw from a generator seeded
//!   by the battle seed and the tick number, never from the OS.
//!
//! - **HashMap iteration order**: The battle keeps ordered `Vec`s of handles
//!   and never iterates a hashed collection.
//!
//! - **Floating-point evaluation order**: Every tick walks the same lists in
//!   the same order, so the same operations run on the same operands.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual subsystems (animation, flight, towers)
//! 2. **Property tests**: Random input sequences must still replay exactly
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on threads all match

use std::thread;

use legion_core::input::InputSnapshot;
use legion_core::simulation::Battle;
use tracing::debug;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use legion_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice under a scripted input and compare final hashes.
///
/// `script` maps a tick number to the input held during that tick.
pub fn verify_battle_determinism<F, S>(setup_fn: F, script: S, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
    S: Fn(u64) -> InputSnapshot,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |battle| {
            let input = script(battle.tick_count());
            battle.tick(&input);
        },
        Battle::state_hash,
    );
    result.is_deterministic
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run N battles on scoped threads with idle input and collect final hashes.
///
/// # Panics
///
/// Panics if a battle thread panics.
pub fn run_parallel_battles_scoped<F>(
    setup_fn: F,
    num_battles: usize,
    num_ticks: u64,
) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let input = InputSnapshot::default();
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    battle.run(num_ticks, &input);
                    battle.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelBattleResult {
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` if they diverge at that
/// tick.
pub fn find_first_divergence<F, S>(setup_fn: F, script: S, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
    S: Fn(u64) -> InputSnapshot,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let input = script(tick - 1);
        first.tick(&input);
        second.tick(&input);

        if first.state_hash() != second.state_hash() {
            debug!(tick, "Battles diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a save/load round-trip mid-battle changes nothing.
///
/// Runs `num_ticks`, saves, restores, runs `num_ticks` more on both copies,
/// and compares.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let input = InputSnapshot::default();
    let mut battle = setup_fn();
    battle.run(num_ticks, &input);

    let Ok(bytes) = battle.serialize() else {
        return false;
    };
    let Ok(mut restored) = Battle::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != battle.state_hash() {
        return false;
    }

    battle.run(num_ticks, &input);
    restored.run(num_ticks, &input);
    battle.state_hash() == restored.state_hash()
}

/// Proptest strategies for input sequences.
pub mod strategies {
    use legion_core::input::{InputSnapshot, KeySet, Pointer};
    use proptest::prelude::*;

    /// Generate any combination of held keys.
    pub fn arb_key_set() -> impl Strategy<Value = KeySet> {
        any::<[bool; 6]>().prop_map(|[w, t, g, r, v, space]| KeySet {
            w,
            t,
            g,
            r,
            v,
            space,
        })
    }

    /// Generate a pointer anywhere on screen.
    pub fn arb_pointer() -> impl Strategy<Value = Pointer> {
        (0.0..=1.0f64, 0.0..=1.0f64, any::<bool>())
            .prop_map(|(x, y, is_locked)| Pointer { x, y, is_locked })
    }

    /// Generate one tick of input.
    pub fn arb_input() -> impl Strategy<Value = InputSnapshot> {
        (arb_key_set(), arb_pointer()).prop_map(|(keys, pointer)| InputSnapshot { keys, pointer })
    }

    /// Generate a sequence of per-tick inputs.
    pub fn arb_input_sequence(max_len: usize) -> impl Strategy<Value = Vec<InputSnapshot>> {
        proptest::collection::vec(arb_input(), 1..max_len)
    }
}
