//! The arithmetic behind each RPC.
//!
//! Everything here is synchronous and transport-agnostic; the handlers in
//! [`crate::server::handlers`] drive these types from streams.

use std::sync::atomic::{AtomicI64, Ordering};

/// Multiply by ten, or `None` if the result does not fit in an `i32`.
pub fn times_ten(number: i32) -> Option<i32> {
    number.checked_mul(10)
}

/// Prime factors of a number in ascending order, with repetition.
///
/// Trial division by an increasing factor starting at 2. Inputs `<= 1`
/// (including negatives) have no factors. Once `factor * factor` exceeds the
/// remainder, the remainder is prime and is yielded as the last factor.
#[derive(Debug, Clone)]
pub struct PrimeFactors {
    remaining: i64,
    factor: i64,
}

impl PrimeFactors {
    pub fn new(number: i32) -> Self {
        Self {
            remaining: i64::from(number),
            factor: 2,
        }
    }
}

impl Iterator for PrimeFactors {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.remaining <= 1 {
            return None;
        }
        while self.remaining % self.factor != 0 {
            if self.factor * self.factor > self.remaining {
                self.factor = self.remaining;
                break;
            }
            self.factor += 1;
        }
        self.remaining /= self.factor;
        // Every factor divides the original i32, so it fits.
        Some(self.factor as i32)
    }
}

/// Running sum and count for the client-streaming average.
#[derive(Debug, Clone, Default)]
pub struct Average {
    sum: f64,
    count: u64,
}

impl Average {
    pub fn push(&mut self, number: f32) {
        self.sum += f64::from(number);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// The mean of everything pushed so far; `None` when nothing was pushed.
    pub fn mean(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / self.count as f64) as f32)
    }
}

/// The maximum seen so far, shared between the receive and send loops of a
/// bidirectional call.
///
/// The comparison and the update happen in a single atomic operation, so two
/// concurrent observers can never both report the same new maximum.
#[derive(Debug)]
pub struct RunningMax {
    // i64::MIN means "nothing observed yet"; every i32 is strictly larger.
    value: AtomicI64,
}

impl RunningMax {
    pub fn new() -> Self {
        Self {
            value: AtomicI64::new(i64::MIN),
        }
    }

    /// Record a number. Returns it if it is a new maximum.
    pub fn observe(&self, number: i32) -> Option<i32> {
        let previous = self.value.fetch_max(i64::from(number), Ordering::AcqRel);
        (i64::from(number) > previous).then_some(number)
    }

    pub fn current(&self) -> Option<i32> {
        match self.value.load(Ordering::Acquire) {
            i64::MIN => None,
            value => Some(value as i32),
        }
    }
}

impl Default for RunningMax {
    fn default() -> Self {
        Self::new()
    }
}
