//! Outcome values for finished games.
//!
//! A game reports its result either as a single scalar (two players, one
//! number whose sign says who won) or as a pair of per-team totals (team
//! games where both sides accumulate points). The search tree accumulates
//! these values in node statistics, so both shapes share one trait.

use std::fmt;

use crate::seat::Seat;

/// An outcome value that search statistics can accumulate.
///
/// `value()` collapses the outcome to one scalar where positive favours
/// team 0; `signed_for` flips the sign for seats on the other team so a
/// node can always maximise from the perspective of the seat that acts.
pub trait Score: Clone + Default + PartialEq + fmt::Debug + 'static {
    /// Add another outcome into this accumulator, component-wise.
    fn accumulate(&mut self, other: &Self);

    /// The outcome as a single scalar, positive when team 0 is ahead.
    fn value(&self) -> f64;

    /// The outcome from the perspective of `seat`'s team (higher is better).
    #[inline]
    fn signed_for(&self, seat: Seat) -> f64 {
        if seat.team() == 0 {
            self.value()
        } else {
            -self.value()
        }
    }
}

/// A single-number outcome. Positive favours team 0 (for two-player games,
/// the first player), negative the opponent, zero a draw.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarScore(pub f64);

impl Score for ScalarScore {
    #[inline]
    fn accumulate(&mut self, other: &Self) {
        self.0 += other.0;
    }

    #[inline]
    fn value(&self) -> f64 {
        self.0
    }
}

/// Per-team point totals for a two-team game.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamScore(pub [f64; 2]);

impl TeamScore {
    /// Points scored by `team`.
    #[inline]
    pub fn team(&self, team: usize) -> f64 {
        self.0[team]
    }
}

impl Score for TeamScore {
    #[inline]
    fn accumulate(&mut self, other: &Self) {
        self.0[0] += other.0[0];
        self.0[1] += other.0[1];
    }

    /// The point differential, team 0 minus team 1.
    #[inline]
    fn value(&self) -> f64 {
        self.0[0] - self.0[1]
    }
}
