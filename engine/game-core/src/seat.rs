//! Seat identification.

use std::fmt;

/// A seat at the table. Using a newtype for type safety.
///
/// Seats are numbered clockwise from 0. In team games, seats alternate
/// between two teams: even seats form team 0, odd seats team 1 (the
/// convention of four-player trick-taking games, where partners sit
/// across from each other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat(pub u8);

impl Seat {
    /// Seat position as an index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The team this seat scores for.
    #[inline]
    pub fn team(self) -> usize {
        (self.0 % 2) as usize
    }

    /// The next seat in turn order at a table of `seats` players.
    #[inline]
    pub fn next(self, seats: u8) -> Seat {
        Seat((self.0 + 1) % seats)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}
