//! Determinization: sampling concrete hidden states from an information set.
//!
//! A searcher in an imperfect-information game knows, for every hidden seat,
//! which cards that seat *could* hold and how many it *must* hold. [`deal`]
//! samples one concrete assignment consistent with those constraints, so a
//! perfect-information search can run against it.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use rand::Rng;
use thiserror::Error;
use tracing::trace;

/// Errors raised while sampling a determinization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeterminizeError {
    #[error("{distinct} distinct cards in the information set, but quotas require {required}")]
    QuotaMismatch { distinct: usize, required: usize },

    #[error("seat {seat} needs more cards than its candidate pool still holds")]
    Exhausted { seat: usize },

    #[error("a card is forced toward more than one seat at once")]
    Contested,

    #[error("no seat with remaining quota can take one of the cards")]
    Unplaceable,
}

/// What one hidden seat may and must hold.
#[derive(Debug, Clone)]
pub struct SeatConstraint<C> {
    /// Cards this seat could possibly hold.
    pub candidates: HashSet<C>,
    /// Exact number of cards this seat holds.
    pub quota: usize,
}

impl<C: Copy + Eq + Hash> SeatConstraint<C> {
    pub fn new(candidates: impl IntoIterator<Item = C>, quota: usize) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            quota,
        }
    }
}

/// Remaining hand sizes for a round-based card game.
///
/// Every completed round consumed one card per seat; in the round in
/// progress, the `plays_in_round` seats starting from `leader` have played
/// one more.
pub fn remaining_quotas(
    hand_size: usize,
    completed_rounds: usize,
    leader: usize,
    plays_in_round: usize,
    seats: usize,
) -> Vec<usize> {
    let mut quotas = vec![hand_size.saturating_sub(completed_rounds); seats];
    for i in 0..plays_in_round {
        let seat = (leader + i) % seats;
        quotas[seat] = quotas[seat].saturating_sub(1);
    }
    quotas
}

/// Sample one assignment of the unseen cards to the hidden seats.
///
/// The distinct cards across all candidate sets must exactly cover the
/// quotas. Cards a single seat can hold are assigned first; the rest are
/// placed uniformly at random, except where feasibility forces a card to
/// the one seat whose remaining pool has no slack. The procedure is greedy,
/// so a pathologically overlapping information set can still fail with
/// [`DeterminizeError::Contested`] even when a valid assignment exists;
/// callers resample in that case.
pub fn deal<C, R>(
    constraints: &[SeatConstraint<C>],
    rng: &mut R,
) -> Result<Vec<HashSet<C>>, DeterminizeError>
where
    C: Copy + Eq + Hash + fmt::Debug,
    R: Rng,
{
    let required: usize = constraints.iter().map(|c| c.quota).sum();
    let mut unassigned: HashSet<C> = HashSet::new();
    for c in constraints {
        unassigned.extend(c.candidates.iter().copied());
    }
    if unassigned.len() != required {
        return Err(DeterminizeError::QuotaMismatch {
            distinct: unassigned.len(),
            required,
        });
    }

    let seats = constraints.len();
    let mut hands: Vec<HashSet<C>> = vec![HashSet::new(); seats];

    // Cards only one seat can hold have no freedom; place them first.
    let singles: Vec<C> = unassigned
        .iter()
        .copied()
        .filter(|card| holders(constraints, *card).count() == 1)
        .collect();
    for card in singles {
        let seat = holders(constraints, card).next().ok_or(DeterminizeError::Unplaceable)?;
        if hands[seat].len() >= constraints[seat].quota {
            return Err(DeterminizeError::Exhausted { seat });
        }
        hands[seat].insert(card);
        unassigned.remove(&card);
    }

    let mut pool: Vec<C> = unassigned.iter().copied().collect();
    while !pool.is_empty() {
        let card = pool.swap_remove(rng.gen_range(0..pool.len()));
        unassigned.remove(&card);

        // A seat whose remaining candidates exactly cover its remaining
        // need must receive every one of them.
        let mut forced: Option<usize> = None;
        for (seat, c) in constraints.iter().enumerate() {
            let need = c.quota - hands[seat].len();
            if need == 0 {
                continue;
            }
            let avail = c.candidates.iter().filter(|k| **k == card || unassigned.contains(k)).count();
            if avail < need {
                return Err(DeterminizeError::Exhausted { seat });
            }
            if avail == need && c.candidates.contains(&card) {
                if forced.replace(seat).is_some() {
                    return Err(DeterminizeError::Contested);
                }
            }
        }

        let seat = match forced {
            Some(seat) => seat,
            None => {
                let open: Vec<usize> = (0..seats)
                    .filter(|&s| {
                        constraints[s].candidates.contains(&card)
                            && hands[s].len() < constraints[s].quota
                    })
                    .collect();
                if open.is_empty() {
                    return Err(DeterminizeError::Unplaceable);
                }
                open[rng.gen_range(0..open.len())]
            }
        };
        hands[seat].insert(card);
    }

    trace!(
        seats,
        cards = required,
        "sampled determinization"
    );
    Ok(hands)
}

fn holders<'a, C: Copy + Eq + Hash>(
    constraints: &'a [SeatConstraint<C>],
    card: C,
) -> impl Iterator<Item = usize> + 'a {
    constraints
        .iter()
        .enumerate()
        .filter(move |(_, c)| c.candidates.contains(&card))
        .map(|(seat, _)| seat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    fn valid(hands: &[HashSet<u8>], constraints: &[SeatConstraint<u8>]) {
        for (seat, (hand, c)) in hands.iter().zip(constraints).enumerate() {
            assert_eq!(hand.len(), c.quota, "seat {seat} quota");
            assert!(hand.is_subset(&c.candidates), "seat {seat} candidates");
        }
        let total: usize = hands.iter().map(HashSet::len).sum();
        let distinct: HashSet<u8> = hands.iter().flatten().copied().collect();
        assert_eq!(total, distinct.len(), "duplicate card across hands");
    }

    #[test]
    fn test_deal_disjoint_pools() {
        let constraints = vec![
            SeatConstraint::new([1, 2, 3], 3),
            SeatConstraint::new([4, 5], 2),
        ];
        let hands = deal(&constraints, &mut rng()).unwrap();
        valid(&hands, &constraints);
        assert_eq!(hands[0], HashSet::from([1, 2, 3]));
        assert_eq!(hands[1], HashSet::from([4, 5]));
    }

    #[test]
    fn test_deal_overlapping_pools() {
        let constraints = vec![
            SeatConstraint::new([1, 2, 3, 4], 2),
            SeatConstraint::new([1, 2, 3, 4], 2),
        ];
        let mut r = rng();
        for _ in 0..25 {
            let hands = deal(&constraints, &mut r).unwrap();
            valid(&hands, &constraints);
        }
    }

    #[test]
    fn test_deal_forced_single() {
        // Card 9 appears in only one candidate set; it must land there even
        // though that seat could also take shared cards.
        let constraints = vec![
            SeatConstraint::new([1, 2, 9], 2),
            SeatConstraint::new([1, 2], 1),
        ];
        let mut r = rng();
        for _ in 0..25 {
            let hands = deal(&constraints, &mut r).unwrap();
            valid(&hands, &constraints);
            assert!(hands[0].contains(&9));
        }
    }

    #[test]
    fn test_deal_tight_pool_is_forced() {
        // Seat 1 can only hold {4, 5} and needs both; seat 0 shares them
        // but must take its cards elsewhere.
        let constraints = vec![
            SeatConstraint::new([1, 2, 3, 4, 5], 3),
            SeatConstraint::new([4, 5], 2),
        ];
        let mut r = rng();
        for _ in 0..25 {
            let hands = deal(&constraints, &mut r).unwrap();
            valid(&hands, &constraints);
            assert_eq!(hands[1], HashSet::from([4, 5]));
        }
    }

    #[test]
    fn test_deal_quota_mismatch() {
        let constraints = vec![
            SeatConstraint::new([1, 2, 3], 2),
            SeatConstraint::new([1, 2, 3], 2),
        ];
        assert_eq!(
            deal(&constraints, &mut rng()),
            Err(DeterminizeError::QuotaMismatch {
                distinct: 3,
                required: 4
            })
        );
    }

    #[test]
    fn test_deal_three_seats_contending_for_two_cards() {
        // Three seats each need one card, but only cards {1, 2} exist plus
        // a third card covering the count. Seats 0 and 1 both need a card
        // from {1, 2} while seat 2 needs one of {1, 2} too.
        let constraints = vec![
            SeatConstraint::new([1, 2], 1),
            SeatConstraint::new([1, 2], 1),
            SeatConstraint::new([1, 2, 3], 1),
        ];
        // Any deal must give card 3 to seat 2. Greedy order can also detect
        // the tightness and fail; either way no invalid hands come back.
        let mut r = rng();
        for _ in 0..25 {
            match deal(&constraints, &mut r) {
                Ok(hands) => {
                    valid(&hands, &constraints);
                    assert!(hands[2].contains(&3));
                }
                Err(e) => assert!(matches!(
                    e,
                    DeterminizeError::Contested | DeterminizeError::Exhausted { .. }
                )),
            }
        }
    }

    #[test]
    fn test_deal_infeasible_shared_pool() {
        // Three seats each need one card from {1, 2}: only two cards for
        // three slots is impossible, and the card count gives it away.
        let constraints = vec![
            SeatConstraint::new([1, 2], 1),
            SeatConstraint::new([1, 2], 1),
            SeatConstraint::new([1, 2], 1),
        ];
        assert_eq!(
            deal(&constraints, &mut rng()),
            Err(DeterminizeError::QuotaMismatch {
                distinct: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_deal_same_single_candidate_twice() {
        // Two seats each require card 1 and nothing else. No silent
        // assignment: the deal must refuse.
        let constraints = vec![
            SeatConstraint::new([1], 1),
            SeatConstraint::new([1], 1),
        ];
        assert!(deal(&constraints, &mut rng()).is_err());
    }

    #[test]
    fn test_remaining_quotas() {
        // 8-card hands, 2 completed rounds, seat 3 led the current round
        // and two seats have played in it.
        let quotas = remaining_quotas(8, 2, 3, 2, 4);
        assert_eq!(quotas, vec![5, 6, 6, 5]);
    }

    #[test]
    fn test_deal_empty() {
        let constraints: Vec<SeatConstraint<u8>> = vec![];
        let hands = deal(&constraints, &mut rng()).unwrap();
        assert!(hands.is_empty());
    }
}
