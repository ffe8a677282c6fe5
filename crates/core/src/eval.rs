// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Poker hand evaluator.
//!
//! [HandValue::eval] takes between 2 and 7 cards and returns a totally
//! ordered value, a category plus the tiebreaker ranks ordered by
//! multiplicity then rank. Values for fewer than 5 cards are partial
//! evaluations used for UI hints, pots are only adjudicated on full boards.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cards::{Card, Rank, Suit};

/// The rank category of a poker hand, in ascending strength order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HandCategory {
    /// No pair.
    HighCard = 1,
    /// One pair.
    Pair,
    /// Two pair.
    TwoPair,
    /// Three of a kind.
    Trips,
    /// Five consecutive ranks, the wheel A-2-3-4-5 counts 5 high.
    Straight,
    /// Five cards of one suit.
    Flush,
    /// Three of a kind and a pair.
    FullHouse,
    /// Four of a kind.
    Quads,
    /// A straight in one suit.
    StraightFlush,
    /// The ace high straight flush.
    RoyalFlush,
}

/// A comparable hand value.
///
/// Ordering compares the category first and then the tiebreaker ranks
/// lexicographically, equality is a true tie that splits the pot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandValue {
    category: HandCategory,
    ranks: Vec<u8>,
}

impl HandValue {
    /// Evaluates the best poker hand out of the given cards.
    ///
    /// Panics if called with no cards or more than 7 cards.
    pub fn eval(cards: &[Card]) -> HandValue {
        assert!(
            !cards.is_empty() && cards.len() <= 7,
            "eval takes 1 to 7 cards"
        );

        let mut counts = [0u8; 15];
        for card in cards {
            counts[card.rank().value() as usize] += 1;
        }

        // Straight flush first, checked on the flush suit ranks only.
        if let Some(suited) = flush_ranks(cards) {
            let mut present = [false; 15];
            for &r in &suited {
                present[r as usize] = true;
            }

            if let Some(high) = straight_high(&present) {
                let category = if high == Rank::Ace.value() {
                    HandCategory::RoyalFlush
                } else {
                    HandCategory::StraightFlush
                };
                return HandValue {
                    category,
                    ranks: vec![high],
                };
            }
        }

        // Rank groups ordered by multiplicity then rank.
        let mut groups = counts
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(r, &n)| (n, r as u8))
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| b.cmp(a));

        if groups[0].0 == 4 {
            let quad = groups[0].1;
            let mut ranks = vec![quad];
            ranks.extend(kickers(&groups, &[quad], 1));
            return HandValue {
                category: HandCategory::Quads,
                ranks,
            };
        }

        if groups[0].0 == 3 && groups.len() > 1 && groups[1].0 >= 2 {
            return HandValue {
                category: HandCategory::FullHouse,
                ranks: vec![groups[0].1, groups[1].1],
            };
        }

        if let Some(suited) = flush_ranks(cards) {
            return HandValue {
                category: HandCategory::Flush,
                ranks: suited.into_iter().take(5).collect(),
            };
        }

        let mut present = [false; 15];
        for card in cards {
            present[card.rank().value() as usize] = true;
        }

        if let Some(high) = straight_high(&present) {
            return HandValue {
                category: HandCategory::Straight,
                ranks: vec![high],
            };
        }

        if groups[0].0 == 3 {
            let trip = groups[0].1;
            let mut ranks = vec![trip];
            ranks.extend(kickers(&groups, &[trip], 2));
            return HandValue {
                category: HandCategory::Trips,
                ranks,
            };
        }

        if groups[0].0 == 2 && groups.len() > 1 && groups[1].0 == 2 {
            let (hi, lo) = (groups[0].1, groups[1].1);
            let mut ranks = vec![hi, lo];
            ranks.extend(kickers(&groups, &[hi, lo], 1));
            return HandValue {
                category: HandCategory::TwoPair,
                ranks,
            };
        }

        if groups[0].0 == 2 {
            let pair = groups[0].1;
            let mut ranks = vec![pair];
            ranks.extend(kickers(&groups, &[pair], 3));
            return HandValue {
                category: HandCategory::Pair,
                ranks,
            };
        }

        HandValue {
            category: HandCategory::HighCard,
            ranks: kickers(&groups, &[], 5),
        }
    }

    /// The hand category.
    pub fn category(&self) -> HandCategory {
        self.category
    }

    /// A short human description, for example "Two Pair, Aces and Fives".
    pub fn describe(&self) -> String {
        match self.category {
            HandCategory::HighCard => format!("High Card {}", rank_of(self.ranks[0]).name()),
            HandCategory::Pair => format!("Pair of {}", rank_of(self.ranks[0]).plural()),
            HandCategory::TwoPair => format!(
                "Two Pair, {} and {}",
                rank_of(self.ranks[0]).plural(),
                rank_of(self.ranks[1]).plural()
            ),
            HandCategory::Trips => {
                format!("Three of a Kind, {}", rank_of(self.ranks[0]).plural())
            }
            HandCategory::Straight => {
                format!("Straight, {} high", rank_of(self.ranks[0]).name())
            }
            HandCategory::Flush => format!("Flush, {} high", rank_of(self.ranks[0]).name()),
            HandCategory::FullHouse => format!(
                "Full House, {} over {}",
                rank_of(self.ranks[0]).plural(),
                rank_of(self.ranks[1]).plural()
            ),
            HandCategory::Quads => {
                format!("Four of a Kind, {}", rank_of(self.ranks[0]).plural())
            }
            HandCategory::StraightFlush => {
                format!("Straight Flush, {} high", rank_of(self.ranks[0]).name())
            }
            HandCategory::RoyalFlush => "Royal Flush".to_string(),
        }
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Ranks of the flush suit in descending order, if any suit has 5 cards.
fn flush_ranks(cards: &[Card]) -> Option<Vec<u8>> {
    for suit in Suit::suits() {
        let mut ranks = cards
            .iter()
            .filter(|c| c.suit() == suit)
            .map(|c| c.rank().value())
            .collect::<Vec<_>>();

        if ranks.len() >= 5 {
            ranks.sort_unstable_by(|a, b| b.cmp(a));
            return Some(ranks);
        }
    }

    None
}

/// The highest straight top rank in a rank presence mask.
fn straight_high(present: &[bool; 15]) -> Option<u8> {
    for high in (5..=Rank::Ace.value()).rev() {
        let run = (high - 4..=high).all(|r| {
            // The ace plays low in the wheel.
            let r = if r == 1 { Rank::Ace.value() } else { r };
            present[r as usize]
        });

        if run {
            return Some(high);
        }
    }

    None
}

/// Up to `n` kicker ranks not used by the made groups, best first.
fn kickers(groups: &[(u8, u8)], used: &[u8], n: usize) -> Vec<u8> {
    let mut ranks = groups
        .iter()
        .map(|&(_, r)| r)
        .filter(|r| !used.contains(r))
        .collect::<Vec<_>>();
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    ranks.truncate(n);
    ranks
}

fn rank_of(value: u8) -> Rank {
    Rank::ranks()
        .find(|r| r.value() == value)
        .expect("tiebreaker ranks are card ranks")
}
