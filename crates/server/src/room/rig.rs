// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Deterministic deck fixtures for the privileged rig-next-hand hook.
//!
//! A fixture orders a full deck so the target seat receives hole cards
//! that, together with the fixed board, make the requested hand category.
//! The remaining cards are shuffled normally; the fixture never changes
//! anything else about the hand.
use ahash::AHashSet;
use rand::Rng;

use tablestakes_core::{
    cards::{Card, Deck, Rank, Suit},
    eval::HandCategory,
};

/// Builds a deck ordering for `players` dealt-in seats where the player at
/// deal position `target` (0 is first to receive cards, left of the
/// dealer) ends the hand with the requested category.
pub fn rigged_deck<R: Rng>(
    category: HandCategory,
    target: usize,
    players: usize,
    rng: &mut R,
) -> Deck {
    assert!(players >= 2 && target < players);

    let (hole, board) = fixture(category);

    // Deal order: two cards per player starting left of the dealer, then
    // burn + flop, burn + turn, burn + river.
    let base = players * 2;
    let board_slots = [base + 1, base + 2, base + 3, base + 5, base + 7];

    let mut slots: Vec<Option<Card>> = vec![None; Deck::SIZE];
    slots[target * 2] = Some(hole[0]);
    slots[target * 2 + 1] = Some(hole[1]);
    for (slot, card) in board_slots.into_iter().zip(board) {
        slots[slot] = Some(card);
    }

    let used = hole
        .iter()
        .chain(board.iter())
        .copied()
        .collect::<AHashSet<_>>();
    let mut rest = Deck::shuffled(rng)
        .into_iter()
        .filter(|c| !used.contains(c));

    let mut ordered = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| rest.next().expect("52 cards fill 52 slots")))
        .collect::<Vec<_>>();

    // The deck deals from the back.
    ordered.reverse();
    Deck::from_cards(ordered)
}

/// The hole cards and board of a fixture.
fn fixture(category: HandCategory) -> ([Card; 2], [Card; 5]) {
    use Rank::*;
    use Suit::*;

    let c = Card::new;
    match category {
        HandCategory::HighCard => (
            [c(Ace, Spades), c(Queen, Diamonds)],
            [c(Nine, Clubs), c(Seven, Hearts), c(Four, Spades), c(Jack, Diamonds), c(Deuce, Hearts)],
        ),
        HandCategory::Pair => (
            [c(Ace, Spades), c(Ace, Diamonds)],
            [c(Nine, Clubs), c(Seven, Hearts), c(Four, Spades), c(Queen, Diamonds), c(Deuce, Hearts)],
        ),
        HandCategory::TwoPair => (
            [c(Jack, Spades), c(Ten, Diamonds)],
            [c(Jack, Hearts), c(Ten, Clubs), c(Four, Spades), c(Eight, Diamonds), c(Deuce, Hearts)],
        ),
        HandCategory::Trips => (
            [c(Queen, Spades), c(Queen, Hearts)],
            [c(Queen, Diamonds), c(Seven, Clubs), c(Four, Spades), c(Nine, Hearts), c(Deuce, Diamonds)],
        ),
        HandCategory::Straight => (
            [c(Nine, Spades), c(Eight, Diamonds)],
            [c(Seven, Hearts), c(Six, Clubs), c(Five, Spades), c(King, Diamonds), c(Deuce, Hearts)],
        ),
        HandCategory::Flush => (
            [c(Ace, Hearts), c(Jack, Hearts)],
            [c(Nine, Hearts), c(Six, Hearts), c(Deuce, Hearts), c(King, Spades), c(Queen, Diamonds)],
        ),
        HandCategory::FullHouse => (
            [c(King, Spades), c(King, Hearts)],
            [c(King, Diamonds), c(Five, Clubs), c(Five, Spades), c(Eight, Hearts), c(Deuce, Diamonds)],
        ),
        HandCategory::Quads => (
            [c(Nine, Spades), c(Nine, Hearts)],
            [c(Nine, Diamonds), c(Nine, Clubs), c(King, Spades), c(Four, Hearts), c(Deuce, Diamonds)],
        ),
        HandCategory::StraightFlush => (
            [c(Eight, Hearts), c(Seven, Hearts)],
            [c(Six, Hearts), c(Five, Hearts), c(Four, Hearts), c(King, Spades), c(Deuce, Diamonds)],
        ),
        HandCategory::RoyalFlush => (
            [c(Ace, Spades), c(King, Spades)],
            [c(Queen, Spades), c(Jack, Spades), c(Ten, Spades), c(Seven, Diamonds), c(Deuce, Clubs)],
        ),
    }
}
