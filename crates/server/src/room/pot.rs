// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Pot layering and award mathematics.
//!
//! The pot is split into layers whenever players are all-in for different
//! amounts. Layers are computed once over the final per-hand contributions,
//! folded and departed players' chips flow into whichever layer matches the
//! depth they reached even though they cannot win one.
use ahash::AHashMap;

use tablestakes_core::{eval::HandValue, poker::Chips};

/// One seat's total contribution to the hand.
#[derive(Debug, Clone, Copy)]
pub struct Contribution {
    /// The contributing seat, None for players who left the room mid-hand.
    pub seat: Option<usize>,
    /// Chips committed over the whole hand.
    pub chips: Chips,
    /// The contributor has not folded and contests the pot.
    pub live: bool,
}

/// A pot layer and the seats that can win it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotLayer {
    /// Chips in this layer.
    pub chips: Chips,
    /// Live seats whose contribution reaches this layer.
    pub eligible: Vec<usize>,
}

/// Chips pushed to a seat from one pot share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    /// The winning seat.
    pub seat: usize,
    /// The chips won.
    pub chips: Chips,
}

/// Splits the hand contributions into pot layers.
///
/// Levels are the distinct contribution amounts among live seats in
/// ascending order; the layer at level `l` collects from every contributor
/// the chips it committed between the previous level and `l`. A layer with
/// a single eligible seat is the uncalled part of that seat's bet and is
/// returned to it by the award step.
pub fn pot_layers(contribs: &[Contribution]) -> Vec<PotLayer> {
    let mut levels = contribs
        .iter()
        .filter(|c| c.live && c.chips > Chips::ZERO)
        .map(|c| c.chips)
        .collect::<Vec<_>>();
    levels.sort_unstable();
    levels.dedup();

    if levels.is_empty() {
        return Vec::new();
    }

    let mut layers = Vec::with_capacity(levels.len());
    let mut prev = Chips::ZERO;
    for &level in &levels {
        let chips = contribs
            .iter()
            .map(|c| c.chips.min(level) - c.chips.min(prev))
            .sum();

        let eligible = contribs
            .iter()
            .filter(|c| c.live && c.chips >= level)
            .filter_map(|c| c.seat)
            .collect();

        layers.push(PotLayer { chips, eligible });
        prev = level;
    }

    // A folded bet deeper than every live stack has no layer of its own,
    // it stays in the deepest pot.
    let top = *levels.last().unwrap();
    let excess = contribs
        .iter()
        .map(|c| c.chips - c.chips.min(top))
        .sum::<Chips>();
    if let Some(last) = layers.last_mut() {
        last.chips += excess;
    }

    layers
}

/// Awards one pot share to the best eligible hand(s).
///
/// True ties split the share evenly; the integer remainder goes to the
/// winner closest clockwise from the small blind seat so the award does
/// not depend on iteration order.
pub fn award_pot(
    chips: Chips,
    eligible: &[usize],
    hands: &AHashMap<usize, HandValue>,
    sb_seat: usize,
    max_seats: usize,
) -> Vec<Award> {
    if chips == Chips::ZERO || eligible.is_empty() {
        return Vec::new();
    }

    let best = eligible
        .iter()
        .filter_map(|s| hands.get(s))
        .max()
        .cloned();
    let Some(best) = best else {
        return Vec::new();
    };

    let mut winners = eligible
        .iter()
        .copied()
        .filter(|s| hands.get(s) == Some(&best))
        .collect::<Vec<_>>();
    winners.sort_unstable_by_key(|&s| (s + max_seats - sb_seat) % max_seats);

    let n = winners.len() as u32;
    let share = chips / n;
    let remainder = chips % n;

    winners
        .into_iter()
        .enumerate()
        .map(|(i, seat)| Award {
            seat,
            chips: if i == 0 { share + remainder } else { share },
        })
        .collect()
}

/// Splits a pot layer into the two run-it-twice halves, the odd chip goes
/// to the first board.
pub fn split_halves(chips: Chips) -> (Chips, Chips) {
    let half = chips / 2;
    (half + chips % 2, half)
}
