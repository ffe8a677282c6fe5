// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Room player types.
use tablestakes_core::{
    cards::Card,
    poker::{Chips, SessionId},
};

/// A room member, seated player or spectator, keyed by session identity.
#[derive(Debug)]
pub struct Player {
    /// The durable session identity.
    pub session_id: SessionId,
    /// This player display name.
    pub name: String,
    /// Chips behind, zero while spectating.
    pub bankroll: Chips,
    /// The seat index, None while spectating.
    pub seat: Option<usize>,
    /// This player hole cards for the running hand.
    pub hole_cards: Option<(Card, Card)>,
    /// Chips committed in the current betting round.
    pub round_bet: Chips,
    /// Chips committed since the hand started, drives side pots.
    pub hand_bet: Chips,
    /// The player folded this hand.
    pub folded: bool,
    /// The player is all-in this hand.
    pub all_in: bool,
    /// Seat was taken mid-hand, sits out until the next hand starts.
    pub waiting: bool,
    /// The player revealed its cards at showdown.
    pub shown: bool,
    /// The player mucked its cards at showdown.
    pub mucked: bool,
}

impl Player {
    /// Creates a new spectating player.
    pub fn new(session_id: SessionId, name: String) -> Self {
        Self {
            session_id,
            name,
            bankroll: Chips::ZERO,
            seat: None,
            hole_cards: None,
            round_bet: Chips::ZERO,
            hand_bet: Chips::ZERO,
            folded: false,
            all_in: false,
            waiting: false,
            shown: false,
            mucked: false,
        }
    }

    /// The player holds cards in the running hand.
    pub fn in_hand(&self) -> bool {
        self.hole_cards.is_some()
    }

    /// The player can still take betting actions.
    pub fn can_act(&self) -> bool {
        self.in_hand() && !self.folded && !self.all_in
    }

    /// The player is in the hand and has not folded.
    pub fn is_live(&self) -> bool {
        self.in_hand() && !self.folded
    }

    /// Commits up to `chips` from the bankroll into the current bets.
    ///
    /// A commit that drains the bankroll puts the player all-in. Returns
    /// the chips actually committed.
    pub fn commit(&mut self, chips: Chips) -> Chips {
        let committed = chips.min(self.bankroll);
        self.bankroll -= committed;
        self.round_bet += committed;
        self.hand_bet += committed;

        if self.bankroll == Chips::ZERO {
            self.all_in = true;
        }

        committed
    }

    /// Chips needed to match the given bet.
    pub fn to_call(&self, current_bet: Chips) -> Chips {
        (current_bet - self.round_bet).min(self.bankroll)
    }

    /// Reset state for a new hand.
    pub fn start_hand(&mut self) {
        self.hole_cards = None;
        self.round_bet = Chips::ZERO;
        self.hand_bet = Chips::ZERO;
        self.folded = false;
        self.all_in = false;
        self.waiting = false;
        self.shown = false;
        self.mucked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        let mut p = Player::new(
            SessionId::new("sess").unwrap(),
            "Alice".to_string(),
        );
        p.bankroll = Chips::new(100);
        p.seat = Some(0);
        p
    }

    #[test]
    fn commit_tracks_round_and_hand_bets() {
        let mut p = player();
        assert_eq!(p.commit(Chips::new(30)), Chips::new(30));
        assert_eq!(p.bankroll, Chips::new(70));
        assert_eq!(p.round_bet, Chips::new(30));
        assert_eq!(p.hand_bet, Chips::new(30));
        assert!(!p.all_in);
    }

    #[test]
    fn commit_past_the_stack_goes_all_in() {
        let mut p = player();
        assert_eq!(p.commit(Chips::new(250)), Chips::new(100));
        assert_eq!(p.bankroll, Chips::ZERO);
        assert!(p.all_in);
    }

    #[test]
    fn to_call_is_capped_by_the_stack() {
        let mut p = player();
        p.commit(Chips::new(90));
        assert_eq!(p.to_call(Chips::new(500)), Chips::new(10));
    }
}
