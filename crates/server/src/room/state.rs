// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Room state and the hand state machine.
//!
//! All methods are synchronous: the owning actor applies one command at a
//! time and drains the [Outbound] items this state accumulates. Timers
//! are plain deadlines checked by [RoomState::tick], which keeps every
//! transition deterministic under test.
use ahash::{AHashMap, AHashSet};
use log::info;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

use tablestakes_core::{
    cards::{Card, Deck},
    eval::{HandCategory, HandValue},
    message::{
        ActionKind, ClientCommand, CommandReply, GameEvent, Payoff, PlayerView, PotResult,
        RoomSnapshot, SeatRequestView, SeatView, ServerFrame, ShowdownView,
    },
    poker::{Chips, Phase, PlayerCards, RequestId, RoomId, SessionId},
};

use super::{
    player::Player,
    pot::{self, Contribution},
    rig, ActionError, Outbound, RoomOptions,
};

/// A queued seat request.
#[derive(Debug)]
struct SeatRequest {
    id: RequestId,
    session_id: SessionId,
    seat: usize,
    buy_in: Chips,
}

/// A pending run-it-twice offer.
#[derive(Debug)]
struct RitOffer {
    eligible: Vec<usize>,
    votes: AHashMap<usize, bool>,
    deadline: Instant,
}

/// The state of one room, mutated only by its actor.
#[derive(Debug)]
pub struct RoomState {
    room_id: RoomId,
    name: String,
    host: Option<SessionId>,
    original_host: Option<SessionId>,
    max_seats: usize,
    small_blind: Chips,
    big_blind: Chips,
    secret: Option<String>,
    seats: Vec<Option<SessionId>>,
    players: Vec<Player>,
    hand_no: u64,
    phase: Phase,
    deck: Deck,
    board: Vec<Card>,
    second_board: Option<Vec<Card>>,
    dealer: usize,
    sb_seat: usize,
    bb_seat: usize,
    turn: Option<usize>,
    current_bet: Chips,
    min_raise: Chips,
    last_aggressor: Option<usize>,
    acted: AHashSet<usize>,
    /// Hand contributions of players who left the room mid-hand.
    departed: Vec<Chips>,
    game_running: bool,
    paused: bool,
    pause_started: Option<Instant>,
    seat_requests: Vec<SeatRequest>,
    rit_offer: Option<RitOffer>,
    rit_active: bool,
    rit_resolved: bool,
    showdown: Option<ShowdownView>,
    auto_deal_at: Option<Instant>,
    next_hand_at: Option<Instant>,
    reap_at: Option<Instant>,
    privileged: AHashSet<SessionId>,
    rig: Option<(SessionId, HandCategory)>,
    rng: StdRng,
    outbox: Vec<Outbound>,
}

impl RoomState {
    /// Display delay between automatically dealt streets.
    const STREET_DELAY: Duration = Duration::from_secs(1);
    /// Delay between a hand ending and the next starting.
    const NEXT_HAND_DELAY: Duration = Duration::from_secs(6);
    /// Bounded wait for run-it-twice votes.
    const RIT_TIMEOUT: Duration = Duration::from_secs(15);
    /// Empty room grace window before the room is reaped.
    const REAP_DELAY: Duration = Duration::from_secs(60);
    /// Buy-ins must cover this many big blinds.
    const MIN_BUYIN_BLINDS: u32 = 10;
    /// Display name length bounds.
    const MAX_NAME_LEN: usize = 15;

    /// Creates a new room state.
    pub fn new(room_id: RoomId, opts: RoomOptions, rng: StdRng) -> Self {
        assert!((2..=10).contains(&opts.max_seats));

        Self {
            room_id,
            name: opts.name,
            host: None,
            original_host: None,
            max_seats: opts.max_seats,
            small_blind: opts.small_blind,
            big_blind: opts.big_blind,
            secret: opts.secret,
            seats: (0..opts.max_seats).map(|_| None).collect(),
            players: Vec::new(),
            hand_no: 0,
            phase: Phase::Waiting,
            deck: Deck::default(),
            board: Vec::new(),
            second_board: None,
            // The first button advance lands on the lowest occupied seat.
            dealer: opts.max_seats - 1,
            sb_seat: 0,
            bb_seat: 0,
            turn: None,
            current_bet: Chips::ZERO,
            min_raise: opts.big_blind,
            last_aggressor: None,
            acted: AHashSet::new(),
            departed: Vec::new(),
            game_running: false,
            paused: false,
            pause_started: None,
            seat_requests: Vec::new(),
            rit_offer: None,
            rit_active: false,
            rit_resolved: false,
            showdown: None,
            auto_deal_at: None,
            next_hand_at: None,
            reap_at: None,
            privileged: AHashSet::new(),
            rig: None,
            rng,
            outbox: Vec::new(),
        }
    }

    /// Takes the accumulated outbound items.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// The public room snapshot.
    pub fn snapshot(&self) -> RoomSnapshot {
        let seats = (0..self.max_seats)
            .map(|s| {
                self.seat_player(s).map(|p| SeatView {
                    name: p.name.clone(),
                    bankroll: p.bankroll,
                    round_bet: p.round_bet,
                    folded: p.folded,
                    all_in: p.all_in,
                    waiting: p.waiting,
                    cards: self.public_cards(p),
                })
            })
            .collect();

        let seat_requests = self
            .seat_requests
            .iter()
            .map(|r| SeatRequestView {
                request_id: r.id,
                name: self
                    .player(&r.session_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                seat: r.seat,
                buy_in: r.buy_in,
            })
            .collect();

        let in_hand = self.phase.in_hand();
        RoomSnapshot {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            host: self
                .host
                .as_ref()
                .and_then(|h| self.player(h))
                .map(|p| p.name.clone()),
            hand_no: self.hand_no,
            phase: self.phase,
            seats,
            board: self.board.clone(),
            second_board: self.second_board.clone(),
            pot: self.pot(),
            current_bet: self.current_bet,
            min_raise: self.min_raise,
            dealer: in_hand.then_some(self.dealer),
            small_blind_seat: in_hand.then_some(self.sb_seat),
            big_blind_seat: in_hand.then_some(self.bb_seat),
            turn: self.turn,
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            game_running: self.game_running,
            paused: self.paused,
            seat_requests,
            showdown: self.showdown.clone(),
        }
    }

    /// Total chips in the pot this hand.
    pub fn pot(&self) -> Chips {
        let seated = self
            .seated_players()
            .map(|(_, p)| p.hand_bet)
            .sum::<Chips>();
        seated + self.departed.iter().copied().sum::<Chips>()
    }

    /// A session joins the room as a spectator.
    pub fn join(
        &mut self,
        session_id: &SessionId,
        name: &str,
        _now: Instant,
    ) -> Result<(), ActionError> {
        let chars = name.chars().count();
        if chars == 0 || chars > Self::MAX_NAME_LEN {
            return Err(ActionError::InvalidName);
        }

        // One connection per session per room, a second tab is refused.
        if self.players.iter().any(|p| &p.session_id == session_id) {
            return Err(ActionError::AlreadyJoined);
        }

        self.players
            .push(Player::new(session_id.clone(), name.to_string()));
        self.reap_at = None;

        self.event(GameEvent::PlayerJoined {
            name: name.to_string(),
        });

        // The first joiner becomes the host; the original host reclaims
        // the role whenever it rejoins, host identity follows the session.
        if self.original_host.is_none() {
            self.original_host = Some(session_id.clone());
        }

        let reclaim = self.original_host.as_ref() == Some(session_id);
        if self.host.is_none() || (reclaim && self.host.as_ref() != Some(session_id)) {
            self.set_host(Some(session_id.clone()));
        }

        info!("Player {session_id} joined room {}", self.room_id);
        self.emit_state();

        Ok(())
    }

    /// A session leaves the room, on explicit leave or disconnect.
    pub fn remove(&mut self, session_id: &SessionId, now: Instant) {
        let Some(idx) = self.players.iter().position(|p| &p.session_id == session_id) else {
            return;
        };
        let name = self.players[idx].name.clone();

        if let Some(seat) = self.players[idx].seat {
            self.vacate_seat(seat, now);
        }

        // The position may have shifted if the fold above ended the hand;
        // look the player up again.
        if let Some(idx) = self.players.iter().position(|p| &p.session_id == session_id) {
            self.players.remove(idx);
        }
        self.seat_requests.retain(|r| &r.session_id != session_id);
        self.privileged.remove(session_id);

        // Host succession in players map insertion order.
        if self.host.as_ref() == Some(session_id) {
            let next = self.players.first().map(|p| p.session_id.clone());
            self.set_host(next);
        }

        if self.players.is_empty() {
            self.reap_at = Some(now + Self::REAP_DELAY);
        }

        self.event(GameEvent::PlayerLeft { name });
        info!("Player {session_id} left room {}", self.room_id);
        self.emit_state();
    }

    /// Applies a client command, acknowledging it on the sender session.
    pub fn apply(&mut self, session_id: &SessionId, cmd: ClientCommand, now: Instant) {
        if self.player(session_id).is_none() {
            self.reply(session_id, CommandReply::err(ActionError::NotInRoom.to_string()));
            return;
        }

        let res = match cmd {
            ClientCommand::RequestSeat { seat, buy_in } => {
                self.request_seat(session_id, seat, buy_in, now)
            }
            ClientCommand::ApproveSeat { request_id } => {
                self.approve_seat(session_id, request_id, now)
            }
            ClientCommand::DenySeat { request_id } => self.deny_seat(session_id, request_id),
            ClientCommand::CancelSeatRequest => self.cancel_seat_request(session_id),
            ClientCommand::LeaveSeat => self.leave_seat(session_id, now),
            ClientCommand::StartGame => self.start_game(session_id, now),
            ClientCommand::PauseGame => self.pause_game(session_id, now),
            ClientCommand::ResumeGame => self.resume_game(session_id, now),
            ClientCommand::StopGame => self.stop_game(session_id),
            ClientCommand::Action { action, amount } => {
                self.player_action(session_id, action, amount, now)
            }
            ClientCommand::ShowHand => self.show_hand(session_id, true),
            ClientCommand::MuckHand => self.show_hand(session_id, false),
            ClientCommand::RunItTwiceVote { accept } => self.rit_vote(session_id, accept, now),
            ClientCommand::LeaveRoom => {
                self.remove(session_id, now);
                Ok(())
            }
            ClientCommand::EnablePrivileged { secret } => {
                self.enable_privileged(session_id, &secret)
            }
            ClientCommand::RigNextHand { hand_type } => self.rig_next_hand(session_id, hand_type),
            ClientCommand::DisablePrivileged => self.disable_privileged(session_id),
            ClientCommand::CreateRoom { .. } | ClientCommand::JoinRoom { .. } => {
                Err(ActionError::AlreadyJoined)
            }
        };

        let reply = match res {
            Ok(()) => CommandReply::ok(),
            Err(e) => CommandReply::err(e.to_string()),
        };
        self.reply(session_id, reply);
    }

    /// Advances the room clock; timers fire as commands into the actor.
    pub fn tick(&mut self, now: Instant) {
        if let Some(at) = self.reap_at {
            if now >= at {
                self.reap_at = None;
                self.outbox.push(Outbound::Reap);
                return;
            }
        }

        if self.paused {
            return;
        }

        if let Some(deadline) = self.rit_offer.as_ref().map(|o| o.deadline) {
            if now >= deadline {
                // Missing votes count as declines.
                self.resolve_rit(false, now);
            }
        }

        if let Some(at) = self.auto_deal_at {
            if now >= at {
                if self.phase == Phase::River {
                    self.auto_deal_at = None;
                    self.enter_showdown(now);
                } else {
                    self.deal_next_street();
                    self.auto_deal_at = Some(now + Self::STREET_DELAY);
                    self.emit_state();
                }
            }
        }

        if let Some(at) = self.next_hand_at {
            if now >= at {
                self.next_hand_at = None;
                self.start_hand(now);
            }
        }
    }

    // ==== seat requests ====

    fn request_seat(
        &mut self,
        session_id: &SessionId,
        seat: usize,
        buy_in: Chips,
        now: Instant,
    ) -> Result<(), ActionError> {
        if seat >= self.max_seats {
            return Err(ActionError::InvalidSeat);
        }
        if self.seats[seat].is_some() {
            return Err(ActionError::SeatTaken);
        }

        let min_buy_in = self.big_blind * Self::MIN_BUYIN_BLINDS;
        if buy_in < min_buy_in {
            return Err(ActionError::MinBuyIn(min_buy_in));
        }

        let player = self.player(session_id).ok_or(ActionError::NotInRoom)?;
        if player.seat.is_some() {
            return Err(ActionError::AlreadySeated);
        }
        if self
            .seat_requests
            .iter()
            .any(|r| &r.session_id == session_id)
        {
            return Err(ActionError::RequestPending);
        }

        // The host's own requests are approved on the spot.
        if self.host.as_ref() == Some(session_id) {
            self.take_seat(session_id.clone(), seat, buy_in, now);
            return Ok(());
        }

        let request_id = RequestId::new_id();
        let name = player.name.clone();
        self.seat_requests.push(SeatRequest {
            id: request_id,
            session_id: session_id.clone(),
            seat,
            buy_in,
        });

        self.event(GameEvent::SeatRequested {
            request_id,
            name,
            seat,
            buy_in,
        });
        self.emit_state();

        Ok(())
    }

    fn approve_seat(
        &mut self,
        session_id: &SessionId,
        request_id: RequestId,
        now: Instant,
    ) -> Result<(), ActionError> {
        self.require_host(session_id, "approve seat requests")?;

        let pos = self
            .seat_requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or(ActionError::UnknownRequest)?;

        // The seat may have been taken since the request was queued.
        if self.seats[self.seat_requests[pos].seat].is_some() {
            return Err(ActionError::SeatTaken);
        }

        let req = self.seat_requests.remove(pos);
        self.take_seat(req.session_id, req.seat, req.buy_in, now);

        Ok(())
    }

    fn deny_seat(
        &mut self,
        session_id: &SessionId,
        request_id: RequestId,
    ) -> Result<(), ActionError> {
        self.require_host(session_id, "deny seat requests")?;

        let pos = self
            .seat_requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or(ActionError::UnknownRequest)?;
        self.seat_requests.remove(pos);

        self.event(GameEvent::SeatDenied { request_id });
        self.emit_state();

        Ok(())
    }

    fn cancel_seat_request(&mut self, session_id: &SessionId) -> Result<(), ActionError> {
        let len = self.seat_requests.len();
        self.seat_requests.retain(|r| &r.session_id != session_id);
        if self.seat_requests.len() == len {
            return Err(ActionError::NoRequest);
        }

        self.emit_state();
        Ok(())
    }

    /// Seats a player with its buy-in as bankroll.
    fn take_seat(&mut self, session_id: SessionId, seat: usize, buy_in: Chips, now: Instant) {
        let waiting = self.phase.in_hand();
        let name = if let Some(p) = self.player_mut(&session_id) {
            p.start_hand();
            p.bankroll = buy_in;
            p.seat = Some(seat);
            p.waiting = waiting;
            p.name.clone()
        } else {
            return;
        };

        self.seats[seat] = Some(session_id);
        self.event(GameEvent::SeatApproved {
            name,
            seat,
            buy_in,
        });
        self.emit_state();
        self.maybe_start_hand(now);
    }

    fn leave_seat(&mut self, session_id: &SessionId, now: Instant) -> Result<(), ActionError> {
        let seat = self.session_seat(session_id).ok_or(ActionError::NotSeated)?;
        self.vacate_seat(seat, now);
        self.emit_state();
        Ok(())
    }

    /// Vacates a seat, folding the player out of a running hand.
    ///
    /// Chips already committed stay in the pot; the bankroll of a vacated
    /// seat is dropped, re-seating brings a fresh buy-in.
    fn vacate_seat(&mut self, seat: usize, now: Instant) {
        let live = self.seat_player(seat).is_some_and(Player::is_live);
        if self.phase.is_betting() && live {
            self.fold_seat(seat, now);
        }

        let mut departed = Chips::ZERO;
        if let Some(p) = self.seat_player_mut(seat) {
            departed = p.hand_bet;
            p.hand_bet = Chips::ZERO;
            p.bankroll = Chips::ZERO;
            p.seat = None;
            p.hole_cards = None;
            p.waiting = false;
        }
        if departed > Chips::ZERO {
            self.departed.push(departed);
        }

        self.seats[seat] = None;
    }

    // ==== host game controls ====

    fn start_game(&mut self, session_id: &SessionId, now: Instant) -> Result<(), ActionError> {
        self.require_host(session_id, "start the game")?;
        if self.game_running {
            return Err(ActionError::AlreadyRunning);
        }
        if self.ready_count() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }

        self.game_running = true;
        self.event(GameEvent::GameStarted);
        self.start_hand(now);

        Ok(())
    }

    fn pause_game(&mut self, session_id: &SessionId, now: Instant) -> Result<(), ActionError> {
        self.require_host(session_id, "pause the game")?;
        if !self.game_running {
            return Err(ActionError::NotRunning);
        }
        if self.paused {
            return Err(ActionError::Paused);
        }

        self.paused = true;
        self.pause_started = Some(now);
        self.event(GameEvent::GamePaused);
        self.emit_state();

        Ok(())
    }

    fn resume_game(&mut self, session_id: &SessionId, now: Instant) -> Result<(), ActionError> {
        self.require_host(session_id, "resume the game")?;
        if !self.paused {
            return Err(ActionError::NotPaused);
        }

        // Shift pending deadlines by the paused duration so the clock
        // continues where it stopped.
        if let Some(started) = self.pause_started.take() {
            let delta = now.saturating_duration_since(started);
            self.auto_deal_at = self.auto_deal_at.map(|t| t + delta);
            self.next_hand_at = self.next_hand_at.map(|t| t + delta);
            if let Some(offer) = &mut self.rit_offer {
                offer.deadline += delta;
            }
        }

        self.paused = false;
        self.event(GameEvent::GameResumed);
        self.emit_state();

        Ok(())
    }

    fn stop_game(&mut self, session_id: &SessionId) -> Result<(), ActionError> {
        self.require_host(session_id, "stop the game")?;
        if !self.game_running {
            return Err(ActionError::NotRunning);
        }

        self.abort_hand();
        self.game_running = false;
        self.paused = false;
        self.pause_started = None;
        self.event(GameEvent::GameStopped);
        self.emit_state();

        Ok(())
    }

    /// Aborts the running hand, refunding the present players.
    fn abort_hand(&mut self) {
        for p in &mut self.players {
            if p.in_hand() {
                p.bankroll += p.hand_bet;
            }
            let bankroll = p.bankroll;
            p.start_hand();
            p.bankroll = bankroll;
        }

        self.board.clear();
        self.second_board = None;
        self.departed.clear();
        self.showdown = None;
        self.rit_offer = None;
        self.rit_active = false;
        self.rit_resolved = false;
        self.turn = None;
        self.current_bet = Chips::ZERO;
        self.min_raise = self.big_blind;
        self.last_aggressor = None;
        self.acted.clear();
        self.auto_deal_at = None;
        self.next_hand_at = None;
        self.phase = Phase::Waiting;
    }

    // ==== hand lifecycle ====

    /// Starts a hand when the game is running, no hand is live, and at
    /// least two seated players have chips.
    fn maybe_start_hand(&mut self, now: Instant) {
        if self.game_running
            && !self.paused
            && self.phase == Phase::Waiting
            && self.next_hand_at.is_none()
            && self.ready_count() >= 2
        {
            self.start_hand(now);
        }
    }

    fn start_hand(&mut self, now: Instant) {
        if !self.game_running || self.paused {
            return;
        }

        // Busted seats are vacated, the players stay as spectators.
        let busted = (0..self.max_seats)
            .filter(|&s| {
                self.seat_player(s)
                    .is_some_and(|p| p.bankroll == Chips::ZERO)
            })
            .collect::<Vec<_>>();
        if !busted.is_empty() {
            let names = busted
                .iter()
                .filter_map(|&s| self.seat_player(s).map(|p| p.name.clone()))
                .collect();
            for seat in busted {
                self.vacate_seat(seat, now);
            }
            self.event(GameEvent::PlayersBusted { names });
        }

        // Reset per-hand state and clear the waiting flags.
        for p in &mut self.players {
            let bankroll = p.bankroll;
            p.start_hand();
            p.bankroll = bankroll;
        }
        self.board.clear();
        self.second_board = None;
        self.departed.clear();
        self.showdown = None;
        self.rit_offer = None;
        self.rit_active = false;
        self.rit_resolved = false;
        self.acted.clear();
        self.current_bet = Chips::ZERO;
        self.min_raise = self.big_blind;
        self.last_aggressor = None;
        self.turn = None;
        self.auto_deal_at = None;

        if self.ready_count() < 2 {
            self.phase = Phase::Waiting;
            self.emit_state();
            return;
        }

        self.hand_no += 1;

        // Advance the button to the next occupied seat clockwise.
        self.dealer = self
            .next_ready_from(self.dealer + 1)
            .expect("two ready seats checked above");

        // Heads-up the dealer is the small blind and acts first preflop;
        // with three or more the blinds sit clockwise from the button.
        let heads_up = self.ready_count() == 2;
        if heads_up {
            self.sb_seat = self.dealer;
            self.bb_seat = self
                .next_ready_from(self.dealer + 1)
                .expect("two ready seats checked above");
        } else {
            self.sb_seat = self
                .next_ready_from(self.dealer + 1)
                .expect("two ready seats checked above");
            self.bb_seat = self
                .next_ready_from(self.sb_seat + 1)
                .expect("two ready seats checked above");
        }

        // Deal order is clockwise starting left of the dealer.
        let deal_order = (1..=self.max_seats)
            .map(|i| (self.dealer + i) % self.max_seats)
            .filter(|&s| {
                self.seat_player(s)
                    .is_some_and(|p| p.bankroll > Chips::ZERO && !p.waiting)
            })
            .collect::<Vec<_>>();

        // A stamped fixture replaces the shuffle for this hand only.
        self.deck = match self.rig.take() {
            Some((session_id, category)) => {
                let target = self
                    .player(&session_id)
                    .and_then(|p| p.seat)
                    .and_then(|seat| deal_order.iter().position(|&s| s == seat));
                match target {
                    Some(pos) => rig::rigged_deck(category, pos, deal_order.len(), &mut self.rng),
                    None => Deck::shuffled(&mut self.rng),
                }
            }
            None => Deck::shuffled(&mut self.rng),
        };

        // Short stacks post what they have and are all-in immediately.
        let (sb_seat, bb_seat) = (self.sb_seat, self.bb_seat);
        let (small_blind, big_blind) = (self.small_blind, self.big_blind);
        if let Some(p) = self.seat_player_mut(sb_seat) {
            p.commit(small_blind);
        }
        if let Some(p) = self.seat_player_mut(bb_seat) {
            p.commit(big_blind);
        }

        self.current_bet = self.big_blind;
        self.min_raise = self.big_blind;
        // The big blind has not acted yet: a limped round comes back to
        // it with the option to check or raise.
        self.last_aggressor = Some(self.bb_seat);
        self.acted.clear();

        for &seat in &deal_order {
            let c1 = self.deck.deal().expect("fresh deck covers a full hand");
            let c2 = self.deck.deal().expect("fresh deck covers a full hand");
            if let Some(p) = self.seat_player_mut(seat) {
                p.hole_cards = Some((c1, c2));
            }
        }

        self.phase = Phase::PreFlop;
        self.turn = if heads_up {
            self.next_actor_from(self.dealer)
        } else {
            self.next_actor_from(self.bb_seat + 1)
        };

        info!("Room {} hand {} started", self.room_id, self.hand_no);
        self.event(GameEvent::NewHand {
            hand_no: self.hand_no,
            dealer: self.dealer,
            small_blind_seat: self.sb_seat,
            big_blind_seat: self.bb_seat,
        });

        // Blinds can put everyone all-in before any action.
        if self.round_complete() {
            self.end_betting_round(now);
        } else {
            self.emit_state();
        }
    }

    // ==== betting ====

    fn player_action(
        &mut self,
        session_id: &SessionId,
        kind: ActionKind,
        amount: Chips,
        now: Instant,
    ) -> Result<(), ActionError> {
        if self.paused {
            return Err(ActionError::Paused);
        }
        if !self.phase.is_betting() {
            return Err(ActionError::NoHand);
        }

        let seat = self.session_seat(session_id).ok_or(ActionError::NotSeated)?;
        if self.turn != Some(seat) {
            return Err(ActionError::NotYourTurn);
        }

        let current_bet = self.current_bet;
        let min_raise = self.min_raise;
        let already_acted = self.acted.contains(&seat);

        if kind == ActionKind::Fold {
            self.fold_seat(seat, now);
            return Ok(());
        }

        {
            let p = self
                .seat_player_mut(seat)
                .ok_or(ActionError::NotSeated)?;
            let to_call = current_bet - p.round_bet;

            match kind {
                ActionKind::Check => {
                    if to_call > Chips::ZERO {
                        return Err(ActionError::MustCall);
                    }
                }
                ActionKind::Call => {
                    p.commit(to_call);
                }
                ActionKind::Bet | ActionKind::Raise => {
                    if already_acted {
                        return Err(ActionError::RaiseNotOpen);
                    }
                    // A raise below the minimum is only legal as an all-in.
                    if amount < min_raise && to_call + amount < p.bankroll {
                        return Err(ActionError::MinRaise(min_raise));
                    }
                    p.commit(to_call + amount);
                }
                ActionKind::AllIn => {
                    let stack = p.bankroll;
                    if p.round_bet + stack > current_bet && already_acted {
                        return Err(ActionError::RaiseNotOpen);
                    }
                    p.commit(stack);
                }
                ActionKind::Fold => unreachable!("handled above"),
            }
        }

        // A bet above the current one updates the raise state: a full
        // raise reopens the round for everyone else, a short all-in does
        // not reset the acted set and leaves the minimum raise alone.
        let new_bet = self
            .seat_player(seat)
            .map(|p| p.round_bet)
            .unwrap_or_default();
        if new_bet > self.current_bet {
            let raise_by = new_bet - self.current_bet;
            if raise_by >= self.min_raise {
                self.min_raise = raise_by;
                self.acted.clear();
                self.last_aggressor = Some(seat);
            }
            self.current_bet = new_bet;
        }

        self.acted.insert(seat);
        self.event(GameEvent::PlayerActed {
            seat,
            action: kind,
            chips: new_bet,
        });
        self.advance_after(seat, now);

        Ok(())
    }

    /// Folds a seat and resolves the turn, the round, or the hand.
    fn fold_seat(&mut self, seat: usize, now: Instant) {
        let round_bet = if let Some(p) = self.seat_player_mut(seat) {
            p.folded = true;
            p.round_bet
        } else {
            return;
        };

        self.acted.insert(seat);
        self.event(GameEvent::PlayerActed {
            seat,
            action: ActionKind::Fold,
            chips: round_bet,
        });

        // A fold during a pending run-it-twice offer shrinks the voter set.
        if let Some(offer) = &mut self.rit_offer {
            offer.eligible.retain(|&s| s != seat);
            offer.votes.remove(&seat);
        }

        self.advance_after(seat, now);
        self.maybe_resolve_rit_votes(now);
    }

    /// After an action: end the hand on a lone player, advance the phase
    /// on a complete round, or pass the turn along.
    fn advance_after(&mut self, seat: usize, now: Instant) {
        if self.live_count() == 1 {
            self.enter_win_without_showdown(now);
            return;
        }

        if self.phase.is_betting() && self.turn.is_some() {
            if self.round_complete() {
                self.end_betting_round(now);
            } else {
                if self.turn == Some(seat) {
                    self.turn = self.next_actor_from(seat + 1);
                }
                self.emit_state();
            }
        } else {
            self.emit_state();
        }
    }

    /// A betting round is complete when every seat that can still act has
    /// acted and matched the current bet.
    fn round_complete(&self) -> bool {
        for (seat, p) in self.seated_players() {
            if p.can_act() && (p.round_bet != self.current_bet || !self.acted.contains(&seat)) {
                return false;
            }
        }

        true
    }

    fn end_betting_round(&mut self, now: Instant) {
        for p in &mut self.players {
            p.round_bet = Chips::ZERO;
        }
        self.current_bet = Chips::ZERO;
        self.min_raise = self.big_blind;
        self.acted.clear();
        self.turn = None;

        if self.phase == Phase::River {
            self.enter_showdown(now);
            return;
        }

        if self.live_count() < 2 {
            self.enter_win_without_showdown(now);
            return;
        }

        // No further betting possible: offer run-it-twice once while
        // streets remain, then run the board out automatically.
        if self.actors_count() <= 1 {
            if !self.rit_resolved {
                self.offer_rit(now);
            } else {
                self.schedule_auto_deal(now);
            }
            return;
        }

        self.deal_next_street();
        // First to act postflop is the first live seat clockwise from the
        // dealer, the non-dealer heads-up.
        self.turn = self.next_actor_from(self.dealer + 1);
        self.emit_state();
    }

    /// Burns and deals the next street, on both boards when running it
    /// twice.
    fn deal_next_street(&mut self) {
        match self.phase {
            Phase::PreFlop => {
                let cards = self.deal_cards::<3>();
                self.board.extend_from_slice(&cards);
                let second = self.rit_active.then(|| {
                    let cards = self.deal_cards::<3>();
                    if let Some(b) = &mut self.second_board {
                        b.extend_from_slice(&cards);
                    }
                    cards
                });
                self.phase = Phase::Flop;
                self.event(GameEvent::Flop { cards, second });
            }
            Phase::Flop => {
                let card = self.deal_cards::<1>()[0];
                self.board.push(card);
                let second = self.rit_active.then(|| {
                    let card = self.deal_cards::<1>()[0];
                    if let Some(b) = &mut self.second_board {
                        b.push(card);
                    }
                    card
                });
                self.phase = Phase::Turn;
                self.event(GameEvent::TurnCard { card, second });
            }
            Phase::Turn => {
                let card = self.deal_cards::<1>()[0];
                self.board.push(card);
                let second = self.rit_active.then(|| {
                    let card = self.deal_cards::<1>()[0];
                    if let Some(b) = &mut self.second_board {
                        b.push(card);
                    }
                    card
                });
                self.phase = Phase::River;
                self.event(GameEvent::RiverCard { card, second });
            }
            _ => {}
        }
    }

    /// Burns one card then deals `N`.
    fn deal_cards<const N: usize>(&mut self) -> [Card; N] {
        self.deck.burn();
        [(); N].map(|_| self.deck.deal().expect("fresh deck covers a full hand"))
    }

    fn schedule_auto_deal(&mut self, now: Instant) {
        self.auto_deal_at = Some(now + Self::STREET_DELAY);
        self.emit_state();
    }

    // ==== run it twice ====

    fn offer_rit(&mut self, now: Instant) {
        let eligible = self
            .seated_players()
            .filter(|(_, p)| p.is_live())
            .map(|(s, _)| s)
            .collect::<Vec<_>>();

        self.event(GameEvent::RitOffered {
            seats: eligible.clone(),
            timeout_secs: Self::RIT_TIMEOUT.as_secs(),
        });
        self.rit_offer = Some(RitOffer {
            eligible,
            votes: AHashMap::new(),
            deadline: now + Self::RIT_TIMEOUT,
        });
        self.emit_state();
    }

    fn rit_vote(
        &mut self,
        session_id: &SessionId,
        accept: bool,
        now: Instant,
    ) -> Result<(), ActionError> {
        let seat = self.session_seat(session_id).ok_or(ActionError::NoVote)?;

        let offer = self.rit_offer.as_mut().ok_or(ActionError::NoVote)?;
        if !offer.eligible.contains(&seat) {
            return Err(ActionError::NoVote);
        }
        if offer.votes.contains_key(&seat) {
            return Err(ActionError::AlreadyVoted);
        }

        offer.votes.insert(seat, accept);
        self.event(GameEvent::RitVote { seat, accept });

        if !accept {
            // One decline settles the offer, a single board is dealt.
            self.resolve_rit(false, now);
        } else {
            self.maybe_resolve_rit_votes(now);
            self.emit_state();
        }

        Ok(())
    }

    fn maybe_resolve_rit_votes(&mut self, now: Instant) {
        let all_accepted = self
            .rit_offer
            .as_ref()
            .is_some_and(|o| !o.eligible.is_empty() && o.votes.len() == o.eligible.len());
        if all_accepted {
            self.resolve_rit(true, now);
        }
    }

    fn resolve_rit(&mut self, accepted: bool, now: Instant) {
        if self.rit_offer.take().is_none() {
            return;
        }

        self.rit_resolved = true;
        self.rit_active = accepted;
        if accepted {
            self.second_board = Some(self.board.clone());
        }

        self.event(GameEvent::RitResult { accepted });
        self.schedule_auto_deal(now);
    }

    // ==== showdown ====

    /// Everyone else folded: the pot goes to the last seat without a
    /// showdown, no cards are revealed.
    fn enter_win_without_showdown(&mut self, now: Instant) {
        let Some((seat, _)) = self.seated_players().find(|(_, p)| p.is_live()) else {
            return;
        };

        let total = self.pot();
        let name = if let Some(p) = self.seat_player_mut(seat) {
            p.bankroll += total;
            p.name.clone()
        } else {
            return;
        };

        self.clear_contributions();
        self.phase = Phase::Showdown;
        self.turn = None;
        self.auto_deal_at = None;
        self.rit_offer = None;

        self.showdown = Some(ShowdownView {
            results: vec![PotResult {
                pot: 0,
                board: 1,
                chips: total,
                winners: vec![seat],
            }],
            must_show: Vec::new(),
        });

        self.event(GameEvent::HandWon {
            payoffs: vec![Payoff {
                seat,
                name,
                chips: total,
                cards: None,
                hand: None,
            }],
        });
        self.emit_state();
        self.next_hand_at = Some(now + Self::NEXT_HAND_DELAY);
    }

    fn enter_showdown(&mut self, now: Instant) {
        self.phase = Phase::Showdown;
        self.turn = None;
        self.auto_deal_at = None;
        self.rit_offer = None;

        // Contributions of everyone dealt in, folders included, plus the
        // chips of players who left mid-hand.
        let mut contribs = self
            .seated_players()
            .filter(|(_, p)| p.in_hand())
            .map(|(s, p)| Contribution {
                seat: Some(s),
                chips: p.hand_bet,
                live: p.is_live(),
            })
            .collect::<Vec<_>>();
        contribs.extend(self.departed.iter().map(|&chips| Contribution {
            seat: None,
            chips,
            live: false,
        }));

        let layers = pot::pot_layers(&contribs);

        // Evaluate every live hand against each board.
        let live = self
            .seated_players()
            .filter(|(_, p)| p.is_live())
            .filter_map(|(s, p)| p.hole_cards.map(|hole| (s, hole)))
            .collect::<Vec<_>>();

        let eval_on = |board: &[Card]| {
            live.iter()
                .map(|&(s, (c1, c2))| {
                    let mut cards = vec![c1, c2];
                    cards.extend_from_slice(board);
                    (s, HandValue::eval(&cards))
                })
                .collect::<AHashMap<_, _>>()
        };
        let hands = [
            eval_on(&self.board),
            self.second_board
                .as_deref()
                .map(eval_on)
                .unwrap_or_default(),
        ];

        // Award each layer, halved over the boards when running it twice
        // with the odd chip on board one.
        let mut results = Vec::new();
        let mut won: AHashMap<usize, (Chips, u8)> = AHashMap::new();
        for (i, layer) in layers.iter().enumerate() {
            let shares = if self.rit_active {
                let (first, second) = pot::split_halves(layer.chips);
                vec![(1u8, first), (2u8, second)]
            } else {
                vec![(1u8, layer.chips)]
            };

            for (board_no, chips) in shares {
                let awards = pot::award_pot(
                    chips,
                    &layer.eligible,
                    &hands[board_no as usize - 1],
                    self.sb_seat,
                    self.max_seats,
                );
                if awards.is_empty() {
                    continue;
                }

                results.push(PotResult {
                    pot: i,
                    board: board_no,
                    chips,
                    winners: awards.iter().map(|a| a.seat).collect(),
                });
                for award in awards {
                    let entry = won.entry(award.seat).or_insert((Chips::ZERO, board_no));
                    entry.0 += award.chips;
                }
            }
        }

        // Winners and the last aggressor must show, the rest may muck.
        let mut must_show = won.keys().copied().collect::<Vec<_>>();
        if let Some(agg) = self.last_aggressor {
            if self.seat_player(agg).is_some_and(Player::is_live) && !must_show.contains(&agg) {
                must_show.push(agg);
            }
        }
        must_show.sort_unstable();

        let mut payoffs = Vec::new();
        for (&seat, &(chips, board_no)) in &won {
            if let Some(p) = self.seat_player_mut(seat) {
                p.bankroll += chips;
                payoffs.push(Payoff {
                    seat,
                    name: p.name.clone(),
                    chips,
                    cards: p.hole_cards,
                    hand: hands[board_no as usize - 1]
                        .get(&seat)
                        .map(HandValue::describe),
                });
            }
        }
        payoffs.sort_by_key(|p| p.seat);

        for &seat in &must_show {
            if let Some(p) = self.seat_player_mut(seat) {
                p.shown = true;
            }
        }

        self.clear_contributions();
        self.showdown = Some(ShowdownView {
            results: results.clone(),
            must_show,
        });

        self.event(GameEvent::Showdown { results });
        self.event(GameEvent::HandWon { payoffs });
        self.emit_state();
        self.next_hand_at = Some(now + Self::NEXT_HAND_DELAY);
    }

    fn clear_contributions(&mut self) {
        for p in &mut self.players {
            p.hand_bet = Chips::ZERO;
            p.round_bet = Chips::ZERO;
        }
        self.departed.clear();
    }

    fn show_hand(&mut self, session_id: &SessionId, show: bool) -> Result<(), ActionError> {
        if self.phase != Phase::Showdown || self.showdown.is_none() {
            return Err(ActionError::NotAtShowdown);
        }

        let seat = self.session_seat(session_id).ok_or(ActionError::NotSeated)?;
        let live = self.seat_player(seat).is_some_and(Player::is_live);
        if !live {
            return Err(ActionError::NotAtShowdown);
        }

        let must_show = self
            .showdown
            .as_ref()
            .is_some_and(|s| s.must_show.contains(&seat));
        if !show && must_show {
            return Err(ActionError::MustShow);
        }

        if let Some(p) = self.seat_player_mut(seat) {
            p.shown = show;
            p.mucked = !show;
        }
        self.emit_state();

        Ok(())
    }

    // ==== privileged mode ====

    fn enable_privileged(
        &mut self,
        session_id: &SessionId,
        secret: &str,
    ) -> Result<(), ActionError> {
        match &self.secret {
            Some(expected) if expected == secret => {
                self.privileged.insert(session_id.clone());
                Ok(())
            }
            _ => Err(ActionError::BadSecret),
        }
    }

    fn rig_next_hand(
        &mut self,
        session_id: &SessionId,
        hand_type: HandCategory,
    ) -> Result<(), ActionError> {
        if !self.privileged.contains(session_id) {
            return Err(ActionError::GodModeDisabled);
        }

        self.rig = Some((session_id.clone(), hand_type));
        Ok(())
    }

    fn disable_privileged(&mut self, session_id: &SessionId) -> Result<(), ActionError> {
        if !self.privileged.remove(session_id) {
            return Err(ActionError::GodModeDisabled);
        }

        if self.rig.as_ref().is_some_and(|(s, _)| s == session_id) {
            self.rig = None;
        }
        Ok(())
    }

    // ==== lookups ====

    fn player(&self, session_id: &SessionId) -> Option<&Player> {
        self.players.iter().find(|p| &p.session_id == session_id)
    }

    fn player_mut(&mut self, session_id: &SessionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.session_id == session_id)
    }

    fn seat_player(&self, seat: usize) -> Option<&Player> {
        let session_id = self.seats[seat].as_ref()?;
        self.players.iter().find(|p| &p.session_id == session_id)
    }

    fn seat_player_mut(&mut self, seat: usize) -> Option<&mut Player> {
        let session_id = self.seats[seat].clone()?;
        self.players.iter_mut().find(|p| p.session_id == session_id)
    }

    fn session_seat(&self, session_id: &SessionId) -> Option<usize> {
        self.player(session_id)?.seat
    }

    fn seated_players(&self) -> impl Iterator<Item = (usize, &Player)> + '_ {
        (0..self.max_seats).filter_map(move |s| self.seat_player(s).map(|p| (s, p)))
    }

    /// Seated players able to play the next hand.
    fn ready_count(&self) -> usize {
        self.seated_players()
            .filter(|(_, p)| p.bankroll > Chips::ZERO && !p.waiting)
            .count()
    }

    /// Players dealt in and not folded.
    fn live_count(&self) -> usize {
        self.seated_players().filter(|(_, p)| p.is_live()).count()
    }

    /// Players that can still take betting actions.
    fn actors_count(&self) -> usize {
        self.seated_players().filter(|(_, p)| p.can_act()).count()
    }

    /// The first seat at or clockwise after `start` that can act.
    fn next_actor_from(&self, start: usize) -> Option<usize> {
        (0..self.max_seats)
            .map(|i| (start + i) % self.max_seats)
            .find(|&s| self.seat_player(s).is_some_and(Player::can_act))
    }

    /// The first seat at or clockwise after `start` ready for a hand.
    fn next_ready_from(&self, start: usize) -> Option<usize> {
        (0..self.max_seats)
            .map(|i| (start + i) % self.max_seats)
            .find(|&s| {
                self.seat_player(s)
                    .is_some_and(|p| p.bankroll > Chips::ZERO && !p.waiting)
            })
    }

    fn require_host(
        &self,
        session_id: &SessionId,
        what: &'static str,
    ) -> Result<(), ActionError> {
        if self.host.as_ref() == Some(session_id) {
            Ok(())
        } else {
            Err(ActionError::HostOnly(what))
        }
    }

    fn set_host(&mut self, host: Option<SessionId>) {
        self.host = host;
        if let Some(session_id) = self.host.clone() {
            let name = self
                .player(&session_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            self.event(GameEvent::HostChanged { name });
            self.event_to(&session_id, GameEvent::YouAreHost);
        }
    }

    // ==== views ====

    fn public_cards(&self, p: &Player) -> PlayerCards {
        if !p.in_hand() || p.folded {
            PlayerCards::None
        } else if p.shown {
            match p.hole_cards {
                Some((c1, c2)) => PlayerCards::Cards(c1, c2),
                None => PlayerCards::None,
            }
        } else {
            PlayerCards::Covered
        }
    }

    fn legal_actions(&self, seat: usize, p: &Player) -> Vec<ActionKind> {
        if self.turn != Some(seat) || !self.phase.is_betting() || self.paused {
            return Vec::new();
        }

        let to_call = self.current_bet - p.round_bet;
        let mut actions = vec![ActionKind::Fold];
        if to_call == Chips::ZERO {
            actions.push(ActionKind::Check);
        } else {
            actions.push(ActionKind::Call);
        }

        if !self.acted.contains(&seat) {
            if self.current_bet == Chips::ZERO {
                actions.push(ActionKind::Bet);
            } else if p.bankroll > p.to_call(self.current_bet) {
                actions.push(ActionKind::Raise);
            }
        }

        actions.push(ActionKind::AllIn);
        actions
    }

    fn player_view(&self, p: &Player, room: &RoomSnapshot) -> PlayerView {
        let seat = p.seat;
        let (to_call, actions) = match seat {
            Some(s) if self.turn == Some(s) => (
                p.to_call(self.current_bet),
                self.legal_actions(s, p),
            ),
            _ => (Chips::ZERO, Vec::new()),
        };

        let best_hand = p.hole_cards.map(|(c1, c2)| {
            let mut cards = vec![c1, c2];
            cards.extend_from_slice(&self.board);
            HandValue::eval(&cards).describe()
        });

        let must_show = seat.is_some_and(|s| {
            self.showdown
                .as_ref()
                .is_some_and(|sd| sd.must_show.contains(&s))
        });
        let can_reveal = self.phase == Phase::Showdown
            && p.is_live()
            && !p.shown
            && !p.mucked;

        PlayerView {
            room: room.clone(),
            seat,
            hole_cards: p.hole_cards,
            to_call,
            actions,
            pending_request: self
                .seat_requests
                .iter()
                .find(|r| r.session_id == p.session_id)
                .map(|r| r.id),
            best_hand,
            is_host: self.host.as_ref() == Some(&p.session_id),
            must_show,
            can_reveal,
        }
    }

    // ==== outbound ====

    fn reply(&mut self, session_id: &SessionId, reply: CommandReply) {
        self.outbox.push(Outbound::To(
            session_id.clone(),
            ServerFrame::Reply(reply),
        ));
    }

    fn event(&mut self, event: GameEvent) {
        self.outbox
            .push(Outbound::Broadcast(ServerFrame::Event(event)));
    }

    fn event_to(&mut self, session_id: &SessionId, event: GameEvent) {
        self.outbox.push(Outbound::To(
            session_id.clone(),
            ServerFrame::Event(event),
        ));
    }

    /// Emits the public snapshot and a private view per member.
    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        let views = self
            .players
            .iter()
            .map(|p| (p.session_id.clone(), self.player_view(p, &snapshot)))
            .collect::<Vec<_>>();

        self.outbox
            .push(Outbound::Broadcast(ServerFrame::RoomState(snapshot)));
        for (session_id, view) in views {
            self.outbox
                .push(Outbound::To(session_id, ServerFrame::PlayerState(view)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tablestakes_core::cards::{Rank, Suit};

    fn session(i: usize) -> SessionId {
        SessionId::new(format!("sess-{i}")).unwrap()
    }

    // Builds a card from "AS" style notation.
    fn c(s: &str) -> Card {
        let mut chars = s.chars();
        let rank = "23456789TJQKA"
            .find(chars.next().unwrap())
            .map(|i| Rank::ranks().nth(i).unwrap())
            .unwrap();
        let suit = match chars.next().unwrap() {
            'C' => Suit::Clubs,
            'D' => Suit::Diamonds,
            'H' => Suit::Hearts,
            _ => Suit::Spades,
        };
        Card::new(rank, suit)
    }

    struct TestRoom {
        state: RoomState,
        now: Instant,
    }

    impl TestRoom {
        fn new() -> Self {
            let opts = RoomOptions {
                name: "test room".to_string(),
                max_seats: 8,
                small_blind: Chips::new(10),
                big_blind: Chips::new(20),
                secret: Some("sesame".to_string()),
            };
            Self {
                state: RoomState::new("abc123".into(), opts, StdRng::seed_from_u64(121)),
                now: Instant::now(),
            }
        }

        fn join(&mut self, i: usize) {
            self.state
                .join(&session(i), &format!("player-{i}"), self.now)
                .expect("join should succeed");
        }

        fn apply(&mut self, i: usize, cmd: ClientCommand) -> CommandReply {
            self.state.apply(&session(i), cmd, self.now);
            let sid = session(i);
            self.state
                .outbox
                .iter()
                .rev()
                .find_map(|o| match o {
                    Outbound::To(s, ServerFrame::Reply(r)) if s == &sid => Some(r.clone()),
                    _ => None,
                })
                .expect("no reply found")
        }

        fn ok(&mut self, i: usize, cmd: ClientCommand) {
            let reply = self.apply(i, cmd);
            assert!(reply.success, "unexpected error: {:?}", reply.error);
        }

        fn fails(&mut self, i: usize, cmd: ClientCommand, error: &str) {
            let reply = self.apply(i, cmd);
            assert_eq!(reply.error.as_deref(), Some(error));
        }

        /// Joins and seats player `i` at seat `i` with the given buy-ins,
        /// player 0 hosting.
        fn seat_players(&mut self, buy_ins: &[u32]) {
            for (i, &buy_in) in buy_ins.iter().enumerate() {
                self.join(i);
                self.ok(
                    i,
                    ClientCommand::RequestSeat {
                        seat: i,
                        buy_in: Chips::new(buy_in),
                    },
                );
                if i != 0 {
                    let request_id = self.state.seat_requests.last().unwrap().id;
                    self.ok(0, ClientCommand::ApproveSeat { request_id });
                }
            }
        }

        fn start(&mut self, buy_ins: &[u32]) {
            self.seat_players(buy_ins);
            self.ok(0, ClientCommand::StartGame);
        }

        fn action(&mut self, i: usize, action: ActionKind, amount: u32) {
            self.ok(
                i,
                ClientCommand::Action {
                    action,
                    amount: Chips::new(amount),
                },
            );
        }

        fn check_down(&mut self, seats: &[usize]) {
            for &s in seats {
                self.action(s, ActionKind::Check, 0);
            }
        }

        fn bankroll(&self, seat: usize) -> u32 {
            self.state.seat_player(seat).unwrap().bankroll.amount()
        }

        fn tick(&mut self, delay: Duration) {
            self.now += delay;
            self.state.tick(self.now);
        }

        fn events(&self) -> Vec<GameEvent> {
            self.state
                .outbox
                .iter()
                .filter_map(|o| match o {
                    Outbound::Broadcast(ServerFrame::Event(e)) => Some(e.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Chips in play: every member bankroll plus the pot.
        fn total_chips(&self) -> u32 {
            let banks = self.state.players.iter().map(|p| p.bankroll).sum::<Chips>();
            (banks + self.state.pot()).amount()
        }
    }

    #[test]
    fn heads_up_preflop_fold() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        // Heads-up the dealer posts the small blind and acts first.
        assert_eq!(t.state.phase, Phase::PreFlop);
        assert_eq!(t.state.dealer, 0);
        assert_eq!(t.state.sb_seat, 0);
        assert_eq!(t.state.bb_seat, 1);
        assert_eq!(t.state.turn, Some(0));
        assert_eq!(t.bankroll(0), 990);
        assert_eq!(t.bankroll(1), 980);

        t.action(0, ActionKind::Fold, 0);

        assert_eq!(t.state.phase, Phase::Showdown);
        assert_eq!(t.bankroll(0), 990);
        assert_eq!(t.bankroll(1), 1010);

        // The winner takes the pot without revealing cards.
        let won = t.events().into_iter().find_map(|e| match e {
            GameEvent::HandWon { payoffs } => Some(payoffs),
            _ => None,
        });
        let payoffs = won.expect("hand won event");
        assert_eq!(payoffs.len(), 1);
        assert_eq!(payoffs[0].seat, 1);
        assert_eq!(payoffs[0].chips, Chips::new(30));
        assert!(payoffs[0].cards.is_none());
        assert_eq!(
            t.state.snapshot().seats[1].as_ref().unwrap().cards,
            PlayerCards::Covered
        );
    }

    #[test]
    fn three_way_full_raise_reopens_the_round() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000, 1000]);

        // Dealer 0, SB 1, BB 2; first to act preflop is the dealer.
        assert_eq!((t.state.dealer, t.state.sb_seat, t.state.bb_seat), (0, 1, 2));
        assert_eq!(t.state.turn, Some(0));

        t.action(0, ActionKind::Raise, 20); // to 40
        assert_eq!(t.state.current_bet, Chips::new(40));
        t.action(1, ActionKind::Call, 0);

        // The big blind's raise to 80 is full and reopens the round.
        t.action(2, ActionKind::Raise, 40);
        assert_eq!(t.state.current_bet, Chips::new(80));
        assert_eq!(t.state.min_raise, Chips::new(40));
        assert_eq!(t.state.turn, Some(0));

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Call, 0);

        // Round over: flop dealt, pot holds the full 240, the small blind
        // acts first postflop and the minimum raise resets.
        assert_eq!(t.state.phase, Phase::Flop);
        assert_eq!(t.state.pot(), Chips::new(240));
        assert_eq!(t.state.turn, Some(1));
        assert_eq!(t.state.min_raise, Chips::new(20));
    }

    #[test]
    fn short_all_in_does_not_reopen() {
        let mut t = TestRoom::new();
        // Seat 2 is the 35 chip big blind of the scenario.
        t.seat_players(&[1000, 1000, 200]);
        t.state.seat_player_mut(2).unwrap().bankroll = Chips::new(35);
        t.ok(0, ClientCommand::StartGame);
        assert_eq!((t.state.dealer, t.state.sb_seat, t.state.bb_seat), (0, 1, 2));

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Raise, 40); // to 60, a full raise
        assert_eq!(t.state.min_raise, Chips::new(40));

        // The short all-in adds 15 for a total of 35: no reopen, the
        // acted set and minimum raise are untouched.
        t.action(2, ActionKind::AllIn, 0);
        assert_eq!(t.state.current_bet, Chips::new(60));
        assert_eq!(t.state.min_raise, Chips::new(40));
        assert!(t.state.acted.contains(&1));
        assert!(t.state.acted.contains(&2));
        assert!(!t.state.acted.contains(&0));

        // Calling closes the round, the raiser never gets to raise again.
        t.action(0, ActionKind::Call, 0);
        assert_eq!(t.state.phase, Phase::Flop);

        // Check it down to showdown: main pot 105 for everyone, side pot
        // 50 contested by the full stacks only.
        t.check_down(&[1, 0]);
        t.check_down(&[1, 0]);
        t.check_down(&[1, 0]);

        assert_eq!(t.state.phase, Phase::Showdown);
        let results = t.state.showdown.as_ref().unwrap().results.clone();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chips, Chips::new(105));
        assert_eq!(results[1].chips, Chips::new(50));
        assert!(results[1].winners.iter().all(|s| [0, 1].contains(s)));
        assert_eq!(t.total_chips(), 2035);
    }

    #[test]
    fn acted_seat_cannot_raise_over_a_short_all_in() {
        let mut t = TestRoom::new();
        t.seat_players(&[1000, 200, 1000]);
        t.state.seat_player_mut(1).unwrap().bankroll = Chips::new(45);
        t.ok(0, ClientCommand::StartGame);

        // Dealer 0 opens to 40; the 45 chip SB shoves 35 more for a
        // total of 45, a short raise of 5 that does not reopen.
        t.action(0, ActionKind::Raise, 20);
        t.action(1, ActionKind::AllIn, 0);
        assert_eq!(t.state.current_bet, Chips::new(45));
        assert_eq!(t.state.min_raise, Chips::new(20));

        t.action(2, ActionKind::Fold, 0);

        // Seat 0 already acted and only faces the short 5: calling and
        // folding are the only options.
        assert_eq!(t.state.turn, Some(0));
        t.fails(
            0,
            ClientCommand::Action {
                action: ActionKind::Raise,
                amount: Chips::new(40),
            },
            "raising is not open to you",
        );
        t.fails(
            0,
            ClientCommand::Action {
                action: ActionKind::AllIn,
                amount: Chips::ZERO,
            },
            "raising is not open to you",
        );
        t.action(0, ActionKind::Call, 0);
        assert_eq!(t.state.phase, Phase::Flop);
    }

    #[test]
    fn big_blind_keeps_the_option_after_a_limped_round() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000, 1000]);

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Call, 0);

        // Limped around: the round is not over, the big blind has the
        // option to check or raise with nothing to call.
        assert_eq!(t.state.phase, Phase::PreFlop);
        assert_eq!(t.state.turn, Some(2));
        let p = t.state.seat_player(2).unwrap();
        let actions = t.state.legal_actions(2, p);
        assert!(actions.contains(&ActionKind::Check));
        assert!(actions.contains(&ActionKind::Raise));

        // A raise from the option reopens the limpers.
        t.action(2, ActionKind::Raise, 20);
        assert_eq!(t.state.turn, Some(0));
        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Call, 0);
        assert_eq!(t.state.phase, Phase::Flop);
    }

    #[test]
    fn split_pot_on_identical_two_pair() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        // Force the scenario board: both players play aces and fives
        // with a king kicker.
        t.state.seat_player_mut(0).unwrap().hole_cards = Some((c("KC"), c("QD")));
        t.state.seat_player_mut(1).unwrap().hole_cards = Some((c("KS"), c("JD")));
        t.state.deck = Deck::from_cards(vec![
            c("9S"), c("2H"), c("5H"), c("2D"), c("5C"), c("AD"), c("AS"), c("2C"),
        ]);

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Check, 0);
        t.check_down(&[1, 0]); // flop
        t.check_down(&[1, 0]); // turn
        t.check_down(&[1, 0]); // river

        assert_eq!(t.state.phase, Phase::Showdown);
        assert_eq!(t.state.board, vec![c("AS"), c("AD"), c("5C"), c("5H"), c("9S")]);

        // The 40 chip pot splits evenly, no remainder.
        let results = t.state.showdown.as_ref().unwrap().results.clone();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].winners, vec![0, 1]);
        assert_eq!(t.bankroll(0), 1000);
        assert_eq!(t.bankroll(1), 1000);
    }

    #[test]
    fn folder_chips_stay_in_the_pot() {
        let mut t = TestRoom::new();
        t.start(&[500, 1000, 1000]);

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Call, 0);
        t.action(2, ActionKind::Check, 0);
        assert_eq!(t.state.phase, Phase::Flop);

        // Seat 1 bets the flop, seat 2 calls, seat 0 folds its 20.
        t.action(1, ActionKind::Bet, 100);
        t.action(2, ActionKind::Call, 0);
        t.action(0, ActionKind::Fold, 0);
        assert_eq!(t.state.phase, Phase::Turn);
        assert_eq!(t.state.pot(), Chips::new(260));

        t.check_down(&[1, 2]);
        t.check_down(&[1, 2]);

        // One pot with the folder's chips, contested by seats 1 and 2.
        let results = t.state.showdown.as_ref().unwrap().results.clone();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chips, Chips::new(260));
        assert!(results[0].winners.iter().all(|s| [1, 2].contains(s)));
        assert_eq!(t.total_chips(), 2500);
    }

    #[test]
    fn run_it_twice_unanimous_accept() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        // Both players all-in preflop: the offer opens before any street.
        t.action(0, ActionKind::AllIn, 0);
        t.action(1, ActionKind::Call, 0);
        assert!(t.state.rit_offer.is_some());
        assert!(t.state.board.is_empty());
        assert!(t
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::RitOffered { seats, .. } if seats == &[0, 1])));

        t.ok(0, ClientCommand::RunItTwiceVote { accept: true });
        t.ok(1, ClientCommand::RunItTwiceVote { accept: true });
        assert!(t.state.rit_active);

        // Streets are dealt twice from the same deck with burns.
        t.tick(Duration::from_secs(1));
        assert_eq!(t.state.board.len(), 3);
        assert_eq!(t.state.second_board.as_ref().unwrap().len(), 3);
        t.tick(Duration::from_secs(1));
        t.tick(Duration::from_secs(1));
        assert_eq!(t.state.board.len(), 5);
        assert_eq!(t.state.second_board.as_ref().unwrap().len(), 5);

        t.tick(Duration::from_secs(1));
        assert_eq!(t.state.phase, Phase::Showdown);

        // No card repeats across the two boards.
        let mut all = t.state.board.clone();
        all.extend(t.state.second_board.clone().unwrap());
        let unique = all.iter().map(|c| c.to_string()).collect::<AHashSet<_>>();
        assert_eq!(unique.len(), 10);

        // Each half of the pot is resolved against its own board.
        let results = t.state.showdown.as_ref().unwrap().results.clone();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].board, 1);
        assert_eq!(results[1].board, 2);
        assert_eq!(results[0].chips, Chips::new(1000));
        assert_eq!(results[1].chips, Chips::new(1000));
        assert_eq!(t.total_chips(), 2000);
    }

    #[test]
    fn run_it_twice_needs_unanimity() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        t.action(0, ActionKind::AllIn, 0);
        t.action(1, ActionKind::Call, 0);

        t.ok(0, ClientCommand::RunItTwiceVote { accept: true });
        t.ok(1, ClientCommand::RunItTwiceVote { accept: false });

        assert!(!t.state.rit_active);
        assert!(t.state.rit_offer.is_none());
        assert!(t
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::RitResult { accepted: false })));

        for _ in 0..4 {
            t.tick(Duration::from_secs(1));
        }
        assert_eq!(t.state.phase, Phase::Showdown);
        assert!(t.state.second_board.is_none());
        assert_eq!(t.total_chips(), 2000);
    }

    #[test]
    fn run_it_twice_offer_times_out_as_decline() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        t.action(0, ActionKind::AllIn, 0);
        t.action(1, ActionKind::Call, 0);
        t.ok(0, ClientCommand::RunItTwiceVote { accept: true });

        t.tick(Duration::from_secs(16));
        assert!(t.state.rit_offer.is_none());
        assert!(!t.state.rit_active);
    }

    #[test]
    fn blinds_going_all_in_fast_forward_the_hand() {
        let mut t = TestRoom::new();
        t.seat_players(&[200, 200]);

        // Two stacks shorter than their blinds: posting puts both all-in
        // and the hand has no betting at all.
        t.state.seat_player_mut(0).unwrap().bankroll = Chips::new(10);
        t.state.seat_player_mut(1).unwrap().bankroll = Chips::new(10);
        t.ok(0, ClientCommand::StartGame);

        assert!(t.state.rit_offer.is_some());
        assert_eq!(t.state.pot(), Chips::new(20));

        t.ok(0, ClientCommand::RunItTwiceVote { accept: false });
        for _ in 0..4 {
            t.tick(Duration::from_secs(1));
        }
        assert_eq!(t.state.phase, Phase::Showdown);
        assert_eq!(t.total_chips(), 20);
    }

    #[test]
    fn seat_request_lifecycle() {
        let mut t = TestRoom::new();
        t.join(0);
        t.join(1);

        // Requests are validated before queueing.
        t.fails(
            1,
            ClientCommand::RequestSeat { seat: 99, buy_in: Chips::new(200) },
            "invalid seat",
        );
        t.fails(
            1,
            ClientCommand::RequestSeat { seat: 3, buy_in: Chips::new(150) },
            "minimum buy-in is 200",
        );

        t.ok(1, ClientCommand::RequestSeat { seat: 3, buy_in: Chips::new(200) });
        t.fails(
            1,
            ClientCommand::RequestSeat { seat: 4, buy_in: Chips::new(200) },
            "seat request already pending",
        );

        // Only the host approves or denies.
        let request_id = t.state.seat_requests[0].id;
        t.fails(
            1,
            ClientCommand::ApproveSeat { request_id },
            "only the host can approve seat requests",
        );
        t.ok(0, ClientCommand::DenySeat { request_id });
        assert!(t.state.seat_requests.is_empty());

        // Cancelled requests are dropped silently.
        t.ok(1, ClientCommand::RequestSeat { seat: 3, buy_in: Chips::new(200) });
        t.ok(1, ClientCommand::CancelSeatRequest);
        t.fails(1, ClientCommand::CancelSeatRequest, "no pending seat request");

        // Approval seats the player with its buy-in.
        t.ok(1, ClientCommand::RequestSeat { seat: 3, buy_in: Chips::new(500) });
        let request_id = t.state.seat_requests[0].id;
        t.ok(0, ClientCommand::ApproveSeat { request_id });
        assert_eq!(t.bankroll(3), 500);

        // The host seats itself without approval; the taken seat is
        // refused.
        t.fails(
            0,
            ClientCommand::RequestSeat { seat: 3, buy_in: Chips::new(200) },
            "seat taken",
        );
        t.ok(0, ClientCommand::RequestSeat { seat: 0, buy_in: Chips::new(200) });
        assert_eq!(t.bankroll(0), 200);
    }

    #[test]
    fn seat_taken_mid_hand_waits_for_the_next_one() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);
        assert_eq!(t.state.phase, Phase::PreFlop);

        t.join(2);
        t.ok(2, ClientCommand::RequestSeat { seat: 2, buy_in: Chips::new(400) });
        let request_id = t.state.seat_requests[0].id;
        t.ok(0, ClientCommand::ApproveSeat { request_id });

        // Seated but not dealt in.
        let p = t.state.seat_player(2).unwrap();
        assert!(p.waiting);
        assert!(!p.in_hand());

        // The hand plays out heads-up; the next one deals three players.
        t.action(0, ActionKind::Fold, 0);
        t.tick(Duration::from_secs(6));
        assert_eq!(t.state.phase, Phase::PreFlop);
        assert_eq!(t.state.hand_no, 2);
        let p = t.state.seat_player(2).unwrap();
        assert!(!p.waiting);
        assert!(p.in_hand());
    }

    #[test]
    fn host_succession_and_reclaim() {
        let mut t = TestRoom::new();
        t.join(0);
        t.join(1);
        t.join(2);
        assert_eq!(t.state.host, Some(session(0)));

        // The host leaving passes the role in join order.
        t.state.remove(&session(0), t.now);
        assert_eq!(t.state.host, Some(session(1)));
        assert!(t.state.outbox.iter().any(|o| matches!(
            o,
            Outbound::To(s, ServerFrame::Event(GameEvent::YouAreHost)) if s == &session(1)
        )));

        // The original host reclaims the role by session on rejoin.
        t.join(0);
        assert_eq!(t.state.host, Some(session(0)));
    }

    #[test]
    fn disconnect_mid_hand_folds_and_keeps_chips_in_the_pot() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000, 1000]);

        // The small blind disconnects out of turn: its 10 chips stay.
        t.state.remove(&session(1), t.now);
        assert_eq!(t.state.players.len(), 2);
        assert_eq!(t.state.pot(), Chips::new(30));
        assert_eq!(t.state.turn, Some(0));

        t.action(0, ActionKind::Call, 0);
        t.action(2, ActionKind::Check, 0);
        assert_eq!(t.state.phase, Phase::Flop);
        assert_eq!(t.state.pot(), Chips::new(50));

        t.check_down(&[2, 0]);
        t.check_down(&[2, 0]);
        t.check_down(&[2, 0]);

        // The departed chips went to the winner, chips in play balance:
        // the leaver took its 990 out of the original 3000.
        assert_eq!(t.state.phase, Phase::Showdown);
        assert_eq!(t.total_chips(), 2010);
    }

    #[test]
    fn empty_room_reaps_after_the_grace_window() {
        let mut t = TestRoom::new();
        t.join(0);
        t.state.remove(&session(0), t.now);

        t.tick(Duration::from_secs(30));
        assert!(!t.state.outbox.iter().any(|o| matches!(o, Outbound::Reap)));

        // Rejoining cancels the reap.
        t.join(0);
        t.tick(Duration::from_secs(120));
        assert!(!t.state.outbox.iter().any(|o| matches!(o, Outbound::Reap)));

        t.state.remove(&session(0), t.now);
        t.tick(Duration::from_secs(61));
        assert!(t.state.outbox.iter().any(|o| matches!(o, Outbound::Reap)));
    }

    #[test]
    fn pause_freezes_actions_and_timers() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        t.fails(1, ClientCommand::PauseGame, "only the host can pause the game");
        t.ok(0, ClientCommand::PauseGame);
        t.fails(
            0,
            ClientCommand::Action { action: ActionKind::Fold, amount: Chips::ZERO },
            "game is paused",
        );

        t.ok(0, ClientCommand::ResumeGame);
        t.action(0, ActionKind::Fold, 0);
        assert_eq!(t.state.phase, Phase::Showdown);

        // Pausing during the showdown window holds the next hand.
        t.ok(0, ClientCommand::PauseGame);
        t.tick(Duration::from_secs(30));
        assert_eq!(t.state.phase, Phase::Showdown);
        t.ok(0, ClientCommand::ResumeGame);
        t.tick(Duration::from_secs(6));
        assert_eq!(t.state.phase, Phase::PreFlop);
        assert_eq!(t.state.hand_no, 2);
    }

    #[test]
    fn stop_game_aborts_the_hand_and_refunds() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);
        t.action(0, ActionKind::Raise, 80);

        t.ok(0, ClientCommand::StopGame);
        assert_eq!(t.state.phase, Phase::Waiting);
        assert!(!t.state.game_running);
        assert_eq!(t.state.pot(), Chips::ZERO);
        assert_eq!(t.bankroll(0), 1000);
        assert_eq!(t.bankroll(1), 1000);

        // A stopped game refuses actions until restarted.
        t.fails(
            0,
            ClientCommand::Action { action: ActionKind::Fold, amount: Chips::ZERO },
            "no hand in progress",
        );
    }

    #[test]
    fn privileged_mode_and_rigged_hands() {
        let mut t = TestRoom::new();
        t.join(0);
        t.join(1);

        t.fails(
            0,
            ClientCommand::RigNextHand { hand_type: HandCategory::RoyalFlush },
            "god mode not enabled",
        );
        t.fails(
            1,
            ClientCommand::EnablePrivileged { secret: "wrong".to_string() },
            "nice try",
        );

        t.ok(0, ClientCommand::EnablePrivileged { secret: "sesame".to_string() });
        t.ok(0, ClientCommand::RigNextHand { hand_type: HandCategory::RoyalFlush });

        t.ok(0, ClientCommand::RequestSeat { seat: 0, buy_in: Chips::new(1000) });
        t.ok(1, ClientCommand::RequestSeat { seat: 1, buy_in: Chips::new(1000) });
        let request_id = t.state.seat_requests[0].id;
        t.ok(0, ClientCommand::ApproveSeat { request_id });
        t.ok(0, ClientCommand::StartGame);

        // The fixture gives the rigged seat a royal flush by the river.
        t.action(0, ActionKind::AllIn, 0);
        t.action(1, ActionKind::Call, 0);
        t.ok(0, ClientCommand::RunItTwiceVote { accept: false });
        for _ in 0..4 {
            t.tick(Duration::from_secs(1));
        }

        assert_eq!(t.state.phase, Phase::Showdown);
        let p = t.state.seat_player(0).unwrap();
        let mut cards = vec![p.hole_cards.unwrap().0, p.hole_cards.unwrap().1];
        cards.extend_from_slice(&t.state.board);
        assert_eq!(
            HandValue::eval(&cards).category(),
            HandCategory::RoyalFlush
        );
        assert_eq!(t.bankroll(0), 2000);
        assert_eq!(t.bankroll(1), 0);
    }

    #[test]
    fn busted_players_are_unseated_at_the_next_hand() {
        let mut t = TestRoom::new();
        t.join(0);
        t.join(1);
        t.ok(0, ClientCommand::EnablePrivileged { secret: "sesame".to_string() });
        t.ok(0, ClientCommand::RigNextHand { hand_type: HandCategory::Quads });
        t.ok(0, ClientCommand::RequestSeat { seat: 0, buy_in: Chips::new(1000) });
        t.ok(1, ClientCommand::RequestSeat { seat: 1, buy_in: Chips::new(1000) });
        let request_id = t.state.seat_requests[0].id;
        t.ok(0, ClientCommand::ApproveSeat { request_id });
        t.ok(0, ClientCommand::StartGame);

        t.action(0, ActionKind::AllIn, 0);
        t.action(1, ActionKind::Call, 0);
        t.ok(0, ClientCommand::RunItTwiceVote { accept: false });
        for _ in 0..4 {
            t.tick(Duration::from_secs(1));
        }
        assert_eq!(t.bankroll(1), 0);

        // The next hand cannot start with one stack: the loser is
        // unseated and stays in the room as a spectator.
        t.tick(Duration::from_secs(6));
        assert_eq!(t.state.phase, Phase::Waiting);
        assert!(t.state.seats[1].is_none());
        assert!(t.state.player(&session(1)).is_some());
        assert!(t
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::PlayersBusted { names } if names == &["player-1"])));
    }

    #[test]
    fn showdown_winners_must_show_and_losers_may_muck() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000]);

        // Fix the cards: the big blind wins with a pair of aces. It is
        // also the hand's last aggressor, so the loser alone may muck.
        t.state.seat_player_mut(0).unwrap().hole_cards = Some((c("7C"), c("2D")));
        t.state.seat_player_mut(1).unwrap().hole_cards = Some((c("AS"), c("AD")));
        t.state.deck = Deck::from_cards(vec![
            c("9S"), c("2H"), c("5H"), c("3D"), c("JC"), c("TD"), c("KS"), c("2C"),
        ]);

        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Check, 0);
        t.check_down(&[1, 0]);
        t.check_down(&[1, 0]);
        t.check_down(&[1, 0]);
        assert_eq!(t.state.phase, Phase::Showdown);

        let must_show = t.state.showdown.as_ref().unwrap().must_show.clone();
        assert_eq!(must_show, vec![1]);

        // The winner cannot muck; the loser may, or change its mind.
        t.fails(1, ClientCommand::MuckHand, "you must show your cards");
        t.ok(0, ClientCommand::MuckHand);
        t.ok(0, ClientCommand::ShowHand);
        assert_eq!(
            t.state.snapshot().seats[0].as_ref().unwrap().cards,
            PlayerCards::Cards(c("7C"), c("2D"))
        );

        t.fails(0, ClientCommand::Action {
            action: ActionKind::Check,
            amount: Chips::ZERO,
        }, "no hand in progress");
    }

    #[test]
    fn out_of_turn_and_bad_amounts_are_refused() {
        let mut t = TestRoom::new();
        t.start(&[1000, 1000, 1000]);

        t.fails(
            1,
            ClientCommand::Action { action: ActionKind::Call, amount: Chips::ZERO },
            "not your turn",
        );
        t.fails(
            0,
            ClientCommand::Action { action: ActionKind::Check, amount: Chips::ZERO },
            "cannot check, must call or raise",
        );
        t.fails(
            0,
            ClientCommand::Action { action: ActionKind::Raise, amount: Chips::new(10) },
            "minimum raise is 20",
        );

        // A spectator cannot act at all.
        t.join(5);
        t.fails(
            5,
            ClientCommand::Action { action: ActionKind::Call, amount: Chips::ZERO },
            "not seated",
        );
    }

    #[test]
    fn second_tab_with_the_same_session_is_refused() {
        let mut t = TestRoom::new();
        t.join(0);
        let err = t
            .state
            .join(&session(0), "player-0", t.now)
            .unwrap_err();
        assert!(matches!(err, ActionError::AlreadyJoined));
    }

    #[test]
    fn chip_conservation_across_a_full_hand() {
        let mut t = TestRoom::new();
        t.start(&[1000, 600, 350]);
        let total = t.total_chips();

        t.action(0, ActionKind::Raise, 40);
        t.action(1, ActionKind::Call, 0);
        t.action(2, ActionKind::AllIn, 0);
        t.action(0, ActionKind::Call, 0);
        t.action(1, ActionKind::Call, 0);
        assert_eq!(t.total_chips(), total);

        while t.state.phase.is_betting() {
            let turn = t.state.turn.expect("betting needs a turn seat");
            let p = t.state.seat_player(turn).unwrap();
            assert!(p.can_act());
            let sid_idx = (0..3).find(|&i| session(i) == p.session_id).unwrap();
            let to_call = p.to_call(t.state.current_bet);
            if to_call == Chips::ZERO {
                t.action(sid_idx, ActionKind::Check, 0);
            } else {
                t.action(sid_idx, ActionKind::Call, 0);
            }
            assert_eq!(t.total_chips(), total);
        }

        assert_eq!(t.state.phase, Phase::Showdown);
        assert_eq!(t.total_chips(), total);
    }
}
