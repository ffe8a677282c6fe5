// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Type definitions for messages between the client and server.
//!
//! Commands and frames travel as bincode encoded binary WebSocket
//! messages. Every client command is acknowledged with a [CommandReply]
//! on the sender connection, in command order.
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    cards::Card,
    eval::HandCategory,
    poker::{Chips, Phase, PlayerCards, RequestId, RoomId, SessionId},
};

/// A betting action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Give up the hand.
    Fold,
    /// Pass with nothing to call.
    Check,
    /// Match the current bet.
    Call,
    /// Open the betting, the amount is the bet size.
    Bet,
    /// Raise the current bet, the amount is the raise increment.
    Raise,
    /// Commit the whole remaining stack.
    AllIn,
}

impl ActionKind {
    /// The action label.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Fold => "FOLD",
            ActionKind::Check => "CHECK",
            ActionKind::Call => "CALL",
            ActionKind::Bet => "BET",
            ActionKind::Raise => "RAISE",
            ActionKind::AllIn => "ALL-IN",
        }
    }
}

/// A command from a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientCommand {
    /// Create a room and join it as host.
    CreateRoom {
        /// The room display name.
        name: String,
        /// The creator display name.
        username: String,
        /// The creator durable session id.
        session_id: SessionId,
        /// The small blind.
        small_blind: Chips,
        /// The big blind.
        big_blind: Chips,
        /// Seats at the table, 2 to 10.
        max_seats: usize,
    },
    /// Join an existing room as a spectator.
    JoinRoom {
        /// The room join code.
        room_id: RoomId,
        /// The player display name.
        username: String,
        /// The player durable session id.
        session_id: SessionId,
    },
    /// Request a seat, subject to host approval.
    RequestSeat {
        /// The target seat index.
        seat: usize,
        /// The proposed buy-in.
        buy_in: Chips,
    },
    /// Approve a seat request, host only.
    ApproveSeat {
        /// The request to approve.
        request_id: RequestId,
    },
    /// Deny a seat request, host only.
    DenySeat {
        /// The request to deny.
        request_id: RequestId,
    },
    /// Drop the sender's pending seat request.
    CancelSeatRequest,
    /// Vacate the sender's seat, folding if in the hand.
    LeaveSeat,
    /// Start dealing hands, host only.
    StartGame,
    /// Pause the game clock, host only.
    PauseGame,
    /// Resume a paused game, host only.
    ResumeGame,
    /// Stop the game and abort the hand, host only.
    StopGame,
    /// A betting action.
    Action {
        /// The action kind.
        action: ActionKind,
        /// Bet size or raise increment, ignored for other actions.
        amount: Chips,
    },
    /// Reveal the sender's cards at showdown.
    ShowHand,
    /// Hide the sender's cards at showdown.
    MuckHand,
    /// Cast a run-it-twice vote.
    RunItTwiceVote {
        /// Accept or decline dealing two boards.
        accept: bool,
    },
    /// Leave the room.
    LeaveRoom,
    /// Enable the privileged test hooks.
    EnablePrivileged {
        /// The shared secret.
        secret: String,
    },
    /// Stamp the next hand with a deterministic fixture, privileged only.
    RigNextHand {
        /// The hand category the sender's seat receives.
        hand_type: HandCategory,
    },
    /// Disable the privileged test hooks.
    DisablePrivileged,
}

/// The acknowledgment for a client command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandReply {
    /// Whether the command was applied.
    pub success: bool,
    /// The failure reason when not.
    pub error: Option<String>,
    /// The joined room, set on create and join replies.
    pub room_id: Option<RoomId>,
}

impl CommandReply {
    /// A success reply.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            room_id: None,
        }
    }

    /// A success reply carrying the joined room id.
    pub fn ok_room(room_id: RoomId) -> Self {
        Self {
            success: true,
            error: None,
            room_id: Some(room_id),
        }
    }

    /// A failure reply, the state is unchanged.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            room_id: None,
        }
    }
}

/// A frame from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerFrame {
    /// Acknowledgment of a client command.
    Reply(CommandReply),
    /// The public room snapshot, broadcast to every member.
    RoomState(RoomSnapshot),
    /// The private per-player view, unicast.
    PlayerState(PlayerView),
    /// A discrete game transition.
    Event(GameEvent),
}

/// The public view of an occupied seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    /// The player display name.
    pub name: String,
    /// The player chips behind.
    pub bankroll: Chips,
    /// Chips committed in the current betting round.
    pub round_bet: Chips,
    /// The player folded this hand.
    pub folded: bool,
    /// The player is all-in this hand.
    pub all_in: bool,
    /// The seat was taken mid-hand and waits for the next one.
    pub waiting: bool,
    /// The seat cards as publicly visible.
    pub cards: PlayerCards,
}

/// A pending seat request as shown in the room state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRequestView {
    /// The request id.
    pub request_id: RequestId,
    /// The requesting player name.
    pub name: String,
    /// The requested seat.
    pub seat: usize,
    /// The proposed buy-in.
    pub buy_in: Chips,
}

/// The result of one pot layer at showdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotResult {
    /// The pot layer index, main pot first.
    pub pot: usize,
    /// The board resolving this share, 1 or 2.
    pub board: u8,
    /// Chips in this share.
    pub chips: Chips,
    /// The winning seats.
    pub winners: Vec<usize>,
}

/// Chips pushed to one seat when a hand ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payoff {
    /// The winning seat.
    pub seat: usize,
    /// The winner display name.
    pub name: String,
    /// The chips won.
    pub chips: Chips,
    /// The winning hole cards when revealed.
    pub cards: Option<(Card, Card)>,
    /// The winning hand description when revealed.
    pub hand: Option<String>,
}

/// The showdown snapshot kept on the room state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowdownView {
    /// Per pot and per board results.
    pub results: Vec<PotResult>,
    /// Seats that must show their cards, winners plus the last aggressor.
    pub must_show: Vec<usize>,
}

/// The public room snapshot broadcast to every member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// The room join code.
    pub room_id: RoomId,
    /// The room display name.
    pub name: String,
    /// The host display name.
    pub host: Option<String>,
    /// The monotonic hand counter.
    pub hand_no: u64,
    /// The hand phase.
    pub phase: Phase,
    /// One slot per seat.
    pub seats: Vec<Option<SeatView>>,
    /// The community board.
    pub board: Vec<Card>,
    /// The second board when running it twice.
    pub second_board: Option<Vec<Card>>,
    /// Total chips in the pot this hand.
    pub pot: Chips,
    /// The highest bet of the current round.
    pub current_bet: Chips,
    /// The minimum raise increment.
    pub min_raise: Chips,
    /// The dealer button seat.
    pub dealer: Option<usize>,
    /// The small blind seat.
    pub small_blind_seat: Option<usize>,
    /// The big blind seat.
    pub big_blind_seat: Option<usize>,
    /// The seat whose action is awaited.
    pub turn: Option<usize>,
    /// The small blind amount.
    pub small_blind: Chips,
    /// The big blind amount.
    pub big_blind: Chips,
    /// Whether the game session is running.
    pub game_running: bool,
    /// Whether the game is paused.
    pub paused: bool,
    /// Pending seat requests.
    pub seat_requests: Vec<SeatRequestView>,
    /// The showdown snapshot while in the show or muck window.
    pub showdown: Option<ShowdownView>,
}

/// The private per-player state, the public snapshot plus hidden details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    /// The public snapshot this view extends.
    pub room: RoomSnapshot,
    /// The player seat, if seated.
    pub seat: Option<usize>,
    /// The player hole cards.
    pub hole_cards: Option<(Card, Card)>,
    /// Chips needed to call.
    pub to_call: Chips,
    /// The legal actions when it is this player's turn.
    pub actions: Vec<ActionKind>,
    /// The player's pending seat request.
    pub pending_request: Option<RequestId>,
    /// Description of the current best hand, for UI hinting only.
    pub best_hand: Option<String>,
    /// Whether this player holds the host controls.
    pub is_host: bool,
    /// The player must show at showdown.
    pub must_show: bool,
    /// The player may still show or muck at showdown.
    pub can_reveal: bool,
}

/// A discrete game transition broadcast to the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player joined the room.
    PlayerJoined {
        /// The player display name.
        name: String,
    },
    /// A player left the room.
    PlayerLeft {
        /// The player display name.
        name: String,
    },
    /// The host role moved to another player.
    HostChanged {
        /// The new host display name.
        name: String,
    },
    /// Tells a player it now holds the host controls.
    YouAreHost,
    /// A seat was requested.
    SeatRequested {
        /// The request id.
        request_id: RequestId,
        /// The requesting player name.
        name: String,
        /// The requested seat.
        seat: usize,
        /// The proposed buy-in.
        buy_in: Chips,
    },
    /// A seat request was approved and the player seated.
    SeatApproved {
        /// The seated player name.
        name: String,
        /// The seat taken.
        seat: usize,
        /// The buy-in brought to the seat.
        buy_in: Chips,
    },
    /// A seat request was denied.
    SeatDenied {
        /// The denied request.
        request_id: RequestId,
    },
    /// The host started the game.
    GameStarted,
    /// The host paused the game.
    GamePaused,
    /// The host resumed the game.
    GameResumed,
    /// The host stopped the game, the hand was aborted.
    GameStopped,
    /// A new hand started.
    NewHand {
        /// The hand number.
        hand_no: u64,
        /// The dealer button seat.
        dealer: usize,
        /// The small blind seat.
        small_blind_seat: usize,
        /// The big blind seat.
        big_blind_seat: usize,
    },
    /// The flop was dealt.
    Flop {
        /// The three flop cards.
        cards: [Card; 3],
        /// The second board flop when running it twice.
        second: Option<[Card; 3]>,
    },
    /// The turn was dealt.
    TurnCard {
        /// The turn card.
        card: Card,
        /// The second board turn when running it twice.
        second: Option<Card>,
    },
    /// The river was dealt.
    RiverCard {
        /// The river card.
        card: Card,
        /// The second board river when running it twice.
        second: Option<Card>,
    },
    /// A player acted.
    PlayerActed {
        /// The acting seat.
        seat: usize,
        /// The action kind.
        action: ActionKind,
        /// The seat's round bet after the action.
        chips: Chips,
    },
    /// Run-it-twice was offered to the seats still in the hand.
    RitOffered {
        /// The seats asked to vote.
        seats: Vec<usize>,
        /// Seconds before the offer expires.
        timeout_secs: u64,
    },
    /// A run-it-twice vote was cast.
    RitVote {
        /// The voting seat.
        seat: usize,
        /// The vote.
        accept: bool,
    },
    /// The run-it-twice offer was resolved.
    RitResult {
        /// Whether two boards will be dealt.
        accepted: bool,
    },
    /// The showdown results, one entry per pot share.
    Showdown {
        /// Per pot and per board results.
        results: Vec<PotResult>,
    },
    /// Chips were pushed to the winners.
    HandWon {
        /// The payoffs.
        payoffs: Vec<Payoff>,
    },
    /// Players lost their last chips and were unseated.
    PlayersBusted {
        /// The busted player names.
        names: Vec<String>,
    },
}

/// Encodes a message for the wire.
pub fn encode<T: Serialize>(msg: &T) -> Vec<u8> {
    bincode::serialize(msg).expect("message types serialize")
}

/// Decodes a message from the wire.
pub fn decode<T: DeserializeOwned>(buf: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(buf)?)
}
