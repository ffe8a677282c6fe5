// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Tablestakes Poker core types shared by client and server.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

pub mod cards;
pub mod eval;
pub mod message;
pub mod poker;
