//! # Merge Puzzle Library
//!
//! This library provides the game-state engine for a 2048-style tile-merging
//! puzzle with a single immovable obstacle, plus a bounded undo/redo history
//! built on full-board snapshots.
//!
//! It is used by the `human_player` binary, which plays the game in a
//! terminal.
//!
//! ## Modules
//! - `grid`: the fixed cell matrix, directions and scan order.
//! - `tile`: tile values, tiers and the per-turn merge lock.
//! - `board`: move and merge resolution, spawning, game-over detection.
//! - `timeline`: the virtual clock that settles moves and merges.
//! - `command`: snapshot-based move commands and the bounded history.
//! - `session`: score, best score, new game / game over, input routing.
//! - `store`: where the best score is kept between sessions.
//! - `config`: recognized options and the tier style table.
//! - `utils`: parsing boards from text, mostly for tests and the CLI.

pub mod board;
pub mod command;
pub mod config;
pub mod error;
pub mod grid;
pub mod session;
pub mod store;
pub mod tile;
pub mod timeline;
pub mod utils;

pub use error::{GameError, Result};
