//! Undoable commands and the bounded undo/redo history.

use crate::board::{Board, MoveOutcome};
use crate::error::Result;
use crate::grid::Direction;
use ndarray::Array2;
use rand::rngs::SmallRng;
use std::collections::VecDeque;

/// Full copy of the board taken right before a command runs.
///
/// Besides every cell value and the score it keeps the spawn RNG state, so a
/// redo after an undo spawns exactly the tiles the original move spawned.
#[derive(Clone, Debug)]
pub struct Snapshot {
    values: Array2<u32>,
    score: u32,
    rng: SmallRng,
}

impl Snapshot {
    pub fn capture(board: &Board, score: u32) -> Self {
        Snapshot {
            values: board.values(),
            score,
            rng: board.rng().clone(),
        }
    }

    /// Raw cell values, one per grid cell.
    pub fn values(&self) -> &Array2<u32> {
        &self.values
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Discards every tile on `board` and rebuilds it from the snapshot.
    pub fn restore(&self, board: &mut Board, score: &mut u32) -> Result<()> {
        board.load_values(&self.values)?;
        board.set_rng(self.rng.clone());
        *score = self.score;
        Ok(())
    }
}

/// An executable, undoable action.
#[derive(Clone, Debug)]
pub enum Command {
    Move {
        direction: Direction,
        /// Board state before the last execution.
        snapshot: Option<Snapshot>,
    },
}

impl Command {
    pub fn new_move(direction: Direction) -> Self {
        Command::Move {
            direction,
            snapshot: None,
        }
    }

    pub fn execute(&mut self, board: &mut Board, score: &mut u32) -> MoveOutcome {
        match self {
            Command::Move {
                direction,
                snapshot,
            } => {
                if board.is_moving() {
                    return MoveOutcome::Rejected;
                }
                *snapshot = Some(Snapshot::capture(board, *score));
                board.move_tiles(*direction)
            }
        }
    }

    pub fn undo(&self, board: &mut Board, score: &mut u32) -> Result<()> {
        match self {
            Command::Move {
                snapshot: Some(snapshot),
                ..
            } => snapshot.restore(board, score),
            Command::Move { snapshot: None, .. } => Ok(()),
        }
    }
}

/// Two bounded stacks of commands. The most recent entry sits at the back.
#[derive(Clone, Debug)]
pub struct CommandHistory {
    undo: VecDeque<Command>,
    redo: VecDeque<Command>,
    capacity: usize,
}

fn push_bounded(stack: &mut VecDeque<Command>, command: Command, capacity: usize) {
    while stack.len() >= capacity {
        stack.pop_front();
    }
    stack.push_back(command);
}

impl CommandHistory {
    /// History holding at most `capacity` undo and `capacity` redo entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CommandHistory {
            undo: VecDeque::with_capacity(capacity),
            redo: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Executes `command` and records it if it changed the board.
    ///
    /// Recording evicts the oldest entry once the history is at capacity and
    /// always discards every pending redo. A rejected or no-op command leaves
    /// both stacks as they were.
    ///
    /// # Arguments
    /// * `command`: A fresh command; its snapshot is taken here.
    /// * `board`: The board the command runs against.
    /// * `score`: The current score, saved with the snapshot.
    ///
    /// # Returns
    /// The outcome of the underlying move.
    pub fn add_command(
        &mut self,
        mut command: Command,
        board: &mut Board,
        score: &mut u32,
    ) -> MoveOutcome {
        let outcome = command.execute(board, score);
        if outcome.has_update() {
            push_bounded(&mut self.undo, command, self.capacity);
            // A new branch of play invalidates whatever was undone before.
            self.redo.clear();
        }
        outcome
    }

    /// Reverts the most recent command. Returns whether anything was undone.
    ///
    /// Does nothing while a move is still settling.
    pub fn undo(&mut self, board: &mut Board, score: &mut u32) -> Result<bool> {
        if board.is_moving() {
            return Ok(false);
        }
        let Some(command) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = command.undo(board, score) {
            // Keep it so the caller can retry
            self.undo.push_back(command);
            return Err(err);
        }
        log::debug!("Undone, {} left to undo", self.undo.len());
        push_bounded(&mut self.redo, command, self.capacity);
        Ok(true)
    }

    /// Re-executes the most recently undone command. Returns whether anything
    /// was redone.
    pub fn redo(&mut self, board: &mut Board, score: &mut u32) -> bool {
        if board.is_moving() {
            return false;
        }
        let Some(mut command) = self.redo.pop_back() else {
            return false;
        };
        let outcome = command.execute(board, score);
        if !outcome.has_update() {
            log::warn!("Redo did not change the board ({:?}), dropping it", outcome);
            return false;
        }
        log::debug!("Redone, {} left to redo", self.redo.len());
        push_bounded(&mut self.undo, command, self.capacity);
        true
    }

    /// Forgets every command.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
