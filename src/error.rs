use crate::grid::Coord2;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid coordinates {0:?}")]
    InvalidCoords(Coord2),
    #[error("Cell {0:?} is already occupied")]
    CellOccupied(Coord2),
    #[error("Board is full, no empty cell to spawn into")]
    BoardFull,
    #[error("Invalid board: {0}")]
    InvalidBoard(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
