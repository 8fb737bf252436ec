use crate::board::Board;
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::tile::{TileValue, EMPTY, OBSTACLE};
use ndarray::Array2;

/// Parses rows of whitespace-separated tokens into a raw value grid.
///
/// Each string slice is one row, starting from the top (row 0). Tokens are:
/// - a power of two from `2` to [`MAX_TILE_VALUE`](crate::tile::MAX_TILE_VALUE): a numbered tile
/// - `.`: an empty cell
/// - `#`: the obstacle
///
/// Every row must have the same number of tokens. The result is indexed
/// `[x, y]` and has the shape `(width, height)`.
///
/// # Examples
/// ```
/// use merge_puzzle::utils::values_from_str_array;
/// use merge_puzzle::tile::{EMPTY, OBSTACLE};
///
/// let values = values_from_str_array(&["2 . #", "4 8 ."]).unwrap();
/// assert_eq!(values.dim(), (3, 2));
/// assert_eq!(values[[0, 0]], 2);
/// assert_eq!(values[[1, 0]], EMPTY);
/// assert_eq!(values[[2, 0]], OBSTACLE);
/// assert_eq!(values[[1, 1]], 8);
///
/// assert!(values_from_str_array(&["2 3"]).is_err());
/// assert!(values_from_str_array(&["2 2", "2"]).is_err());
/// ```
pub fn values_from_str_array(s: &[&str]) -> Result<Array2<u32>> {
    let rows: Vec<Vec<&str>> = s.iter().map(|row| row.split_whitespace().collect()).collect();

    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    if height == 0 || width == 0 {
        return Err(GameError::InvalidBoard("board has no cells".to_string()));
    }

    let mut values = Array2::from_elem((width, height), EMPTY);
    for (y, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(GameError::InvalidBoard(format!(
                "Row {} has {} cells, expected {}",
                y,
                row.len(),
                width
            )));
        }
        for (x, token) in row.iter().enumerate() {
            values[[x, y]] = match *token {
                "." => EMPTY,
                "#" => OBSTACLE,
                number => match number.parse::<u32>() {
                    Ok(n) if n != EMPTY && n != OBSTACLE && TileValue::is_valid_raw(n) => n,
                    _ => {
                        return Err(GameError::InvalidBoard(format!(
                            "Unrecognized token '{}' in row {} col {}",
                            number, y, x
                        )))
                    }
                },
            };
        }
    }
    Ok(values)
}

/// Builds a board shaped after `s` with default options otherwise.
///
/// Handy for setting up specific positions; see [`values_from_str_array`]
/// for the format.
pub fn board_from_str_array(s: &[&str], seed: u64) -> Result<Board> {
    let values = values_from_str_array(s)?;
    let (width, height) = values.dim();
    let config = GameConfig {
        width,
        height,
        ..GameConfig::default()
    };
    let mut board = Board::new(&config, seed);
    board.load_values(&values)?;
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_from_str_array_valid() {
        let values = values_from_str_array(&["2 4 8 16", ". . # .", "2048 . . 2"]).unwrap();
        assert_eq!(values.dim(), (4, 3));
        assert_eq!(values[[3, 0]], 16);
        assert_eq!(values[[2, 1]], OBSTACLE);
        assert_eq!(values[[0, 2]], 2048);
    }

    #[test]
    fn test_values_from_str_array_invalid_token() {
        let err = values_from_str_array(&["2 X"]).unwrap_err();
        assert!(err.to_string().contains("Unrecognized token 'X'"));

        let err = values_from_str_array(&["1 2"]).unwrap_err();
        assert!(err.to_string().contains("Unrecognized token '1'"));
    }

    #[test]
    fn test_values_from_str_array_rejects_values_past_the_cap() {
        let top = crate::tile::MAX_TILE_VALUE;
        let row = format!("{} .", top);
        assert_eq!(values_from_str_array(&[row.as_str()]).unwrap()[[0, 0]], top);

        let row = format!("{} .", top * 2);
        assert!(values_from_str_array(&[row.as_str()]).is_err());
        let row = format!("{} .", u32::MAX);
        assert!(values_from_str_array(&[row.as_str()]).is_err());
    }

    #[test]
    fn test_values_from_str_array_ragged_rows() {
        let err = values_from_str_array(&["2 2 2", "2 2"]).unwrap_err();
        assert!(err.to_string().contains("Row 1 has 2 cells"));
    }

    #[test]
    fn test_values_from_str_array_empty_input() {
        let rows: [&str; 0] = [];
        assert!(values_from_str_array(&rows).is_err());
        assert!(values_from_str_array(&["   "]).is_err());
    }

    #[test]
    fn test_board_from_str_array_places_tiles() {
        let board = board_from_str_array(&["2 .", "# 4"], 9).unwrap();
        assert_eq!(board.width(), 2);
        assert_eq!(board.height(), 2);
        assert_eq!(board.tile_count(), 3);
        assert_eq!(board.value_at((0, 0)), Some(TileValue::Number(2)));
        assert_eq!(board.value_at((0, 1)), Some(TileValue::Obstacle));
        assert_eq!(board.value_at((1, 1)), Some(TileValue::Number(4)));
        assert!(board.check_invariants().is_empty());
    }
}
