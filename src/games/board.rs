//! Cartela boards
//!
//! A board is 25 numbers laid out row-major as 5 rows of 5 columns (B I N G O).
//! Each column holds 5 distinct numbers from its 15-number range. Boards are
//! derived from a cartela number by a pure function, so the same cartela
//! always reproduces the same board and concurrent derivations never share
//! RNG state.

use crate::errors::{EngineError, EngineResult};
use crate::games::types::{Column, WinReason};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const BOARD_CELLS: usize = 25;
pub const BOARD_SIDE: usize = 5;
/// Center cell, pre-marked as the free space
pub const FREE_CELL_INDEX: usize = 12;
pub const MAX_NUMBER: u8 = 75;
pub const CARTELA_COUNT: u32 = 100;

const CARTELA_SEED_CONTEXT: &[u8] = b"bingo-cartela:";

/// Every winning line with the reason reported for it, in check order
pub const WIN_LINES: [([usize; 5], WinReason); 12] = [
    ([0, 1, 2, 3, 4], WinReason::Row),
    ([5, 6, 7, 8, 9], WinReason::Row),
    ([10, 11, 12, 13, 14], WinReason::Row),
    ([15, 16, 17, 18, 19], WinReason::Row),
    ([20, 21, 22, 23, 24], WinReason::Row),
    ([0, 5, 10, 15, 20], WinReason::Column),
    ([1, 6, 11, 16, 21], WinReason::Column),
    ([2, 7, 12, 17, 22], WinReason::Column),
    ([3, 8, 13, 18, 23], WinReason::Column),
    ([4, 9, 14, 19, 24], WinReason::Column),
    ([0, 6, 12, 18, 24], WinReason::Diagonal),
    ([4, 8, 12, 16, 20], WinReason::Diagonal),
];

/// A player's 5x5 board
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "BoardCells", into = "BoardCells")]
pub struct Board {
    cells: [u8; BOARD_CELLS],
}

/// Wire form of a board; decoding goes through [`Board::from_cells`]
#[derive(Serialize, Deserialize)]
struct BoardCells {
    cells: [u8; BOARD_CELLS],
}

impl TryFrom<BoardCells> for Board {
    type Error = EngineError;

    fn try_from(raw: BoardCells) -> EngineResult<Self> {
        Board::from_cells(raw.cells)
    }
}

impl From<Board> for BoardCells {
    fn from(board: Board) -> Self {
        Self { cells: board.cells }
    }
}

impl Board {
    /// Derive the board for a cartela number
    pub fn derive(cartela_number: u32) -> Self {
        let mut rng = StdRng::from_seed(cartela_seed(cartela_number));
        let mut cells = [0u8; BOARD_CELLS];

        for column in Column::ALL {
            let start = *column.range().start();
            let picks = rand::seq::index::sample(&mut rng, 15, BOARD_SIDE);
            for (row, offset) in picks.into_iter().enumerate() {
                cells[row * BOARD_SIDE + column.index()] = start + offset as u8;
            }
        }

        Self { cells }
    }

    /// Build a board from explicit cells, checking column ranges and uniqueness
    pub fn from_cells(cells: [u8; BOARD_CELLS]) -> EngineResult<Self> {
        for column in Column::ALL {
            let range = column.range();
            let mut seen = Vec::with_capacity(BOARD_SIDE);
            for row in 0..BOARD_SIDE {
                let value = cells[row * BOARD_SIDE + column.index()];
                if !range.contains(&value) {
                    return Err(EngineError::InvalidBoard(format!(
                        "{} at row {} is outside column {} ({}-{})",
                        value,
                        row,
                        column,
                        range.start(),
                        range.end()
                    )));
                }
                if seen.contains(&value) {
                    return Err(EngineError::InvalidBoard(format!(
                        "{} appears twice in column {}",
                        value, column
                    )));
                }
                seen.push(value);
            }
        }

        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[u8; BOARD_CELLS] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied()
    }

    /// Value of the free center cell
    pub fn free_cell(&self) -> u8 {
        self.cells[FREE_CELL_INDEX]
    }

    pub fn contains(&self, number: u8) -> bool {
        self.cells.contains(&number)
    }

    /// The 5 values of one column, top to bottom
    pub fn column(&self, column: Column) -> [u8; BOARD_SIDE] {
        let mut values = [0u8; BOARD_SIDE];
        for (row, value) in values.iter_mut().enumerate() {
            *value = self.cells[row * BOARD_SIDE + column.index()];
        }
        values
    }

    /// First completed line given a predicate over cell values
    pub fn completed_line(&self, is_marked: impl Fn(u8) -> bool) -> Option<WinReason> {
        WIN_LINES
            .iter()
            .find(|(line, _)| line.iter().all(|&i| is_marked(self.cells[i])))
            .map(|(_, reason)| *reason)
    }
}

fn cartela_seed(cartela_number: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(CARTELA_SEED_CONTEXT);
    hasher.update(cartela_number.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_derive_is_deterministic() {
        for cartela in 1..=CARTELA_COUNT {
            assert_eq!(Board::derive(cartela), Board::derive(cartela));
        }
    }

    #[test]
    fn test_cartelas_produce_distinct_boards() {
        let boards: HashSet<Board> = (1..=CARTELA_COUNT).map(Board::derive).collect();
        assert_eq!(boards.len(), CARTELA_COUNT as usize);
    }

    #[test]
    fn test_columns_respect_ranges() {
        for cartela in 1..=CARTELA_COUNT {
            let board = Board::derive(cartela);
            for column in Column::ALL {
                let values = board.column(column);
                let unique: HashSet<u8> = values.iter().copied().collect();
                assert_eq!(unique.len(), BOARD_SIDE, "cartela {} column {}", cartela, column);
                assert!(values.iter().all(|v| column.range().contains(v)));
            }
        }
    }

    #[test]
    fn test_free_cell_is_center_of_n_column() {
        let board = Board::derive(17);
        assert_eq!(board.free_cell(), board.column(Column::N)[2]);
        assert!(Column::N.range().contains(&board.free_cell()));
    }

    #[test]
    fn test_from_cells_rejects_out_of_range() {
        let mut cells = *Board::derive(1).cells();
        cells[0] = 20; // B column
        assert!(matches!(
            Board::from_cells(cells),
            Err(EngineError::InvalidBoard(_))
        ));
    }

    #[test]
    fn test_from_cells_rejects_duplicate_in_column() {
        let mut cells = *Board::derive(1).cells();
        cells[5] = cells[0];
        assert!(Board::from_cells(cells).is_err());
    }

    #[test]
    fn test_from_cells_accepts_derived_board() {
        let board = Board::derive(42);
        assert_eq!(Board::from_cells(*board.cells()), Ok(board));
    }

    #[test]
    fn test_deserialize_rejects_invalid_board() {
        let zeros = serde_json::json!({ "cells": ([0u8; BOARD_CELLS]) });
        assert!(serde_json::from_value::<Board>(zeros).is_err());

        let mut cells = *Board::derive(9).cells();
        cells[10] = cells[5]; // duplicate in B column
        let duplicate = serde_json::json!({ "cells": cells });
        let err = serde_json::from_value::<Board>(duplicate).unwrap_err();
        assert!(err.to_string().contains("appears twice"));
    }

    #[test]
    fn test_deserialize_accepts_persisted_board() {
        let board = Board::derive(64);
        let json = serde_json::to_string(&board).unwrap();
        assert!(json.starts_with("{\"cells\":["));
        assert_eq!(serde_json::from_str::<Board>(&json).unwrap(), board);
    }

    #[test]
    fn test_completed_line_order() {
        let board = Board::derive(3);
        let row: HashSet<u8> = board.cells()[0..5].iter().copied().collect();
        assert_eq!(
            board.completed_line(|n| row.contains(&n)),
            Some(WinReason::Row)
        );

        let column: HashSet<u8> = board.column(Column::G).iter().copied().collect();
        assert_eq!(
            board.completed_line(|n| column.contains(&n)),
            Some(WinReason::Column)
        );

        let diagonal: HashSet<u8> = [4, 8, 12, 16, 20]
            .iter()
            .map(|&i| board.cells()[i])
            .collect();
        assert_eq!(
            board.completed_line(|n| diagonal.contains(&n)),
            Some(WinReason::Diagonal)
        );

        assert_eq!(board.completed_line(|_| false), None);
    }
}
