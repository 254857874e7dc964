//! Grid representation and generation (spec §3, §4.3, component C3)

use serde::{Deserialize, Serialize};

use crate::config::GridSpec;
use crate::error::{EngineError, EngineResult};
use crate::rng::DeterministicStream;
use crate::symbols::SymbolTable;

/// A single grid cell: a symbol id, or empty (spec §3).
pub type Cell = Option<&'static str>;

/// A 6x5 grid of symbols, column-major (spec §3: `col in [0,5]`, `row in
/// [0,4]`, `row=4` the bottom under gravity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    /// `columns[col][row]`.
    columns: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn empty(spec: GridSpec) -> Self {
        Self {
            cols: spec.cols,
            rows: spec.rows,
            columns: vec![vec![None; spec.rows]; spec.cols],
        }
    }

    pub fn get(&self, col: usize, row: usize) -> Cell {
        self.columns.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    pub fn set(&mut self, col: usize, row: usize, value: Cell) {
        self.columns[col][row] = value;
    }

    pub fn column(&self, col: usize) -> &[Cell] {
        &self.columns[col]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [Cell] {
        &mut self.columns[col]
    }

    /// Every `(col, row)` position in fixed column-major order (spec §4.3,
    /// §4.4: "deterministic test replay" / "column-major traversal").
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.cols).flat_map(move |c| (0..self.rows).map(move |r| (c, r)))
    }

    pub fn count_scatters(&self, scatter_id: &str) -> usize {
        self.columns
            .iter()
            .map(|col| col.iter().filter(|c| **c == Some(scatter_id)).count())
            .sum()
    }

    pub fn scatter_positions(&self, scatter_id: &str) -> Vec<(usize, usize)> {
        self.positions()
            .filter(|&(c, r)| self.get(c, r) == Some(scatter_id))
            .collect()
    }

    /// Gravity invariant: after any settled state, no non-empty cell sits
    /// directly above an empty cell in the same column (spec §3, §8).
    pub fn is_settled(&self) -> bool {
        self.columns.iter().all(|col| {
            let mut seen_filled = false;
            // row 0 is top, row rows-1 is bottom; scanning top-to-bottom,
            // once a filled cell has been seen every cell below it must
            // also be filled (empties collect at the top after gravity).
            for cell in col {
                if cell.is_some() {
                    seen_filled = true;
                } else if seen_filled {
                    return false;
                }
            }
            true
        })
    }

    /// Structural validation (spec §4.3, §4.11): shape, membership,
    /// non-null cells.
    pub fn validate_shape(&self, expected: GridSpec) -> EngineResult<()> {
        if self.cols != expected.cols || self.rows != expected.rows {
            return Err(EngineError::InvalidGridShape {
                expected_cols: expected.cols,
                expected_rows: expected.rows,
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(())
    }

    pub fn validate_membership(&self, table: &SymbolTable) -> EngineResult<()> {
        for (c, r) in self.positions() {
            if let Some(id) = self.get(c, r) {
                if table.get(id).is_none() {
                    return Err(EngineError::InvalidSymbol(id.to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn all_filled(&self) -> bool {
        self.positions().all(|(c, r)| self.get(c, r).is_some())
    }
}

/// Generates the initial (or any) fully-populated grid via independent
/// per-cell sampling (spec §4.3).
pub struct GridGenerator<'a> {
    spec: GridSpec,
    table: &'a SymbolTable,
}

impl<'a> GridGenerator<'a> {
    pub fn new(spec: GridSpec, table: &'a SymbolTable) -> Self {
        Self { spec, table }
    }

    /// Generate a fully-populated grid. `free_spins_active` selects the
    /// scatter-chance and symbol-weight table to use (spec §4.2, §4.3).
    pub fn generate(
        &self,
        stream: &DeterministicStream,
        scatter_chance_base: f64,
        scatter_chance_fs: f64,
        free_spins_active: bool,
    ) -> EngineResult<Grid> {
        let mut grid = Grid::empty(self.spec);
        let p_scatter = if free_spins_active {
            scatter_chance_fs
        } else {
            scatter_chance_base
        };
        let (ids, weights) = self.table.regular_weights(free_spins_active);
        let scatter_id = self.table.scatter_id();

        for (col, row) in grid.positions() {
            let cell = if stream.next() < p_scatter {
                Some(scatter_id)
            } else {
                let idx = stream.weighted_pick(&weights)?;
                Some(ids[idx])
            };
            grid.set(col, row, cell);
        }

        Ok(grid)
    }
}
