//! Offline three-word resolver.
//!
//! Names every cell of a [`CellGrid`] with three pronounceable words built
//! from consonant-vowel syllables (e.g. `bakoti.renula.sovemi`). The mapping
//! is a bijection, so addresses resolve back to their cell without any
//! lookup table or network access.
//!
//! # Encoding
//!
//! ```text
//! cell (row, col) ──► index = row × max_cols + col
//!                 ──► scrambled = (index × A + B) mod 512000³
//!                 ──► three base-512000 digits ──► three 3-syllable words
//! ```
//!
//! The affine scramble spreads neighbouring cells across unrelated words,
//! so adjacent cells do not share a prefix.
//!
//! These addresses are synthetic; they are not what3words addresses.

use tracing::trace;

use super::types::{BoxFuture, CellAddressResolver, CellId, ResolutionError};
use crate::coord::Coordinate;
use crate::grid::{CellGrid, GridCell};

const CONSONANTS: [u8; 16] = *b"bdfghjklmnprstvz";
const VOWELS: [u8; 5] = *b"aeiou";

/// Distinct syllables (16 consonants × 5 vowels).
const SYLLABLES: u64 = 80;

/// Syllables per word.
const SYLLABLES_PER_WORD: usize = 3;

/// Distinct words (80³).
const WORD_SPACE: u64 = SYLLABLES * SYLLABLES * SYLLABLES;

/// Distinct three-word addresses (512000³).
const ADDRESS_SPACE: u64 = WORD_SPACE * WORD_SPACE * WORD_SPACE;

/// Scramble multiplier; coprime with [`ADDRESS_SPACE`] (= 2³⁶ · 5⁹).
const MULTIPLIER: u64 = 48_271_000_000_007;

/// Scramble offset.
const OFFSET: u64 = 7_919_000_001;

/// Modular inverse of `a` modulo `m`, if it exists.
fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

fn encode_word(mut value: u64, out: &mut String) {
    let mut syllables = [0u64; SYLLABLES_PER_WORD];
    for slot in syllables.iter_mut().rev() {
        *slot = value % SYLLABLES;
        value /= SYLLABLES;
    }
    for s in syllables {
        out.push(CONSONANTS[(s / 5) as usize] as char);
        out.push(VOWELS[(s % 5) as usize] as char);
    }
}

fn decode_word(word: &str) -> Option<u64> {
    let bytes = word.as_bytes();
    if bytes.len() != SYLLABLES_PER_WORD * 2 {
        return None;
    }
    bytes.chunks(2).try_fold(0u64, |acc, pair| {
        let c = CONSONANTS.iter().position(|&b| b == pair[0])? as u64;
        let v = VOWELS.iter().position(|&b| b == pair[1])? as u64;
        Some(acc * SYLLABLES + c * 5 + v)
    })
}

/// Offline resolver over a local [`CellGrid`].
#[derive(Debug, Clone)]
pub struct LocalResolver {
    grid: CellGrid,
    inverse: u64,
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self::new(CellGrid::default())
    }
}

impl LocalResolver {
    /// Create a resolver naming the cells of `grid`.
    pub fn new(grid: CellGrid) -> Self {
        let inverse = mod_inverse(MULTIPLIER, ADDRESS_SPACE).unwrap_or(1);
        Self { grid, inverse }
    }

    /// The grid whose cells are named.
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Three-word address of a cell.
    pub fn encode(&self, cell: &GridCell) -> CellId {
        let index = cell.row as u128 * self.grid.max_cols() as u128 + cell.col as u128;
        let scrambled =
            ((index * MULTIPLIER as u128 + OFFSET as u128) % ADDRESS_SPACE as u128) as u64;

        let mut words = String::with_capacity(3 * SYLLABLES_PER_WORD * 2 + 2);
        encode_word(scrambled / (WORD_SPACE * WORD_SPACE), &mut words);
        words.push('.');
        encode_word((scrambled / WORD_SPACE) % WORD_SPACE, &mut words);
        words.push('.');
        encode_word(scrambled % WORD_SPACE, &mut words);
        CellId::new(words)
    }

    /// Cell named by a three-word address.
    pub fn decode(&self, cell_id: &CellId) -> Result<GridCell, ResolutionError> {
        let unknown = || ResolutionError::UnknownCell(cell_id.to_string());

        let mut parts = cell_id.as_str().split('.');
        let mut scrambled = 0u64;
        for _ in 0..3 {
            let word = parts.next().ok_or_else(unknown)?;
            scrambled = scrambled * WORD_SPACE + decode_word(word).ok_or_else(unknown)?;
        }
        if parts.next().is_some() {
            return Err(unknown());
        }

        let shifted = (scrambled as u128 + ADDRESS_SPACE as u128 - OFFSET as u128)
            % ADDRESS_SPACE as u128;
        let index = (shifted * self.inverse as u128 % ADDRESS_SPACE as u128) as u64;

        let max_cols = self.grid.max_cols() as u64;
        let row = index / max_cols;
        let col = index % max_cols;
        if row >= self.grid.rows() as u64 {
            return Err(unknown());
        }
        let cell = GridCell::new(row as u32, col as u32);
        if !self.grid.contains_cell(&cell) {
            return Err(unknown());
        }
        Ok(cell)
    }

    /// Address of the cell containing `coordinate`.
    pub fn cell_for(&self, coordinate: &Coordinate) -> Result<CellId, ResolutionError> {
        let valid = Coordinate::new(coordinate.latitude, coordinate.longitude)
            .map_err(|e| ResolutionError::InvalidCoordinate(e.to_string()))?;
        let cell = self.grid.cell_of(&valid);
        let id = self.encode(&cell);
        trace!(%coordinate, %cell, cell_id = %id, "Resolved locally");
        Ok(id)
    }
}

impl CellAddressResolver for LocalResolver {
    fn resolve_to_cell(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<CellId, ResolutionError>> {
        Box::pin(async move { self.cell_for(&coordinate) })
    }

    fn resolve_to_coordinate<'a>(
        &'a self,
        cell_id: &'a CellId,
    ) -> BoxFuture<'a, Result<Coordinate, ResolutionError>> {
        Box::pin(async move {
            let cell = self.decode(cell_id)?;
            Ok(self.grid.center(&cell))
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}
