//! Toroidal Game of Life grid.
//!
//! Cell values double as colors: the world paints agents into the grid and
//! the step rule leaves the live neighbor count in every surviving cell, so a
//! cell born from exactly three neighbors is "blue food".

use crate::textio::{FormatError, LineReader};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Raw cell value
pub type Cell = i32;

pub const EMPTY: Cell = 0;
pub const GREEN_CELL: Cell = 2;
pub const BLUE_CELL: Cell = 3;

/// Largest grid a cells file may declare
pub const MAX_CELLS: usize = 1 << 24;

/// Which neighbors the step rule counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// All 8 surrounding cells
    #[default]
    Moore,
    /// North, east, south and west only
    VonNeumann,
}

impl Neighborhood {
    fn offsets(self) -> &'static [(i64, i64)] {
        const MOORE: [(i64, i64); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        const VON_NEUMANN: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
        match self {
            Self::Moore => &MOORE,
            Self::VonNeumann => &VON_NEUMANN,
        }
    }
}

/// Cellular automaton on a torus with a checkpoint copy of its cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automaton {
    width: usize,
    height: usize,
    neighborhood: Neighborhood,
    /// cells[y * width + x]
    cells: Vec<Cell>,
    restore_cells: Vec<Cell>,
}

impl Automaton {
    /// Create an all-dead grid
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "automaton dimensions must be positive");
        Self {
            width,
            height,
            neighborhood: Neighborhood::default(),
            cells: vec![EMPTY; width * height],
            restore_cells: vec![EMPTY; width * height],
        }
    }

    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    pub fn set_neighborhood(&mut self, neighborhood: Neighborhood) {
        self.neighborhood = neighborhood;
    }

    /// Map any integer coordinate onto the torus
    #[inline]
    pub fn wrap(&self, x: i64, y: i64) -> (usize, usize) {
        (
            x.rem_euclid(self.width as i64) as usize,
            y.rem_euclid(self.height as i64) as usize,
        )
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Get the cell at `(x, y)`; coordinates must be in range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Cell) {
        let i = self.index(x, y);
        self.cells[i] = value;
    }

    /// Get a cell with toroidal wrapping
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> Cell {
        let (x, y) = self.wrap(x, y);
        self.get(x, y)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn restore_cells(&self) -> &[Cell] {
        &self.restore_cells
    }

    fn live_neighbors(&self, x: usize, y: usize) -> Cell {
        let mut count = 0;
        for &(dx, dy) in self.neighborhood.offsets() {
            if self.get_wrapped(x as i64 + dx, y as i64 + dy) > EMPTY {
                count += 1;
            }
        }
        count
    }

    /// Advance one generation.
    ///
    /// A live cell survives with 2 or 3 live neighbors, a dead cell with
    /// exactly 3 is born, and every cell alive afterwards holds its count.
    pub fn step(&mut self) {
        let mut next = vec![EMPTY; self.cells.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let count = self.live_neighbors(x, y);
                let i = self.index(x, y);
                next[i] = if self.cells[i] > EMPTY {
                    if (2..=3).contains(&count) {
                        count
                    } else {
                        EMPTY
                    }
                } else if count == 3 {
                    count
                } else {
                    EMPTY
                };
            }
        }
        self.cells = next;
    }

    pub fn step_n(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Remember the current cells for a later [`restore`](Self::restore)
    pub fn checkpoint(&mut self) {
        self.restore_cells.copy_from_slice(&self.cells);
    }

    /// Return to the last checkpoint
    pub fn restore(&mut self) {
        self.cells.copy_from_slice(&self.restore_cells);
    }

    pub fn clear(&mut self) {
        self.cells.fill(EMPTY);
    }

    /// Count cells holding exactly `value`
    pub fn count(&self, value: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == value).count()
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c > EMPTY).count()
    }

    /// Read the cells text format from an open reader.
    pub fn read<R: BufRead>(reader: &mut LineReader<R>) -> Result<Self, FormatError> {
        let dims: Vec<i64> = reader.read_fields(&["width", "height"])?;
        if dims[0] <= 0 {
            return Err(FormatError::invalid("width", dims[0]));
        }
        if dims[1] <= 0 {
            return Err(FormatError::invalid("height", dims[1]));
        }
        let (width, height) = (dims[0] as usize, dims[1] as usize);
        if !width.checked_mul(height).is_some_and(|n| n <= MAX_CELLS) {
            return Err(FormatError::invalid("height", dims[1]));
        }
        let mut automaton = Self::new(width, height);
        let cells = automaton.read_block(reader)?;
        let restore_cells = automaton.read_block(reader)?;
        automaton.cells = cells;
        automaton.restore_cells = restore_cells;
        Ok(automaton)
    }

    fn read_block<R: BufRead>(&self, reader: &mut LineReader<R>) -> Result<Vec<Cell>, FormatError> {
        let count: i64 = reader.read_value("cell count")?;
        if count < 0 || count as usize > self.cells.len() {
            return Err(FormatError::invalid("cell count", count));
        }
        let mut cells = vec![EMPTY; self.cells.len()];
        for _ in 0..count {
            let triple: Vec<i64> = reader.read_fields(&["x", "y", "cell"])?;
            let (x, y, value) = (triple[0], triple[1], triple[2]);
            if x < 0 || x >= self.width as i64 {
                return Err(FormatError::invalid("x", x));
            }
            if y < 0 || y >= self.height as i64 {
                return Err(FormatError::invalid("y", y));
            }
            if value < 0 || value > Cell::MAX as i64 {
                return Err(FormatError::invalid("cell", value));
            }
            cells[self.index(x as usize, y as usize)] = value as Cell;
        }
        Ok(cells)
    }

    /// Write the cells text format.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{} {}", self.width, self.height)?;
        self.write_block(writer, &self.cells)?;
        self.write_block(writer, &self.restore_cells)
    }

    fn write_block<W: Write>(&self, writer: &mut W, cells: &[Cell]) -> io::Result<()> {
        let live = cells.iter().filter(|&&c| c > EMPTY).count();
        writeln!(writer, "{}", live)?;
        for y in 0..self.height {
            for x in 0..self.width {
                let value = cells[self.index(x, y)];
                if value > EMPTY {
                    writeln!(writer, "{} {} {}", x, y, value)?;
                }
            }
        }
        Ok(())
    }

    /// Load a cells file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let file = File::open(path)?;
        Self::read(&mut LineReader::new(BufReader::new(file)))
    }

    /// Save a cells file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_pattern(a: &Automaton) -> Vec<bool> {
        a.cells().iter().map(|&c| c > EMPTY).collect()
    }

    #[test]
    fn test_empty_stays_empty() {
        let mut a = Automaton::new(10, 7);
        a.step_n(5);
        assert_eq!(a.live_count(), 0);

        let mut b = Automaton::new(5, 5).with_neighborhood(Neighborhood::VonNeumann);
        b.step();
        assert_eq!(b.live_count(), 0);
    }

    #[test]
    fn test_blinker_period_two() {
        let mut a = Automaton::new(6, 6);
        for x in 1..4 {
            a.set(x, 2, 1);
        }
        let start = live_pattern(&a);

        a.step();
        assert_ne!(live_pattern(&a), start);
        assert_eq!(a.get(2, 1), 3);
        assert_eq!(a.get(2, 2), 2);
        assert_eq!(a.get(2, 3), 3);
        assert_eq!(a.live_count(), 3);

        a.step();
        assert_eq!(live_pattern(&a), start);
    }

    #[test]
    fn test_von_neumann_oscillator() {
        // Smallest period-2 pattern under the 4-neighbor rule on a 4x4 torus.
        let mut a = Automaton::new(4, 4).with_neighborhood(Neighborhood::VonNeumann);
        for (x, y) in [(0, 0), (0, 2), (1, 1), (1, 3)] {
            a.set(x, y, BLUE_CELL);
        }
        let start = a.cells().to_vec();

        a.step();
        assert_eq!(a.live_count(), 4);
        for (x, y) in [(0, 1), (0, 3), (1, 0), (1, 2)] {
            assert_eq!(a.get(x, y), 3);
        }
        for (x, y) in [(0, 0), (0, 2), (1, 1), (1, 3)] {
            assert_eq!(a.get(x, y), EMPTY);
        }

        a.step();
        assert_eq!(a.cells(), start.as_slice());
    }

    #[test]
    fn test_von_neumann_line_decays() {
        // The Moore blinker has no 4-neighbor counterpart: the ends starve.
        let mut a = Automaton::new(6, 6).with_neighborhood(Neighborhood::VonNeumann);
        for x in 1..4 {
            a.set(x, 2, 1);
        }
        a.step();
        assert_eq!(a.live_count(), 1);
        assert_eq!(a.get(2, 2), 2);
        a.step();
        assert_eq!(a.live_count(), 0);
    }

    #[test]
    fn test_block_is_still_life() {
        for neighborhood in [Neighborhood::Moore, Neighborhood::VonNeumann] {
            let mut a = Automaton::new(6, 6).with_neighborhood(neighborhood);
            a.set(2, 2, 1);
            a.set(3, 2, 1);
            a.set(2, 3, 1);
            a.set(3, 3, 1);
            let start = live_pattern(&a);
            a.step_n(3);
            assert_eq!(live_pattern(&a), start, "{:?}", neighborhood);
        }
    }

    #[test]
    fn test_von_neumann_counts_orthogonal_only() {
        let mut a = Automaton::new(5, 5).with_neighborhood(Neighborhood::VonNeumann);
        // Diagonal neighbors only: the center would be born under Moore.
        a.set(1, 1, 1);
        a.set(3, 1, 1);
        a.set(1, 3, 1);
        a.step();
        assert_eq!(a.get(2, 2), EMPTY);
    }

    #[test]
    fn test_wraps_around_edges() {
        let mut a = Automaton::new(6, 6);
        // Vertical blinker straddling the x = 0 column.
        a.set(0, 5, 1);
        a.set(0, 0, 1);
        a.set(0, 1, 1);
        a.step();
        assert!(a.get(5, 0) > EMPTY);
        assert!(a.get(1, 0) > EMPTY);
        assert_eq!(a.get_wrapped(-1, 6), a.get(5, 0));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut a = Automaton::new(8, 8);
        a.set(1, 1, 3);
        a.set(4, 5, 2);
        a.checkpoint();
        let saved = a.clone();

        a.step();
        a.set(7, 7, 9);
        a.restore();
        assert_eq!(a.cells(), saved.cells());

        a.clear();
        assert_eq!(a.live_count(), 0);
        assert_eq!(a.restore_cells(), saved.cells());
    }

    #[test]
    fn test_text_roundtrip() {
        let mut a = Automaton::new(7, 4);
        a.set(0, 0, 3);
        a.set(6, 3, 2);
        a.checkpoint();
        a.set(2, 1, 9);

        let mut buf = Vec::new();
        a.write(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("7 4\n3\n"));

        let loaded = Automaton::read(&mut LineReader::new(buf.as_slice())).unwrap();
        assert_eq!(loaded, a);
    }

    #[test]
    fn test_rejects_bad_files() {
        let bad_width = "0 4\n0\n0\n";
        assert!(matches!(
            Automaton::read(&mut LineReader::new(bad_width.as_bytes())),
            Err(FormatError::Invalid { field: "width", .. })
        ));

        let bad_x = "4 4\n1\n4 0 3\n0\n";
        assert!(matches!(
            Automaton::read(&mut LineReader::new(bad_x.as_bytes())),
            Err(FormatError::Invalid { field: "x", .. })
        ));

        let huge = "4000000000 4000000000\n0\n0\n";
        assert!(matches!(
            Automaton::read(&mut LineReader::new(huge.as_bytes())),
            Err(FormatError::Invalid { field: "height", .. })
        ));
        let too_many_cells = "4096 8192\n0\n0\n";
        assert!(Automaton::read(&mut LineReader::new(too_many_cells.as_bytes())).is_err());

        let truncated = "4 4\n2\n1 1 3\n";
        assert!(matches!(
            Automaton::read(&mut LineReader::new(truncated.as_bytes())),
            Err(FormatError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.txt");
        let mut a = Automaton::new(5, 5);
        a.set(2, 2, 3);
        a.checkpoint();
        a.save(&path).unwrap();
        assert_eq!(Automaton::load(&path).unwrap(), a);
    }
}
