use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{self, Debug, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::{VariableId, WordId, MAX_NEIGHBOR_COUNT, MAX_WORD_LENGTH};

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
type GridCoord = (usize, usize);

/// Direction that an entry is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A run of open cells that must receive a single word. Two variables are the same variable iff
/// they start in the same cell, face the same way and have the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Variable {
    pub fn new(row: usize, col: usize, direction: Direction, length: usize) -> Variable {
        Variable { row, col, direction, length }
    }

    /// Generate the coords for each cell of this entry, in word order.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |cell_idx| match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        })
    }

    /// Coords of the entry's last cell, or `None` if the entry is empty or runs past `usize::MAX`.
    fn last_cell(&self) -> Option<GridCoord> {
        let offset = self.length.checked_sub(1)?;
        match self.direction {
            Direction::Across => Some((self.row, self.col.checked_add(offset)?)),
            Direction::Down => Some((self.row.checked_add(offset)?, self.col)),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {} : {}", self.row, self.col, self.direction, self.length)
    }
}

/// The shared cell between two crossing entries: character `cell` of the first entry's word must
/// equal character `other_cell` of the second entry's word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Overlap {
    pub cell: usize,
    pub other_cell: usize,
}

impl Overlap {
    /// The same constraint seen from the other entry.
    pub fn reversed(self) -> Overlap {
        Overlap { cell: self.other_cell, other_cell: self.cell }
    }

    /// Do these two words agree on the shared cell? A word too short to reach it agrees with
    /// nothing.
    pub fn agrees(self, word: &Word, other_word: &Word) -> bool {
        match (word.chars.get(self.cell), other_word.chars.get(self.other_cell)) {
            (Some(letter), Some(other_letter)) => letter == other_letter,
            _ => false,
        }
    }
}

/// A vocabulary entry. The characters are kept alongside the string so that overlap checks can
/// index them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub chars: SmallVec<[char; MAX_WORD_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let chars = string.chars().collect();
        Word { string, chars }
    }

    /// Length in characters, which is what entry lengths are measured in.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// Reasons a grid can't be turned into a crossword problem.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CrosswordError {
    #[display("failed to read input: {_0}")]
    #[from]
    Io(std::io::Error),
    #[display("structure contains no cells")]
    EmptyStructure,
    #[display("variable {variable} has zero length")]
    ZeroLengthVariable { variable: Variable },
    #[display("variable {variable} extends outside the {width}x{height} grid")]
    VariableOutOfBounds {
        variable: Variable,
        width: usize,
        height: usize,
    },
    #[display("variables {first} and {second} share more than one cell")]
    MultipleSharedCells { first: Variable, second: Variable },
    #[display("variable {variable} is listed more than once")]
    DuplicateVariable { variable: Variable },
}

/// The fixed geometry and vocabulary of a puzzle. Nothing in here changes while solving.
pub struct Crossword {
    width: usize,
    height: usize,

    /// Row-major flags recording which cells are open (fillable).
    open: Vec<bool>,

    variables: Vec<Variable>,

    /// Dense matrix indexed by `[x][y]`.
    overlaps: Vec<Vec<Option<Overlap>>>,

    /// For each variable, the ids of the variables it shares a cell with, in id order.
    neighbors: Vec<SmallVec<[VariableId; MAX_NEIGHBOR_COUNT]>>,

    /// Deduplicated, upper-cased and sorted, so word ids are deterministic.
    words: Vec<Word>,
}

impl Debug for Crossword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossword")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("variables", &self.variables)
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl Crossword {
    /// Build a crossword from a structure text and a newline-separated word list.
    ///
    /// In the structure, `_` marks an open cell and any other character a blocked one. Rows
    /// shorter than the widest row are padded with blocked cells. Every run of two or more open
    /// cells, across or down, becomes a variable.
    pub fn parse(structure: &str, words: &str) -> Result<Crossword, CrosswordError> {
        let mut lines: Vec<&str> = structure.lines().map(|line| line.trim_end_matches('\r')).collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        while lines.first().is_some_and(|line| line.is_empty()) {
            lines.remove(0);
        }

        let height = lines.len();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        if width == 0 {
            return Err(CrosswordError::EmptyStructure);
        }

        let mut open = vec![false; width * height];
        for (row, line) in lines.iter().enumerate() {
            for (col, cell) in line.chars().enumerate() {
                open[row * width + col] = cell == '_';
            }
        }

        let is_open = |row: usize, col: usize| open[row * width + col];
        let mut variables = vec![];
        for row in 0..height {
            for col in 0..width {
                if !is_open(row, col) {
                    continue;
                }

                // Vertical words start at the top edge or under a blocked cell.
                if row == 0 || !is_open(row - 1, col) {
                    let length = (row..height).take_while(|&r| is_open(r, col)).count();
                    if length > 1 {
                        variables.push(Variable::new(row, col, Direction::Down, length));
                    }
                }

                // Horizontal words start at the left edge or right of a blocked cell.
                if col == 0 || !is_open(row, col - 1) {
                    let length = (col..width).take_while(|&c| is_open(row, c)).count();
                    if length > 1 {
                        variables.push(Variable::new(row, col, Direction::Across, length));
                    }
                }
            }
        }

        Crossword::build(width, height, open, variables, words.lines())
    }

    /// Read the structure and word list from files and parse them.
    pub fn from_files(
        structure_path: impl AsRef<Path>,
        words_path: impl AsRef<Path>,
    ) -> Result<Crossword, CrosswordError> {
        let structure = fs::read_to_string(structure_path)?;
        let words = fs::read_to_string(words_path)?;
        Crossword::parse(&structure, &words)
    }

    /// Build a crossword from explicit entries. Cells covered by any entry are open, everything
    /// else is blocked. Variables keep the given order, which is the order ids are assigned in.
    pub fn from_variables<I, S>(
        width: usize,
        height: usize,
        variables: &[Variable],
        words: I,
    ) -> Result<Crossword, CrosswordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if width == 0 || height == 0 {
            return Err(CrosswordError::EmptyStructure);
        }

        let mut open = vec![false; width * height];
        let mut seen = HashSet::new();
        for &variable in variables {
            if variable.length == 0 {
                return Err(CrosswordError::ZeroLengthVariable { variable });
            }
            match variable.last_cell() {
                Some((last_row, last_col)) if last_row < height && last_col < width => {}
                _ => return Err(CrosswordError::VariableOutOfBounds { variable, width, height }),
            }
            if !seen.insert(variable) {
                return Err(CrosswordError::DuplicateVariable { variable });
            }
            for (row, col) in variable.cells() {
                open[row * width + col] = true;
            }
        }

        Crossword::build(width, height, open, variables.to_vec(), words)
    }

    fn build<I, S>(
        width: usize,
        height: usize,
        open: Vec<bool>,
        variables: Vec<Variable>,
        words: I,
    ) -> Result<Crossword, CrosswordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Map each cell to the (variable, index within variable) pairs covering it, then read the
        // overlaps off the cells that more than one variable covers.
        let mut entries_by_cell: HashMap<GridCoord, SmallVec<[(VariableId, usize); 2]>> =
            HashMap::new();
        for (variable_id, variable) in variables.iter().enumerate() {
            for (cell_idx, loc) in variable.cells().enumerate() {
                entries_by_cell.entry(loc).or_default().push((variable_id, cell_idx));
            }
        }

        let mut overlaps: Vec<Vec<Option<Overlap>>> = vec![vec![None; variables.len()]; variables.len()];
        let mut cells: Vec<_> = entries_by_cell.into_iter().collect();
        cells.sort_unstable_by_key(|&(loc, _)| loc);
        for (_, entries) in cells {
            for &(x, x_cell) in &entries {
                for &(y, y_cell) in &entries {
                    if x == y {
                        continue;
                    }
                    if overlaps[x][y].is_some() {
                        return Err(CrosswordError::MultipleSharedCells {
                            first: variables[x.min(y)],
                            second: variables[x.max(y)],
                        });
                    }
                    overlaps[x][y] = Some(Overlap { cell: x_cell, other_cell: y_cell });
                }
            }
        }

        let neighbors = (0..variables.len())
            .map(|x| (0..variables.len()).filter(|&y| overlaps[x][y].is_some()).collect())
            .collect();

        let words: BTreeSet<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_uppercase())
            .filter(|word| !word.is_empty())
            .collect();

        Ok(Crossword {
            width,
            height,
            open,
            variables,
            overlaps,
            neighbors,
            words: words.into_iter().map(Word::new).collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Is the given cell blocked? Cells outside the grid count as blocked.
    pub fn is_blocked(&self, row: usize, col: usize) -> bool {
        row >= self.height || col >= self.width || !self.open[row * self.width + col]
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn variable_id(&self, variable: &Variable) -> Option<VariableId> {
        self.variables.iter().position(|v| v == variable)
    }

    /// Ids of the variables sharing a cell with `id`.
    pub fn neighbors(&self, id: VariableId) -> &[VariableId] {
        &self.neighbors[id]
    }

    pub fn overlap(&self, x: VariableId, y: VariableId) -> Option<Overlap> {
        self.overlaps[x][y]
    }

    /// Every ordered pair of variables that share a cell.
    pub fn arcs(&self) -> impl Iterator<Item = (VariableId, VariableId)> + '_ {
        (0..self.variables.len()).flat_map(move |x| self.neighbors[x].iter().map(move |&y| (x, y)))
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, id: WordId) -> &Word {
        &self.words[id]
    }

    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.words.binary_search_by(|w| w.string.as_str().cmp(word)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Across, Down};

    const STRUCTURE_0: &str = "\
#___#
#_##_
#_##_
#_##_
#____
";

    const WORDS_0: &str = "\
one
two
three
four
five
six
seven
eight
nine
ten
";

    #[test]
    fn test_parse_structure_0() {
        let crossword = Crossword::parse(STRUCTURE_0, WORDS_0).unwrap();

        assert_eq!(crossword.width(), 5);
        assert_eq!(crossword.height(), 5);
        assert_eq!(
            crossword.variables(),
            &[
                Variable::new(0, 1, Down, 5),
                Variable::new(0, 1, Across, 3),
                Variable::new(1, 4, Down, 4),
                Variable::new(4, 1, Across, 4),
            ]
        );
        assert!(crossword.is_blocked(0, 0));
        assert!(!crossword.is_blocked(0, 1));
        assert!(crossword.is_blocked(5, 0), "outside the grid is blocked");
        assert_eq!(crossword.words().len(), 10);
        assert_eq!(crossword.word(0).string, "EIGHT");
    }

    #[test]
    fn test_overlaps_and_neighbors() {
        let crossword = Crossword::parse(STRUCTURE_0, WORDS_0).unwrap();

        assert_eq!(crossword.overlap(0, 1), Some(Overlap { cell: 0, other_cell: 0 }));
        assert_eq!(crossword.overlap(0, 3), Some(Overlap { cell: 4, other_cell: 0 }));
        assert_eq!(crossword.overlap(3, 0), Some(Overlap { cell: 0, other_cell: 4 }));
        assert_eq!(crossword.overlap(2, 3), Some(Overlap { cell: 3, other_cell: 3 }));
        assert_eq!(crossword.overlap(1, 2), None);
        assert_eq!(crossword.overlap(0, 0), None);

        assert_eq!(crossword.neighbors(0), &[1, 3]);
        assert_eq!(crossword.neighbors(1), &[0]);
        assert_eq!(crossword.neighbors(2), &[3]);
        assert_eq!(crossword.neighbors(3), &[0, 2]);
        assert_eq!(crossword.arcs().count(), 6);
    }

    #[test]
    fn test_overlaps_are_symmetric() {
        let crossword = Crossword::parse("_____\n_#_#_\n_____\n_#_#_\n_____\n", "").unwrap();
        let count = crossword.variables().len();

        for x in 0..count {
            for y in 0..count {
                assert_eq!(crossword.overlap(x, y), crossword.overlap(y, x).map(Overlap::reversed));
            }
        }
    }

    #[test]
    fn test_vocabulary_is_normalized() {
        let crossword = Crossword::parse("__\n", "ab\nAB\n  cd \n\nab\n").unwrap();

        let words: Vec<_> = crossword.words().iter().map(|w| w.string.as_str()).collect();
        assert_eq!(words, ["AB", "CD"]);
        assert_eq!(crossword.word_id("CD"), Some(1));
        assert_eq!(crossword.word_id("cd"), None);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let crossword = Crossword::parse("___\n_\n_\n", "").unwrap();

        assert_eq!(crossword.width(), 3);
        assert!(crossword.is_blocked(1, 2));
        assert_eq!(
            crossword.variables(),
            &[Variable::new(0, 0, Down, 3), Variable::new(0, 0, Across, 3)]
        );
    }

    #[test]
    fn test_empty_structure_is_rejected() {
        assert!(matches!(Crossword::parse("\n\n", "a"), Err(CrosswordError::EmptyStructure)));
    }

    #[test]
    fn test_from_variables() {
        let x = Variable::new(0, 0, Across, 3);
        let y = Variable::new(0, 1, Down, 3);
        let crossword = Crossword::from_variables(3, 3, &[x, y], ["cat", "car", "art"]).unwrap();

        assert_eq!(crossword.variable_id(&y), Some(1));
        assert_eq!(crossword.overlap(0, 1), Some(Overlap { cell: 1, other_cell: 0 }));
        assert!(crossword.is_blocked(1, 0));
        assert!(!crossword.is_blocked(2, 1));
    }

    #[test]
    fn test_structural_errors() {
        let zero = Variable::new(0, 0, Across, 0);
        assert!(matches!(
            Crossword::from_variables(3, 3, &[zero], ["a"]),
            Err(CrosswordError::ZeroLengthVariable { .. })
        ));

        let too_long = Variable::new(1, 1, Down, 3);
        assert!(matches!(
            Crossword::from_variables(3, 3, &[too_long], ["a"]),
            Err(CrosswordError::VariableOutOfBounds { .. })
        ));

        let overflowing = Variable::new(usize::MAX, 0, Down, 2);
        assert!(matches!(
            Crossword::from_variables(3, 3, &[overflowing], ["ab"]),
            Err(CrosswordError::VariableOutOfBounds { .. })
        ));
        let overflowing = Variable::new(0, usize::MAX - 1, Across, 3);
        assert!(matches!(
            Crossword::from_variables(3, 3, &[overflowing], ["abc"]),
            Err(CrosswordError::VariableOutOfBounds { .. })
        ));

        let a = Variable::new(0, 0, Across, 3);
        let b = Variable::new(0, 1, Across, 2);
        let err = Crossword::from_variables(3, 3, &[a, b], ["a"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "variables (0, 0) across : 3 and (0, 1) across : 2 share more than one cell"
        );
    }

    #[test]
    fn test_duplicate_variables_are_rejected() {
        let single = Variable::new(1, 1, Across, 1);
        let err = Crossword::from_variables(3, 3, &[single, single], ["a"]).unwrap_err();
        assert!(matches!(err, CrosswordError::DuplicateVariable { variable } if variable == single));

        let a = Variable::new(0, 0, Across, 3);
        let err = Crossword::from_variables(3, 3, &[a, Variable::new(2, 0, Across, 3), a], ["abc"])
            .unwrap_err();
        assert_eq!(err.to_string(), "variable (0, 0) across : 3 is listed more than once");
    }

    #[test]
    fn test_agrees_with_short_words() {
        let crossword = Crossword::parse("__
", "ab
abc
b
").unwrap();
        let word = |s: &str| crossword.word(crossword.word_id(s).unwrap());
        let overlap = Overlap { cell: 2, other_cell: 0 };

        assert!(!overlap.agrees(word("AB"), word("B")));
        assert!(!overlap.agrees(word("B"), word("ABC")));
        assert!(!overlap.reversed().agrees(word("B"), word("AB")));
        assert!(Overlap { cell: 1, other_cell: 0 }.agrees(word("AB"), word("B")));
    }
}
