//! Fill a crossword grid by treating it as a binary constraint-satisfaction problem.
//!
//! Every blank run of cells is a variable whose domain starts as the whole vocabulary. The
//! solver first drops words of the wrong length (node consistency), then propagates the
//! shared-letter constraints between crossing entries with AC-3, and finally runs a backtracking
//! search ordered by the minimum-remaining-values and least-constraining-value heuristics.
//!
//! ```
//! use crossfill::{Crossword, CrosswordSolver};
//!
//! let crossword = Crossword::parse("___\n_##\n_##\n", "cat\ncow\nart\n")?;
//! let assignment = CrosswordSolver::new(&crossword).solve().expect("puzzle is solvable");
//! assert_eq!(assignment.len(), 2);
//! # Ok::<(), crossfill::CrosswordError>(())
//! ```

pub mod arc_consistency;
pub mod backtracking_search;
pub mod crossword;
pub mod domains;

pub use backtracking_search::{Assignment, CrosswordSolver, SolverConfig, Statistics};
pub use crossword::{Crossword, CrosswordError, Direction, Overlap, Variable, Word};
pub use domains::Domains;

/// The expected maximum length for a single entry. Longer words still work, they just spill
/// onto the heap.
pub const MAX_WORD_LENGTH: usize = 21;

/// The expected maximum number of entries crossing a single entry.
pub const MAX_NEIGHBOR_COUNT: usize = 21;

/// An identifier for a given variable, based on its index in the crossword's `variables` list.
pub type VariableId = usize;

/// An identifier for a given word, based on its index in the crossword's vocabulary.
pub type WordId = usize;
