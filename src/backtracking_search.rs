//! Filling the grid: node consistency, then AC-3, then a backtracking search that picks variables
//! by minimum remaining values (ties going to the variable with more crossings) and tries words in
//! least-constraining-value order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info, trace, warn};
use smallvec::SmallVec;

use crate::arc_consistency::{establish_arc_consistency, revise};
use crate::crossword::{Crossword, Overlap, Variable};
use crate::domains::Domains;
use crate::{VariableId, WordId, MAX_NEIGHBOR_COUNT};

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Search states visited (calls to `backtrack` on an incomplete assignment).
    pub states: usize,
    /// Search states that ran out of candidates.
    pub backtracks: usize,
    /// Arc revisions performed by AC-3.
    pub revisions: usize,
    /// Words removed from domains by AC-3.
    pub pruned: usize,
    /// Whether the search was cut short by `SolverConfig::time_limit`.
    pub timed_out: bool,
    pub duration: Duration,
}

/// Knobs for a solver run. The defaults reproduce the plain algorithm: no time limit and no
/// propagation during search.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Give up (reporting no fill) once the search has run for this long.
    pub time_limit: Option<Duration>,

    /// After each tentative assignment, narrow the assigned variable's domain to the chosen word
    /// and re-run AC-3 on the arcs pointing at it, rejecting the word if some domain empties.
    pub inference: bool,
}

/// The assignment being built during search: at most one word per variable, and each word used
/// by at most one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAssignment {
    words: Vec<Option<WordId>>,

    /// Words currently held by some variable.
    used: BitSet,

    assigned_count: usize,
}

impl PartialAssignment {
    pub fn new(variable_count: usize) -> PartialAssignment {
        PartialAssignment {
            words: vec![None; variable_count],
            used: BitSet::new(),
            assigned_count: 0,
        }
    }

    pub fn get(&self, variable: VariableId) -> Option<WordId> {
        self.words[variable]
    }

    /// Is some variable holding `word`?
    pub fn is_used(&self, word: WordId) -> bool {
        self.used.contains(word)
    }

    /// Give `word` to `variable`, replacing any word it had. `word` must not be held by another
    /// variable; `CrosswordSolver::consistent` checks that before search assigns anything.
    pub fn assign(&mut self, variable: VariableId, word: WordId) {
        match self.words[variable].replace(word) {
            Some(previous) => {
                self.used.remove(previous);
            }
            None => self.assigned_count += 1,
        }
        self.used.insert(word);
    }

    pub fn unassign(&mut self, variable: VariableId) {
        if let Some(previous) = self.words[variable].take() {
            self.used.remove(previous);
            self.assigned_count -= 1;
        }
    }

    pub fn len(&self) -> usize {
        self.assigned_count
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    /// Does every variable have a word?
    pub fn is_complete(&self) -> bool {
        self.assigned_count == self.words.len()
    }
}

/// A complete fill: the word chosen for each variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    words: BTreeMap<Variable, String>,
}

impl Assignment {
    pub fn get(&self, variable: &Variable) -> Option<&str> {
        self.words.get(variable).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &str)> {
        self.words.iter().map(|(variable, word)| (variable, word.as_str()))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (variable, word) in self.iter() {
            writeln!(f, "{variable}: {word}")?;
        }
        Ok(())
    }
}

/// Owns the domains for one puzzle and runs the whole fill process over them.
pub struct CrosswordSolver<'a> {
    crossword: &'a Crossword,
    domains: Domains,
    config: SolverConfig,
    statistics: Statistics,
    deadline: Option<Instant>,
}

impl<'a> CrosswordSolver<'a> {
    pub fn new(crossword: &'a Crossword) -> CrosswordSolver<'a> {
        CrosswordSolver::with_config(crossword, SolverConfig::default())
    }

    pub fn with_config(crossword: &'a Crossword, config: SolverConfig) -> CrosswordSolver<'a> {
        CrosswordSolver {
            crossword,
            domains: Domains::new(crossword),
            config,
            statistics: Statistics::default(),
            deadline: None,
        }
    }

    pub fn crossword(&self) -> &Crossword {
        self.crossword
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Enforce node and arc consistency, then search for a complete fill. `None` means there is
    /// no fill (or the time limit ran out, see `Statistics::timed_out`).
    pub fn solve(&mut self) -> Option<Assignment> {
        let start = Instant::now();
        self.deadline = self.config.time_limit.map(|limit| start + limit);

        info!(
            "Filling {} variables from {} words",
            self.crossword.variables().len(),
            self.crossword.words().len()
        );

        let result = self.solve_inner();
        self.statistics.duration = start.elapsed();

        match &result {
            Some(_) => info!("Found a fill: {:?}", self.statistics),
            None => info!("No fill exists: {:?}", self.statistics),
        }
        result
    }

    fn solve_inner(&mut self) -> Option<Assignment> {
        self.enforce_node_consistency();
        if let Some(empty) = (0..self.domains.variable_count()).find(|&v| self.domains.is_empty(v)) {
            debug!("No word fits {}", self.crossword.variable(empty));
            return None;
        }

        if !self.ac3(None) {
            return None;
        }
        debug!("Domain sizes after arc consistency: {:?}", self.domains);

        let mut assignment = PartialAssignment::new(self.crossword.variables().len());
        if !self.backtrack(&mut assignment) {
            return None;
        }
        Some(self.to_assignment(&assignment))
    }

    /// Drop every word whose length doesn't match its variable.
    pub fn enforce_node_consistency(&mut self) {
        self.domains.enforce_node_consistency(self.crossword);
    }

    /// Make `x` arc consistent with `y`. Returns whether `x`'s domain changed.
    pub fn revise(&mut self, x: VariableId, y: VariableId) -> bool {
        revise(self.crossword, &mut self.domains, x, y)
    }

    /// Run AC-3 starting from `arcs`, or from every arc in the grid if `None`. Returns `false` if
    /// some domain became empty.
    pub fn ac3(&mut self, arcs: Option<&[(VariableId, VariableId)]>) -> bool {
        establish_arc_consistency(self.crossword, &mut self.domains, arcs, &mut self.statistics)
    }

    /// Pick the unassigned variable with the fewest remaining words, preferring the one with
    /// more neighbors (assigned or not) on a tie and the earlier one after that. Returns `None`
    /// once everything is assigned.
    pub fn select_unassigned_variable(&self, assignment: &PartialAssignment) -> Option<VariableId> {
        (0..self.crossword.variables().len())
            .filter(|&variable| assignment.get(variable).is_none())
            .min_by_key(|&variable| {
                (
                    self.domains.len(variable),
                    Reverse(self.crossword.neighbors(variable).len()),
                )
            })
    }

    /// Return the words in `variable`'s domain, ordered by how many words they would rule out
    /// of the domains of its unassigned neighbors, fewest first. Ties keep word id order.
    pub fn order_domain_values(
        &self,
        variable: VariableId,
        assignment: &PartialAssignment,
    ) -> Vec<WordId> {
        // For each unassigned neighbor, count how many of its words put each letter in the shared
        // cell. A word rules out every neighbor word that doesn't share its letter there.
        let neighbor_counts: SmallVec<[(Overlap, usize, HashMap<char, usize>); MAX_NEIGHBOR_COUNT]> =
            self.crossword
                .neighbors(variable)
                .iter()
                .filter(|&&neighbor| assignment.get(neighbor).is_none())
                .filter_map(|&neighbor| {
                    let overlap = self.crossword.overlap(variable, neighbor)?;
                    let mut counts: HashMap<char, usize> = HashMap::new();
                    for word_id in self.domains.domain(neighbor) {
                        let word = self.crossword.word(word_id);
                        if let Some(&letter) = word.chars.get(overlap.other_cell) {
                            *counts.entry(letter).or_default() += 1;
                        }
                    }
                    Some((overlap, self.domains.len(neighbor), counts))
                })
                .collect();

        let mut values: Vec<WordId> = self.domains.domain(variable).iter().collect();
        values.sort_by_cached_key(|&word_id| {
            let word = self.crossword.word(word_id);
            neighbor_counts
                .iter()
                .map(|(overlap, total, counts)| {
                    let kept = word.chars.get(overlap.cell).and_then(|letter| counts.get(letter));
                    total - kept.copied().unwrap_or(0)
                })
                .sum::<usize>()
        });
        values
    }

    /// Could `word_id` be given to `variable` on top of `assignment`? The word must have the
    /// right length, not be held by any other variable, and agree with every assigned neighbor
    /// on the shared cell.
    pub fn consistent(
        &self,
        assignment: &PartialAssignment,
        variable: VariableId,
        word_id: WordId,
    ) -> bool {
        let word = self.crossword.word(word_id);

        if word.len() != self.crossword.variable(variable).length {
            return false;
        }

        if assignment.is_used(word_id) && assignment.get(variable) != Some(word_id) {
            return false;
        }

        self.crossword.neighbors(variable).iter().all(|&neighbor| {
            match (assignment.get(neighbor), self.crossword.overlap(variable, neighbor)) {
                (Some(neighbor_word), Some(overlap)) => {
                    overlap.agrees(word, self.crossword.word(neighbor_word))
                }
                _ => true,
            }
        })
    }

    /// Extend `assignment` into a complete, consistent fill. Returns `false` (leaving
    /// `assignment` as it was) if that's impossible from here.
    pub fn backtrack(&mut self, assignment: &mut PartialAssignment) -> bool {
        if assignment.is_complete() {
            return true;
        }
        if self.out_of_time() {
            return false;
        }
        self.statistics.states += 1;

        let Some(variable) = self.select_unassigned_variable(assignment) else {
            return true;
        };
        trace!(
            "State {}: filling {} ({} words left)",
            self.statistics.states,
            self.crossword.variable(variable),
            self.domains.len(variable)
        );

        for word_id in self.order_domain_values(variable, assignment) {
            if !self.consistent(assignment, variable, word_id) {
                continue;
            }
            assignment.assign(variable, word_id);
            let saved_domains = self.config.inference.then(|| self.domains.clone());

            if (!self.config.inference || self.infer(variable, word_id, assignment))
                && self.backtrack(assignment)
            {
                return true;
            }

            if let Some(saved_domains) = saved_domains {
                self.domains = saved_domains;
            }
            assignment.unassign(variable);
            if self.statistics.timed_out {
                return false;
            }
        }

        self.statistics.backtracks += 1;
        false
    }

    /// Propagate the choice of `word_id` for `variable` into its unassigned neighbors. Returns
    /// `false` if that empties some domain. The caller is responsible for restoring the domains.
    fn infer(
        &mut self,
        variable: VariableId,
        word_id: WordId,
        assignment: &PartialAssignment,
    ) -> bool {
        self.domains.replace(variable, [word_id].into_iter().collect());

        let arcs: Vec<(VariableId, VariableId)> = self
            .crossword
            .neighbors(variable)
            .iter()
            .filter(|&&neighbor| assignment.get(neighbor).is_none())
            .map(|&neighbor| (neighbor, variable))
            .collect();

        self.ac3(Some(&arcs[..]))
    }

    fn out_of_time(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                if !self.statistics.timed_out {
                    warn!("Time limit reached after {} states", self.statistics.states);
                    self.statistics.timed_out = true;
                }
                true
            }
            _ => false,
        }
    }

    fn to_assignment(&self, assignment: &PartialAssignment) -> Assignment {
        let words = self
            .crossword
            .variables()
            .iter()
            .enumerate()
            .filter_map(|(variable_id, &variable)| {
                let word_id = assignment.get(variable_id)?;
                Some((variable, self.crossword.word(word_id).string.clone()))
            })
            .collect();
        Assignment { words }
    }
}
