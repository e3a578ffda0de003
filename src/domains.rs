use std::fmt::{self, Debug, Formatter};

use bit_set::BitSet;
use log::debug;

use crate::crossword::Crossword;
use crate::{VariableId, WordId};

/// The candidate words still available to each variable, stored as a set of word ids per
/// variable. This is the only state that constraint propagation narrows.
#[derive(Clone, PartialEq, Eq)]
pub struct Domains {
    domains: Vec<BitSet>,
}

impl Debug for Domains {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.domains.iter().map(BitSet::len)).finish()
    }
}

impl Domains {
    /// Start every variable off with the whole vocabulary.
    pub fn new(crossword: &Crossword) -> Domains {
        let word_count = crossword.words().len();
        let mut full = BitSet::with_capacity(word_count);
        for word_id in 0..word_count {
            full.insert(word_id);
        }

        Domains {
            domains: crossword.variables().iter().map(|_| full.clone()).collect(),
        }
    }

    /// Panics if `variable` isn't one of the crossword's variables.
    pub fn domain(&self, variable: VariableId) -> &BitSet {
        &self.domains[variable]
    }

    pub fn len(&self, variable: VariableId) -> usize {
        self.domains[variable].len()
    }

    pub fn is_empty(&self, variable: VariableId) -> bool {
        self.domains[variable].is_empty()
    }

    pub fn contains(&self, variable: VariableId, word: WordId) -> bool {
        self.domains[variable].contains(word)
    }

    /// Remove a single candidate. Returns whether it was present.
    pub fn remove(&mut self, variable: VariableId, word: WordId) -> bool {
        self.domains[variable].remove(word)
    }

    /// Swap in a whole new candidate set for `variable`.
    pub fn replace(&mut self, variable: VariableId, domain: BitSet) {
        self.domains[variable] = domain;
    }

    /// Number of variables tracked.
    pub fn variable_count(&self) -> usize {
        self.domains.len()
    }

    /// Remove every word whose length doesn't match its variable's length. The kept words are
    /// collected into a fresh set which then replaces the old one.
    pub fn enforce_node_consistency(&mut self, crossword: &Crossword) {
        for (variable_id, variable) in crossword.variables().iter().enumerate() {
            let kept: BitSet = self.domains[variable_id]
                .iter()
                .filter(|&word_id| crossword.word(word_id).len() == variable.length)
                .collect();
            self.replace(variable_id, kept);
        }

        debug!("Domain sizes after node consistency: {:?}", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossword::{Direction, Variable};

    fn crossword() -> Crossword {
        Crossword::from_variables(
            4,
            4,
            &[
                Variable::new(0, 0, Direction::Across, 3),
                Variable::new(0, 0, Direction::Down, 4),
            ],
            ["cat", "dog", "bird", "fish", "ox", "horse"],
        )
        .unwrap()
    }

    #[test]
    fn test_new_domains_hold_whole_vocabulary() {
        let crossword = crossword();
        let domains = Domains::new(&crossword);

        assert_eq!(domains.variable_count(), 2);
        assert_eq!(domains.len(0), 6);
        assert_eq!(domains.len(1), 6);
    }

    #[test]
    fn test_remove() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);
        let cat = crossword.word_id("CAT").unwrap();

        assert!(domains.remove(0, cat));
        assert!(!domains.remove(0, cat));
        assert!(!domains.contains(0, cat));
        assert!(domains.contains(1, cat), "other variables are untouched");
    }

    #[test]
    fn test_enforce_node_consistency() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);
        domains.enforce_node_consistency(&crossword);

        for (variable_id, variable) in crossword.variables().iter().enumerate() {
            for word_id in domains.domain(variable_id) {
                assert_eq!(crossword.word(word_id).len(), variable.length);
            }
        }

        let words = |variable_id: VariableId| {
            domains
                .domain(variable_id)
                .iter()
                .map(|w| crossword.word(w).string.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(words(0), ["CAT", "DOG"]);
        assert_eq!(words(1), ["BIRD", "FISH"]);
    }

    #[test]
    fn test_node_consistency_keeps_already_filtered_domains() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);
        domains.enforce_node_consistency(&crossword);
        let once = domains.clone();
        domains.enforce_node_consistency(&crossword);

        assert_eq!(domains, once);
    }

    #[test]
    #[should_panic]
    fn test_unknown_variable_panics() {
        let crossword = crossword();
        let domains = Domains::new(&crossword);
        let _ = domains.domain(2);
    }
}
