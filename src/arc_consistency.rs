//! Propagation of the shared-letter constraints between crossing entries (AC-3).

use std::collections::HashSet;

use bit_set::BitSet;
use log::{debug, trace};

use crate::backtracking_search::Statistics;
use crate::crossword::Crossword;
use crate::domains::Domains;
use crate::VariableId;

/// Make `x` arc consistent with `y`: drop every word from `x`'s domain that doesn't agree with
/// at least one word in `y`'s domain on the shared cell. Returns whether `x`'s domain changed.
///
/// Variables that don't cross are left alone.
pub fn revise(crossword: &Crossword, domains: &mut Domains, x: VariableId, y: VariableId) -> bool {
    let Some(overlap) = crossword.overlap(x, y) else {
        return false;
    };

    // Which letters can `y` still put in the shared cell? Any word in `x` putting some other
    // letter there, or too short to reach it, has no support.
    let supported_chars: HashSet<char> = domains
        .domain(y)
        .iter()
        .filter_map(|word_id| crossword.word(word_id).chars.get(overlap.other_cell).copied())
        .collect();

    let kept: BitSet = domains
        .domain(x)
        .iter()
        .filter(|&word_id| {
            let letter = crossword.word(word_id).chars.get(overlap.cell);
            letter.is_some_and(|letter| supported_chars.contains(letter))
        })
        .collect();

    if kept.len() == domains.len(x) {
        return false;
    }

    trace!("Revised {} against {}: {} -> {} words", x, y, domains.len(x), kept.len());
    domains.replace(x, kept);
    true
}

/// Run AC-3 until no domain can be narrowed any further.
///
/// The worklist starts as every ordered pair of crossing variables, or as `arcs` if given (which
/// lets a caller re-propagate just the effects of a change it made). Whenever a revision narrows
/// `x`, every arc `(z, x)` for the other neighbors `z` of `x` is queued again.
///
/// Returns `false` as soon as a domain becomes empty. Returning `true` means every remaining word
/// is supported by every neighbor, not that a fill exists.
pub fn establish_arc_consistency(
    crossword: &Crossword,
    domains: &mut Domains,
    arcs: Option<&[(VariableId, VariableId)]>,
    statistics: &mut Statistics,
) -> bool {
    let mut queue: Vec<(VariableId, VariableId)> = match arcs {
        Some(arcs) => arcs.to_vec(),
        None => crossword.arcs().collect(),
    };

    // Arcs currently waiting in `queue`, so the same arc isn't queued twice.
    let mut queued: HashSet<(VariableId, VariableId)> = queue.iter().copied().collect();

    while let Some((x, y)) = queue.pop() {
        queued.remove(&(x, y));
        statistics.revisions += 1;

        let before = domains.len(x);
        if !revise(crossword, domains, x, y) {
            continue;
        }
        statistics.pruned += before - domains.len(x);

        if domains.is_empty(x) {
            debug!("Arc consistency emptied the domain of {}", crossword.variable(x));
            return false;
        }

        for &z in crossword.neighbors(x) {
            if z != y && queued.insert((z, x)) {
                queue.push((z, x));
            }
        }
    }

    true
}
