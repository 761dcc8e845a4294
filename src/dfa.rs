/* Perform subset construction to convert an NFA into a DFA. Every DFA state stands for a set of
 * NFA states, keyed by a bitvec over the NFA state ids. */

use crate::alphabet::{extract_alphabet, sorted_alphabet};
use crate::fa::{Automaton, AutomatonError};
use bitvec::prelude::*;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};

/// A struct which is a bitvec and its hash stored together to ease fetching the hash of the bitvec
/// quickly instead of calculating it each time.

#[derive(Clone)]
struct HashedBitVec {
    bv: BitVec<u8>,
    hash: u64,
}

impl HashedBitVec {
    fn new(bv: BitVec<u8>) -> Self {
        let mut hasher = DefaultHasher::new();
        bv.hash(&mut hasher);
        let hash = hasher.finish();
        Self { bv, hash }
    }
}

impl Hash for HashedBitVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for HashedBitVec {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bv == other.bv
    }
}

impl Eq for HashedBitVec {}

/// Targets of the NFA grouped per state and symbol, so that a move does not rescan the whole
/// transition list.
type TransitionTable = Vec<HashMap<char, Vec<usize>>>;

fn get_transition_table(nfa: &Automaton) -> TransitionTable {
    let mut table: TransitionTable = vec![HashMap::new(); nfa.get_num_states()];

    for transition in nfa.get_transitions() {
        table[transition.from]
            .entry(transition.symbol)
            .or_default()
            .push(transition.to);
    }

    table
}

// This function returns the set of states accessible via char c within the set q

fn delta(table: &TransitionTable, q: &HashedBitVec, c: char) -> BitVec<u8> {
    let mut result = BitVec::repeat(false, q.bv.len());
    for node in q.bv.iter_ones() {
        let target_state_ids = match table[node].get(&c) {
            None => continue,
            Some(state_ids) => state_ids,
        };
        for state_id in target_state_ids {
            result.set(*state_id, true);
        }
    }
    result
}

/// Bookkeeping of the subset states discovered so far
struct SubsetStates {
    q_list: HashMap<HashedBitVec, usize>, // Mapping from nfa state set to DFA state
    subsets: Vec<HashedBitVec>,           // Nfa state set of every DFA state, by DFA id
}

impl SubsetStates {
    fn new() -> Self {
        SubsetStates {
            q_list: HashMap::new(),
            subsets: Vec::new(),
        }
    }

    fn get(&self, q: &HashedBitVec) -> Option<usize> {
        self.q_list.get(q).copied()
    }

    /// Add a DFA state for the set q. It is an accept state as soon as one of the NFA states in q
    /// is.
    fn add(
        &mut self,
        dfa: &mut Automaton,
        q: HashedBitVec,
        nfa_accepts: &BitVec<u8>,
    ) -> Result<usize, AutomatonError> {
        let di = dfa.add_state();

        if q.bv.iter_ones().any(|state| nfa_accepts[state]) {
            dfa.set_accept_state(di)?;
        }

        debug!(
            "NFA states {:?} become DFA state {}",
            q.bv.iter_ones().collect::<Vec<usize>>(),
            di
        );

        self.q_list.insert(q.clone(), di);
        self.subsets.push(q);
        Ok(di)
    }
}

///  Apply the subset construction algorithm on an NFA to build a DFA. Along with the DFA, the
///  set of NFA states behind every DFA state is returned, indexed by DFA state id.
///
///  The input is checked first and a malformed automaton is refused before any work is done. For
///  an NFA with n states at most 2^n DFA states can be produced, every one of them is processed
///  exactly once.
pub fn construct_dfa_with_subsets(
    nfa: &Automaton,
) -> Result<(Automaton, Vec<Vec<usize>>), AutomatonError> {
    nfa.validate()?;

    let table = get_transition_table(nfa);
    let alphabet = sorted_alphabet(&extract_alphabet(nfa.get_transitions()));
    let nfa_accepts = nfa.get_acceptor_states();

    let mut result = Automaton::new();
    let mut subset_states = SubsetStates::new();
    let mut work_list: VecDeque<usize> = VecDeque::new();

    let mut nfa_states = BitVec::repeat(false, nfa.get_num_states());
    nfa_states.set(nfa.get_start_state(), true);

    let d0 = subset_states.add(&mut result, HashedBitVec::new(nfa_states), nfa_accepts)?;
    result.set_start_state(d0);
    work_list.push_back(d0);

    while let Some(dq) = work_list.pop_front() {
        for c in alphabet.iter() {
            let end_states = delta(&table, &subset_states.subsets[dq], *c);
            if end_states.not_any() {
                // No move on c, the DFA simply has no transition here
                continue;
            }

            let t = HashedBitVec::new(end_states);

            let dt = match subset_states.get(&t) {
                Some(existing_dt) => existing_dt,
                None => {
                    let dt = subset_states.add(&mut result, t, nfa_accepts)?;
                    work_list.push_back(dt);
                    dt
                }
            };

            result.add_transition(dq, *c, dt);
        }
    }

    info!(
        "Subset construction turned {} NFA states into {} DFA states with {} transitions",
        nfa.get_num_states(),
        result.get_num_states(),
        result.get_transitions().len()
    );

    let subsets = subset_states
        .subsets
        .iter()
        .map(|q| q.bv.iter_ones().collect())
        .collect();

    Ok((result, subsets))
}

///  Apply the subset construction algorithm on an NFA to build a DFA recognizing the same
///  language. The NFA is left untouched.
pub fn construct_dfa(nfa: &Automaton) -> Result<Automaton, AutomatonError> {
    construct_dfa_with_subsets(nfa).map(|(dfa, _)| dfa)
}

#[cfg(test)]
mod dfa_tests {
    use super::*;
    use crate::fa::Transition;
    use crate::simulator::simulate;
    use std::collections::HashSet;

    // (0, a, 0), (0, a, 1), (1, b, 2) accepts a+b
    fn a_plus_b_nfa() -> Automaton {
        Automaton::from_parts(
            3,
            0,
            vec![2],
            vec![
                Transition::new(0, 'a', 0),
                Transition::new(0, 'a', 1),
                Transition::new(1, 'b', 2),
            ],
        )
        .unwrap()
    }

    // Strings over {a, b} whose third symbol from the end is an a
    fn third_from_last_nfa() -> Automaton {
        Automaton::from_parts(
            4,
            0,
            vec![3],
            vec![
                Transition::new(0, 'a', 0),
                Transition::new(0, 'b', 0),
                Transition::new(0, 'a', 1),
                Transition::new(1, 'a', 2),
                Transition::new(1, 'b', 2),
                Transition::new(2, 'a', 3),
                Transition::new(2, 'b', 3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_hashed_bitvec() {
        let mut bv1: BitVec<u8> = BitVec::repeat(false, 4);
        bv1.set(1, true);
        bv1.set(3, true);
        let mut bv2: BitVec<u8> = BitVec::repeat(false, 4);
        bv2.set(3, true);
        bv2.set(1, true);

        let q1 = HashedBitVec::new(bv1);
        let q2 = HashedBitVec::new(bv2);
        assert!(q1 == q2);

        let mut map = HashMap::new();
        map.insert(q1, 7);
        assert_eq!(map.get(&q2), Some(&7));

        let q3 = HashedBitVec::new(BitVec::repeat(false, 4));
        assert!(map.get(&q3).is_none());
    }

    #[test]
    fn test_delta() {
        let nfa = a_plus_b_nfa();
        let table = get_transition_table(&nfa);

        let mut start: BitVec<u8> = BitVec::repeat(false, 3);
        start.set(0, true);
        let start = HashedBitVec::new(start);

        let on_a: Vec<usize> = delta(&table, &start, 'a').iter_ones().collect();
        assert_eq!(on_a, vec![0, 1]);
        assert!(delta(&table, &start, 'b').not_any());
        assert!(delta(&table, &start, 'z').not_any());
    }

    #[test]
    fn test_construct_dfa_a_plus_b() {
        let nfa = a_plus_b_nfa();
        let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

        // {0} -a-> {0, 1} -a-> {0, 1}, {0, 1} -b-> {2}
        assert_eq!(dfa.get_num_states(), 3);
        assert_eq!(dfa.get_start_state(), 0);
        assert_eq!(subsets, vec![vec![0], vec![0, 1], vec![2]]);
        assert_eq!(
            dfa.get_transitions(),
            &[
                Transition::new(0, 'a', 1),
                Transition::new(1, 'a', 1),
                Transition::new(1, 'b', 2),
            ]
        );

        let accept_states: Vec<usize> = dfa.get_acceptor_states().iter_ones().collect();
        assert_eq!(accept_states, vec![2]);
        assert!(dfa.is_deterministic());
        assert!(dfa.validate().is_ok());
    }

    #[test]
    fn test_construct_dfa_leaves_nfa_untouched() {
        let nfa = a_plus_b_nfa();
        let before = nfa.clone();

        construct_dfa(&nfa).unwrap();

        assert_eq!(nfa, before);
    }

    #[test]
    fn test_construct_dfa_without_transitions() {
        let nfa = Automaton::from_parts(3, 1, vec![0, 1, 2], vec![]).unwrap();
        let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

        assert_eq!(dfa.get_num_states(), 1);
        assert_eq!(dfa.get_start_state(), 0);
        assert!(dfa.is_accept_state(0));
        assert!(dfa.get_transitions().is_empty());
        assert!(dfa.get_alphabet().is_empty());
        assert_eq!(subsets, vec![vec![1]]);

        // Only the empty sentence is accepted
        assert!(simulate(&dfa, ""));
        assert!(!simulate(&dfa, "a"));
    }

    #[test]
    fn test_final_state_propagation() {
        // Only the start state is final, every subset holding it must be final as well
        let nfa = Automaton::from_parts(
            2,
            0,
            vec![0],
            vec![
                Transition::new(0, 'a', 0),
                Transition::new(0, 'a', 1),
                Transition::new(1, 'a', 1),
            ],
        )
        .unwrap();

        let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

        assert_eq!(subsets, vec![vec![0], vec![0, 1]]);
        assert!(dfa.is_accept_state(0));
        assert!(dfa.is_accept_state(1));
    }

    #[test]
    fn test_subset_identity_ignores_discovery_path() {
        // {1, 2} is reached once through a and once through b, it must stay a single DFA state
        let nfa = Automaton::from_parts(
            3,
            0,
            vec![2],
            vec![
                Transition::new(0, 'a', 1),
                Transition::new(0, 'a', 2),
                Transition::new(0, 'b', 2),
                Transition::new(0, 'b', 1),
                Transition::new(1, 'a', 1),
                Transition::new(2, 'a', 2),
            ],
        )
        .unwrap();

        let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

        assert_eq!(dfa.get_num_states(), 2);
        assert_eq!(subsets, vec![vec![0], vec![1, 2]]);

        let targets: HashSet<usize> = dfa
            .get_state_transitions(0)
            .iter()
            .map(|transition| transition.to)
            .collect();
        assert_eq!(targets, HashSet::from([1]));
    }

    #[test]
    fn test_termination_bound() {
        let nfa = third_from_last_nfa();
        let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

        // Every subset contains the start state, so 2^3 of the 2^4 possible subsets appear
        assert_eq!(dfa.get_num_states(), 8);
        assert!(dfa.get_num_states() <= 1 << nfa.get_num_states());

        let distinct: HashSet<Vec<usize>> = subsets.iter().cloned().collect();
        assert_eq!(distinct.len(), subsets.len());
        assert!(subsets.iter().all(|subset| subset.contains(&0)));

        assert!(dfa.is_deterministic());
        // Complete over {a, b}: every state moves on both symbols
        assert_eq!(dfa.get_transitions().len(), 16);
    }

    #[test]
    fn test_deterministic_input_is_preserved() {
        let dfa = Automaton::from_parts(
            3,
            0,
            vec![2],
            vec![
                Transition::new(0, 'a', 1),
                Transition::new(1, 'b', 2),
                Transition::new(2, 'a', 1),
                Transition::new(2, 'b', 0),
            ],
        )
        .unwrap();

        let (result, subsets) = construct_dfa_with_subsets(&dfa).unwrap();

        assert_eq!(result.get_num_states(), dfa.get_num_states());
        assert_eq!(result.get_transitions().len(), dfa.get_transitions().len());
        assert!(subsets.iter().all(|subset| subset.len() == 1));

        // Map every input state to the DFA state standing for it and compare transitions
        let renaming: HashMap<usize, usize> = subsets
            .iter()
            .enumerate()
            .map(|(id, subset)| (subset[0], id))
            .collect();

        let expected: HashSet<Transition> = dfa
            .get_transitions()
            .iter()
            .map(|t| Transition::new(renaming[&t.from], t.symbol, renaming[&t.to]))
            .collect();
        let actual: HashSet<Transition> = result.get_transitions().iter().copied().collect();
        assert_eq!(actual, expected);

        for state in 0..dfa.get_num_states() {
            assert_eq!(
                dfa.is_accept_state(state),
                result.is_accept_state(renaming[&state])
            );
        }
    }

    #[test]
    fn test_malformed_nfa_is_refused() {
        let empty = Automaton::new();
        assert_eq!(
            construct_dfa(&empty).unwrap_err(),
            AutomatonError::EmptyAutomaton
        );

        let mut dangling = Automaton::new();
        dangling.add_state();
        dangling.add_state();
        dangling.add_transition(1, 'a', 9);
        assert_eq!(
            construct_dfa(&dangling).unwrap_err(),
            AutomatonError::DanglingTransition(0, Transition::new(1, 'a', 9), 2)
        );

        let mut bad_start = Automaton::new();
        bad_start.add_state();
        bad_start.set_start_state(1);
        assert_eq!(
            construct_dfa(&bad_start).unwrap_err(),
            AutomatonError::StartStateOutOfRange(1, 1)
        );
    }
}
