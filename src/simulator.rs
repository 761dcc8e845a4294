/* Simulation of finite automata on a sentence. A DFA is walked one symbol at a time from its start
 * state; a missing transition means the run is stuck and the sentence is rejected. The NFA walk
 * keeps every reachable state at once and is used to check conversions. */

use crate::fa::{Automaton, AutomatonError};
use bitvec::prelude::*;
use log::{debug, warn};
use std::collections::HashMap;

/// Record of one sentence going through a DFA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    path: Vec<usize>,
    stuck_at: Option<usize>,
    accepted: bool,
}

impl Run {
    /// The states visited, starting with the start state
    pub fn get_path(&self) -> &[usize] {
        &self.path
    }

    /// The state the run ended in, or got stuck in
    pub fn get_final_state(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    /// Position (in characters) of the symbol which had no transition, if the run got stuck
    pub fn get_stuck_position(&self) -> Option<usize> {
        self.stuck_at
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck_at.is_some()
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }
}

/// Table driven DFA simulator. The transition function is resolved once when the simulator is
/// built so that every step is a single lookup.
#[derive(Debug)]
pub struct Simulator {
    transition_table: HashMap<(usize, char), usize>, // (state, symbol) to next state
    start_state: usize,
    accept_states: BitVec<u8>,
}

impl Simulator {
    fn new(start_state: usize, accept_states: BitVec<u8>) -> Self {
        Simulator {
            transition_table: HashMap::new(),
            start_state,
            accept_states,
        }
    }

    fn init_transition_table(&mut self, dfa: &Automaton) -> Result<(), AutomatonError> {
        for transition in dfa.get_transitions() {
            let key = (transition.from, transition.symbol);

            if self.transition_table.insert(key, transition.to).is_some() {
                return Err(AutomatonError::NonDeterministic(
                    transition.from,
                    transition.symbol,
                ));
            }
        }
        Ok(())
    }

    /// Run the sentence and keep track of the visited states.
    pub fn run(&self, input: &str) -> Run {
        let mut state = self.start_state;
        let mut path = vec![state];

        for (pos, ch) in input.chars().enumerate() {
            match self.transition_table.get(&(state, ch)) {
                Some(next_state) => {
                    state = *next_state;
                    path.push(state);
                }
                None => {
                    warn!(
                        "Simulation stuck in state {} reading {:?} at position {}",
                        state, ch, pos
                    );
                    return Run {
                        path,
                        stuck_at: Some(pos),
                        accepted: false,
                    };
                }
            }
        }

        Run {
            path,
            stuck_at: None,
            accepted: self.accept_states[state],
        }
    }

    /// True if the DFA accepts the sentence
    pub fn simulate(&self, input: &str) -> bool {
        self.run(input).is_accepted()
    }
}

/// Build a simulator for the given DFA. Malformed automata and automata with more than one
/// transition for a state and symbol are refused.
pub fn construct_simulator(dfa: &Automaton) -> Result<Simulator, AutomatonError> {
    dfa.validate()?;

    let mut simulator = Simulator::new(dfa.get_start_state(), dfa.get_acceptor_states().clone());

    simulator.init_transition_table(dfa)?;

    Ok(simulator)
}

/// Walk the DFA over the sentence and report whether it ends in a final state. Symbols the DFA
/// has no transition for, including symbols outside its alphabet, reject the sentence. An empty
/// sentence is accepted iff the start state is final.
pub fn simulate(dfa: &Automaton, input: &str) -> bool {
    let mut state = dfa.get_start_state();

    for ch in input.chars() {
        let next = dfa
            .get_transitions()
            .iter()
            .find(|transition| transition.from == state && transition.symbol == ch);

        match next {
            Some(transition) => state = transition.to,
            None => {
                debug!("No transition from state {} reading {:?}", state, ch);
                return false;
            }
        }
    }

    dfa.is_accept_state(state)
}

/// Decide acceptance on an NFA by following all of its runs at once: the sentence is accepted if
/// any run ends in a final state.
pub fn simulate_nfa(nfa: &Automaton, input: &str) -> bool {
    let num_states = nfa.get_num_states();

    if nfa.get_start_state() >= num_states {
        return false;
    }

    let mut current: BitVec<u8> = BitVec::repeat(false, num_states);
    current.set(nfa.get_start_state(), true);

    for ch in input.chars() {
        let mut next: BitVec<u8> = BitVec::repeat(false, num_states);

        for transition in nfa.get_transitions() {
            if transition.symbol == ch
                && transition.to < num_states
                && current.get(transition.from).is_some_and(|bit| *bit)
            {
                next.set(transition.to, true);
            }
        }

        if next.not_any() {
            return false;
        }
        current = next;
    }

    current.iter_ones().any(|state| nfa.is_accept_state(state))
}
