/* Automaton model shared by NFAs and DFAs. States are plain indices in 0..num_states and the
 * transitions are kept as one flat list in insertion order. */

use crate::alphabet::{extract_alphabet, sorted_alphabet};
use bitvec::prelude::*;
use color_eyre::eyre::{eyre, Report, Result};
use petgraph::dot::Dot;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::prelude::StableGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::process::Command;

/// A single edge of the automaton, read as "from `from`, reading `symbol`, go to `to`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: usize,
    pub symbol: char,
    pub to: usize,
}

impl Transition {
    pub fn new(from: usize, symbol: char, to: usize) -> Self {
        Transition { from, symbol, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.from, self.symbol, self.to)
    }
}

/// List of structural problems an automaton can have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    /// The automaton has no states at all
    EmptyAutomaton,
    /// The start state is not one of the states (start, number of states)
    StartStateOutOfRange(usize, usize),
    /// A final state is not one of the states (final, number of states)
    AcceptStateOutOfRange(usize, usize),
    /// The accept set does not cover exactly the states (accept flags, number of states)
    InconsistentStateCount(usize, usize),
    /// A transition references a state which does not exist (position, transition, number of
    /// states)
    DanglingTransition(usize, Transition, usize),
    /// A state has more than one transition on the same symbol
    NonDeterministic(usize, char),
}

impl AutomatonError {
    /// True for the errors which make an automaton unusable as input to any algorithm. A
    /// non-deterministic automaton is well formed, it just is not a DFA.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, AutomatonError::NonDeterministic(..))
    }
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::EmptyAutomaton => {
                write!(f, "Error: Malformed automaton, it has no states!")
            }
            AutomatonError::StartStateOutOfRange(start, num_states) => write!(
                f,
                "Error: Malformed automaton, start state {} is not one of its {} states!",
                start, num_states
            ),
            AutomatonError::AcceptStateOutOfRange(state, num_states) => write!(
                f,
                "Error: Malformed automaton, final state {} is not one of its {} states!",
                state, num_states
            ),
            AutomatonError::InconsistentStateCount(accept_flags, num_states) => write!(
                f,
                "Error: Malformed automaton, {} accept flags recorded for {} states!",
                accept_flags, num_states
            ),
            AutomatonError::DanglingTransition(position, transition, num_states) => write!(
                f,
                "Error: Malformed automaton, transition {} ({}) leaves the {} states!",
                position + 1,
                transition,
                num_states
            ),
            AutomatonError::NonDeterministic(state, symbol) => write!(
                f,
                "Error: State {} has more than one transition reading {}!",
                state, symbol
            ),
        }
    }
}

impl std::error::Error for AutomatonError {}

/// A finite automaton. The same structure holds the NFA read from a file and the DFA produced by
/// subset construction, only the DFA is guaranteed to have at most one transition per state and
/// symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Automaton {
    num_states: usize,
    start_state: usize,
    accept_states: BitVec<u8>,
    transitions: Vec<Transition>,
    #[serde(skip)]
    alphabet: HashSet<char>, // Derived from the transitions, rebuilt after loading
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    pub fn new() -> Self {
        Automaton {
            num_states: 0,
            start_state: 0,
            accept_states: BitVec::new(),
            transitions: Vec::new(),
            alphabet: HashSet::new(),
        }
    }

    /// Build an automaton out of its parts and check that they fit together.
    pub fn from_parts<I>(
        num_states: usize,
        start_state: usize,
        accept_states: I,
        transitions: Vec<Transition>,
    ) -> Result<Self, AutomatonError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut accept_bits: BitVec<u8> = BitVec::repeat(false, num_states);

        for state in accept_states {
            if state >= num_states {
                return Err(AutomatonError::AcceptStateOutOfRange(state, num_states));
            }
            accept_bits.set(state, true);
        }

        let alphabet = extract_alphabet(&transitions);

        let result = Automaton {
            num_states,
            start_state,
            accept_states: accept_bits,
            transitions,
            alphabet,
        };

        result.validate()?;
        Ok(result)
    }

    /// Add a fresh non accepting state and return its id
    pub fn add_state(&mut self) -> usize {
        let state_id = self.num_states;
        self.num_states += 1;
        self.accept_states.push(false);
        state_id
    }

    /// Append a transition. The states are not checked here, [`Automaton::validate`] reports any
    /// transition pointing outside the automaton.
    pub fn add_transition(&mut self, from: usize, symbol: char, to: usize) {
        self.transitions.push(Transition::new(from, symbol, to));
        self.alphabet.insert(symbol);
    }

    pub fn set_start_state(&mut self, state_id: usize) {
        self.start_state = state_id;
    }

    /// Mark a state as final. The state must have been added already.
    pub fn set_accept_state(&mut self, state_id: usize) -> Result<(), AutomatonError> {
        if state_id >= self.num_states {
            return Err(AutomatonError::AcceptStateOutOfRange(state_id, self.num_states));
        }
        self.accept_states.set(state_id, true);
        Ok(())
    }

    pub fn get_num_states(&self) -> usize {
        self.num_states
    }

    pub fn get_start_state(&self) -> usize {
        self.start_state
    }

    pub fn get_alphabet(&self) -> &HashSet<char> {
        &self.alphabet
    }

    pub fn get_acceptor_states(&self) -> &BitVec<u8> {
        &self.accept_states
    }

    pub fn is_accept_state(&self, state_id: usize) -> bool {
        self.accept_states.get(state_id).is_some_and(|bit| *bit)
    }

    pub fn get_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Get a list of all outgoing transitions for the given state
    pub fn get_state_transitions(&self, state_id: usize) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|transition| transition.from == state_id)
            .collect()
    }

    /// Check the structural invariants: at least one state, a start state and final states
    /// inside the state range, and no transition leaving the state range.
    pub fn validate(&self) -> Result<(), AutomatonError> {
        if self.num_states == 0 {
            return Err(AutomatonError::EmptyAutomaton);
        }

        if self.accept_states.len() != self.num_states {
            return Err(AutomatonError::InconsistentStateCount(
                self.accept_states.len(),
                self.num_states,
            ));
        }

        if self.start_state >= self.num_states {
            return Err(AutomatonError::StartStateOutOfRange(
                self.start_state,
                self.num_states,
            ));
        }

        for (position, transition) in self.transitions.iter().enumerate() {
            if transition.from >= self.num_states || transition.to >= self.num_states {
                return Err(AutomatonError::DanglingTransition(
                    position,
                    *transition,
                    self.num_states,
                ));
            }
        }

        Ok(())
    }

    /// Returns the first (state, symbol) pair with more than one outgoing transition, if any.
    pub fn find_non_determinism(&self) -> Option<(usize, char)> {
        let mut seen: HashSet<(usize, char)> = HashSet::new();

        self.transitions
            .iter()
            .map(|transition| (transition.from, transition.symbol))
            .find(|key| !seen.insert(*key))
    }

    pub fn is_deterministic(&self) -> bool {
        self.find_non_determinism().is_none()
    }

    /// Write the automaton as a Graphviz dot file and render it to a jpg next to it.
    pub fn show_fa(&self, filename: &str) -> Result<()> {
        let mut stable_graph = StableGraph::new();

        let mut edge_map: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();

        for state_idx in 0..self.num_states {
            let mut node_label = format!("q{}", state_idx);
            if state_idx == self.start_state {
                node_label = format!("Start\n{}", node_label);
            }
            if self.is_accept_state(state_idx) {
                node_label = format!("Accept\n{}", node_label);
            }
            stable_graph.add_node(node_label);
        }

        // Parallel transitions share one edge whose label lists every symbol

        for transition in self.transitions.iter() {
            let key = (NodeIndex::new(transition.from), NodeIndex::new(transition.to));

            match edge_map.get(&key) {
                Some(edge_idx) => {
                    let old_label: &String = &stable_graph[*edge_idx];
                    let new_label = format!("{}, {}", old_label, transition.symbol);
                    stable_graph[*edge_idx] = new_label;
                }
                None => {
                    let edge_idx = stable_graph.add_edge(key.0, key.1, transition.symbol.to_string());
                    edge_map.insert(key, edge_idx);
                }
            }
        }

        let dot = Dot::new(&stable_graph);

        let dot_filename = format!("{}.dot", filename);
        let mut dot_file = File::create(&dot_filename)?;

        dot_file.write_all(dot.to_string().as_bytes())?;

        render_jpg(&dot_filename, &format!("{}.jpg", filename))?;

        println!("Automaton vizualization saved as {}.jpg", filename);

        Ok(())
    }

    /// Save the automaton as a json file
    pub fn save_automaton(&self, file_name: &str) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;

        let mut file = File::create(file_name)?;

        writeln!(file, "{}", json_string)?;

        Ok(())
    }
}

/// Render a dot file to a jpg with Graphviz. Fails when `dot` exits unsuccessfully.
fn render_jpg(dot_filename: &str, jpg_filename: &str) -> Result<()> {
    let output = Command::new("dot")
        .args(["-Tjpg", dot_filename, "-o", jpg_filename])
        .output()?;

    if !output.status.success() {
        return Err(eyre!(
            "dot failed to render {}: {}",
            dot_filename,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(())
}

/// Load an automaton from a saved json file. The loaded automaton is checked before it is
/// handed out.
pub fn load_automaton(file_name: &str) -> Result<Automaton> {
    let file = File::open(file_name)?;

    let buf_reader = BufReader::new(file);

    let mut automaton: Automaton = serde_json::from_reader(buf_reader)?;
    automaton.alphabet = extract_alphabet(&automaton.transitions);

    if let Err(err) = automaton.validate() {
        return Err(Report::new(err));
    }

    Ok(automaton)
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initial state: {}", self.start_state)?;
        writeln!(f, "Total of states: {}", self.num_states)?;
        writeln!(f, "Total of transitions: {}", self.transitions.len())?;
        writeln!(f, "Alphabet size: {}", self.alphabet.len())?;

        for (idx, transition) in self.transitions.iter().enumerate() {
            writeln!(
                f,
                "Transition {}: From {} to {} with {}",
                idx + 1,
                transition.from,
                transition.to,
                transition.symbol
            )?;
        }

        for (idx, symbol) in sorted_alphabet(&self.alphabet).iter().enumerate() {
            writeln!(f, "Symbol {}: {}", idx + 1, symbol)?;
        }

        for (idx, state) in self.accept_states.iter_ones().enumerate() {
            writeln!(f, "Final state {}: {}", idx + 1, state)?;
        }

        Ok(())
    }
}
