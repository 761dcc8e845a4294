//! # automata-convert
//!
//! Conversion of non-deterministic finite automata into deterministic ones.
//!
//! This library provides functionality to:
//! - Describe finite automata as a list of states and transitions
//! - Read and write automata in the JFLAP (.jff) format
//! - Convert NFAs to DFAs using Subset Construction
//! - Simulate the resulting DFA on a sentence
//! - Visualize the automata state machine

// Re-export the modules
pub mod alphabet;
pub mod dfa;
pub mod fa;
pub mod jflap;
pub mod simulator;
pub mod visualizer;

// Re-export commonly used functions for convenience
pub use alphabet::extract_alphabet;
pub use dfa::{construct_dfa, construct_dfa_with_subsets};
pub use fa::{load_automaton, Automaton, AutomatonError, Transition};
pub use jflap::{parse_jflap, read_jflap_file, to_jflap, write_jflap_file, JflapError};
pub use simulator::{construct_simulator, simulate, simulate_nfa};
pub use visualizer::visualize;
