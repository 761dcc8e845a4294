use crate::fa::Transition;
use std::collections::HashSet;

/// Collect the distinct symbols read by a list of transitions.
pub fn extract_alphabet(transitions: &[Transition]) -> HashSet<char> {
    transitions
        .iter()
        .map(|transition| transition.symbol)
        .collect()
}

/// The alphabet in ascending order, for everything that has to visit the symbols in a stable order.
pub fn sorted_alphabet(alphabet: &HashSet<char>) -> Vec<char> {
    let mut symbols: Vec<char> = alphabet.iter().copied().collect();
    symbols.sort();
    symbols
}
