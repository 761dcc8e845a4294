use automata_convert::{construct_dfa, simulate, to_jflap, Automaton, Transition};

fn main() {
    // Strings made of a's and ending in b: (0, a, 0), (0, a, 1), (1, b, 2)
    let nfa = Automaton::from_parts(
        3,
        0,
        vec![2],
        vec![
            Transition::new(0, 'a', 0),
            Transition::new(0, 'a', 1),
            Transition::new(1, 'b', 2),
        ],
    )
    .unwrap();

    let dfa = construct_dfa(&nfa).unwrap();

    println!("{}", dfa);

    for sentence in ["ab", "aaab", "a", "abb", ""] {
        let verdict = if simulate(&dfa, sentence) {
            "accepted"
        } else {
            "rejected"
        };
        println!("The sentence {:?} is {}", sentence, verdict);
    }

    println!("{}", to_jflap(&dfa));
}
