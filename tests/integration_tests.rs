mod integration_tests_helper {

    use automata_convert::{read_jflap_file, Automaton};
    use std::path::PathBuf;

    pub fn test_data_path(file_name: &str) -> PathBuf {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");

        let mut path = PathBuf::from(manifest_dir);
        path.push("test_data");
        path.push(file_name);
        path
    }

    pub fn get_nfa(file_name: &str) -> Automaton {
        match read_jflap_file(test_data_path(file_name)) {
            Ok(nfa) => nfa,
            Err(err) => panic!("Failed to read {}: {:?}", file_name, err),
        }
    }

    /// Every string over the symbols with at most max_len characters
    pub fn all_strings(symbols: &[char], max_len: usize) -> Vec<String> {
        let mut result = vec![String::new()];
        let mut frontier = vec![String::new()];

        for _ in 0..max_len {
            let mut next_frontier = Vec::new();
            for prefix in frontier.iter() {
                for symbol in symbols {
                    let mut word = prefix.clone();
                    word.push(*symbol);
                    next_frontier.push(word);
                }
            }
            result.extend(next_frontier.iter().cloned());
            frontier = next_frontier;
        }

        result
    }
}

mod integration_tests {
    use crate::integration_tests_helper::{all_strings, get_nfa, test_data_path};

    use automata_convert::alphabet::sorted_alphabet;
    use automata_convert::{
        construct_dfa, construct_dfa_with_subsets, construct_simulator, load_automaton,
        read_jflap_file, simulate, simulate_nfa, write_jflap_file, AutomatonError, JflapError,
    };

    const FIXTURES: [&str; 4] = [
        "a_plus_b.jff",
        "third_from_last.jff",
        "even_a.jff",
        "contains_aba.jff",
    ];

    #[test]
    fn test_a_plus_b() {
        let nfa = get_nfa("a_plus_b.jff");
        let dfa = construct_dfa(&nfa).unwrap();

        assert!(dfa.is_deterministic());
        assert_eq!(dfa.get_num_states(), 3);

        assert!(simulate(&dfa, "ab"));
        assert!(simulate(&dfa, "aab"));
        assert!(simulate(&dfa, "aaaaab"));

        assert!(!simulate(&dfa, "a"));
        assert!(!simulate(&dfa, ""));
        assert!(!simulate(&dfa, "ab b"));
        assert!(!simulate(&dfa, "abb"));
        assert!(!simulate(&dfa, "b"));
    }

    #[test]
    fn test_language_equivalence() {
        for fixture in FIXTURES {
            let nfa = get_nfa(fixture);
            let dfa = construct_dfa(&nfa).unwrap();
            let simulator = construct_simulator(&dfa).unwrap();

            // A symbol outside the alphabet is thrown in to exercise stuck runs
            let mut symbols = sorted_alphabet(nfa.get_alphabet());
            symbols.push('z');

            for word in all_strings(&symbols, 6) {
                let expected = simulate_nfa(&nfa, &word);
                assert_eq!(
                    simulator.simulate(&word),
                    expected,
                    "{} disagrees on {:?}",
                    fixture,
                    word
                );
                assert_eq!(simulate(&dfa, &word), expected);
            }
        }
    }

    #[test]
    fn test_determinism_and_bound() {
        for fixture in FIXTURES {
            let nfa = get_nfa(fixture);
            let (dfa, subsets) = construct_dfa_with_subsets(&nfa).unwrap();

            assert!(dfa.is_deterministic(), "{} gave a non deterministic result", fixture);
            assert!(dfa.get_num_states() <= 1 << nfa.get_num_states());
            assert_eq!(subsets.len(), dfa.get_num_states());

            for (state, subset) in subsets.iter().enumerate() {
                let holds_final = subset.iter().any(|nfa_state| nfa.is_accept_state(*nfa_state));
                assert_eq!(dfa.is_accept_state(state), holds_final);
            }

            assert_eq!(simulate(&dfa, ""), nfa.is_accept_state(nfa.get_start_state()));
        }
    }

    #[test]
    fn test_deterministic_input() {
        let nfa = get_nfa("even_a.jff");
        assert!(nfa.is_deterministic());

        let dfa = construct_dfa(&nfa).unwrap();

        assert_eq!(dfa.get_num_states(), nfa.get_num_states());
        assert_eq!(dfa.get_transitions().len(), nfa.get_transitions().len());
        assert!(simulate(&dfa, ""));
        assert!(simulate(&dfa, "abab"));
        assert!(!simulate(&dfa, "bab"));
    }

    #[test]
    fn test_write_and_reload_dfa() {
        let nfa = get_nfa("contains_aba.jff");
        let dfa = construct_dfa(&nfa).unwrap();

        let jff_path = std::env::temp_dir().join("automata_convert_integration_dfa.jff");
        write_jflap_file(&dfa, &jff_path).unwrap();
        let reloaded = read_jflap_file(&jff_path).unwrap();
        assert_eq!(reloaded, dfa);
        std::fs::remove_file(&jff_path).unwrap();

        let json_path = std::env::temp_dir().join("automata_convert_integration_dfa.json");
        let json_path = json_path.to_str().unwrap();
        dfa.save_automaton(json_path).unwrap();
        let reloaded = load_automaton(json_path).unwrap();
        assert_eq!(reloaded, dfa);
        std::fs::remove_file(json_path).unwrap();

        // Converting the DFA again changes nothing
        let again = construct_dfa(&reloaded).unwrap();
        assert_eq!(again, dfa);
    }

    #[test]
    fn test_bad_files() {
        let err = read_jflap_file(test_data_path("epsilon.jff")).unwrap_err();
        match err.downcast_ref() {
            Some(JflapError::EpsilonTransition(1, 0)) => {}
            _ => unreachable!(),
        }

        let err = read_jflap_file(test_data_path("no_transitions.jff")).unwrap_err();
        match err.downcast_ref() {
            Some(JflapError::MissingTransitions) => {}
            _ => unreachable!(),
        }

        let err = read_jflap_file(test_data_path("dangling.jff")).unwrap_err();
        match err.downcast_ref() {
            Some(AutomatonError::DanglingTransition(1, transition, 2)) => {
                assert_eq!(transition.to, 5);
            }
            _ => unreachable!(),
        }

        let err = read_jflap_file(test_data_path("missing.jff")).unwrap_err();
        match err.downcast_ref() {
            Some(JflapError::UnopenableSource(_)) => {}
            _ => unreachable!(),
        }
    }
}
