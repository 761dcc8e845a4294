use automata_convert::dfa::construct_dfa_with_subsets;
use automata_convert::jflap::{read_jflap_file, write_jflap_file};
use automata_convert::simulator::{construct_simulator, simulate_nfa};
use automata_convert::visualizer::visualize;
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command};
use color_eyre::eyre::{eyre, Result};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

fn build_command() -> Command {
    Command::new("automata-convert")
        .version("1.0")
        .author("Eduardo Lopes")
        .about("Convert a non-deterministic automaton described in a JFLAP file into a deterministic one and simulate it on a sentence")
        .arg(
            Arg::new("file")
                .help("The JFLAP (.jff) file which describes the non-deterministic automaton")
                .value_name("FILE.jff")
                .value_parser(clap::value_parser!(PathBuf))
        )
        .arg(
            Arg::new("sentence")
                .short('s')
                .long("sentence")
                .help("The sentence to simulate on the deterministic automaton. Empty by default")
                .value_name("SENTENCE")
                .value_parser(clap::value_parser!(String))
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write the deterministic automaton to this JFLAP file")
                .value_name("OUTPUT FILE.jff")
                .value_parser(clap::value_parser!(PathBuf))
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Write the deterministic automaton to this json file")
                .value_name("OUTPUT FILE.json")
                .value_parser(clap::value_parser!(String))
        )
        .arg(
            Arg::new("save-nfa")
                .short('n')
                .long("save-nfa")
                .help("Save a Graphviz rendering of the NFA read from the file")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("save-dfa")
                .short('d')
                .long("save-dfa")
                .help("Save a Graphviz rendering of the DFA obtained after Subset Construction")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("visualize")
                .short('v')
                .long("visualize")
                .help("Visualize the finite automaton inside an interactive window that allows for zooming, panning and clicking of elements")
                .value_name("NFA, DFA")
                .value_parser(PossibleValuesParser::new(["nfa", "dfa"]))
                .ignore_case(true)
                .num_args(1)
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Print the NFA as well, and the NFA states behind every DFA state")
                .action(ArgAction::SetTrue)
        )
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    env_logger::init();

    let mut command = build_command();
    let args = command.clone().get_matches();

    let Some(nfa_path) = args.get_one::<PathBuf>("file") else {
        // Usage goes to standard output and the run fails
        command.print_help()?;
        println!();
        return Ok(ExitCode::FAILURE);
    };

    let sentence = args
        .get_one::<String>("sentence")
        .map(String::as_str)
        .unwrap_or_default();

    let verbose = args.get_flag("verbose");

    let nfa = read_jflap_file(nfa_path)?;
    info!(
        "Read an automaton with {} states from {}",
        nfa.get_num_states(),
        nfa_path.display()
    );

    if verbose {
        println!("Non-deterministic automaton");
        println!("{}", nfa);
    }

    if args.get_flag("save-nfa") {
        nfa.show_fa("constructed_nfa")?;
    }

    let (dfa, subsets) = construct_dfa_with_subsets(&nfa)?;

    println!("Deterministic automaton");
    println!("{}", dfa);

    if verbose {
        for (state, subset) in subsets.iter().enumerate() {
            println!("DFA state {} = NFA states {:?}", state, subset);
        }
    }

    let simulator = construct_simulator(&dfa)?;
    let run = simulator.run(sentence);

    if run.is_accepted() {
        println!("Sentence {:?} accepted in state {}", sentence, run.get_final_state());
    } else {
        println!("Sentence {:?} rejected", sentence);
    }

    if simulate_nfa(&nfa, sentence) != run.is_accepted() {
        return Err(eyre!(
            "Conversion check failed: the NFA and the DFA disagree on {:?}",
            sentence
        ));
    }

    if args.get_flag("save-dfa") {
        dfa.show_fa("constructed_dfa")?;
    }

    if let Some(out_file_path) = args.get_one::<PathBuf>("output") {
        write_jflap_file(&dfa, out_file_path)?;
        println!("DFA written to {}", out_file_path.display());
    }

    if let Some(json_file_path) = args.get_one::<String>("json") {
        dfa.save_automaton(json_file_path)?;
        println!("DFA written to {}", json_file_path);
    }

    match args.get_one::<String>("visualize").map(|choice| choice.to_ascii_lowercase()) {
        Some(choice) if choice == "nfa" => visualize(&nfa)?,
        Some(choice) if choice == "dfa" => visualize(&dfa)?,
        _ => {}
    }

    Ok(ExitCode::SUCCESS)
}
