/* Reader and writer for the JFLAP (.jff) description of a finite automaton. Only the parts of the
 * format that describe the automaton are interpreted: states with their initial and final marks,
 * and transitions with their from, to and read elements. Layout and labels are skipped on input
 * and synthesized on output. */

use crate::fa::{Automaton, Transition};
use color_eyre::eyre::{Report, Result};
use std::f64::consts::PI;
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// List of possible errors while reading or writing JFLAP files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JflapError {
    /// The file to read could not be opened
    UnopenableSource(String),
    /// The file to write could not be created or written
    UnwritableSink(String),
    /// The document is not well formed or not a finite automaton
    MalformedDocument(String),
    /// The document has no transition element
    MissingTransitions,
    /// A state id could not be read as a number
    InvalidStateId(String),
    /// Two states share an id
    DuplicateState(usize),
    /// No state is marked initial
    MissingStartState,
    /// More than one state is marked initial
    MultipleStartStates(usize, usize),
    /// The state ids do not form the range 0..number of states, the first missing id is given
    NonContiguousStates(usize),
    /// A transition reads nothing (from, to)
    EpsilonTransition(usize, usize),
    /// A transition reads more than one character
    InvalidSymbol(String),
}

impl fmt::Display for JflapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JflapError::UnopenableSource(path) => {
                write!(f, "Error: Can't open the jff file {}!", path)
            }
            JflapError::UnwritableSink(path) => {
                write!(f, "Error: Can't write the jff file {}!", path)
            }
            JflapError::MalformedDocument(reason) => {
                write!(f, "Error: Malformed jff document: {}", reason)
            }
            JflapError::MissingTransitions => {
                write!(f, "Error: The jff document has no <transition> element!")
            }
            JflapError::InvalidStateId(id) => write!(f, "Error: Invalid state id {:?}!", id),
            JflapError::DuplicateState(id) => {
                write!(f, "Error: State {} is declared more than once!", id)
            }
            JflapError::MissingStartState => write!(f, "Error: No state is marked <initial/>!"),
            JflapError::MultipleStartStates(first, second) => write!(
                f,
                "Error: States {} and {} are both marked <initial/>!",
                first, second
            ),
            JflapError::NonContiguousStates(missing) => write!(
                f,
                "Error: State ids must be numbered without gaps, state {} is missing!",
                missing
            ),
            JflapError::EpsilonTransition(from, to) => write!(
                f,
                "Error: The transition from {} to {} reads the empty string!",
                from, to
            ),
            JflapError::InvalidSymbol(symbol) => write!(
                f,
                "Error: Transitions must read exactly one character, found {:?}!",
                symbol
            ),
        }
    }
}

impl std::error::Error for JflapError {}

/// One piece of markup or text
#[derive(Debug, PartialEq, Eq)]
enum Node<'a> {
    Open(&'a str, &'a str), // Name and the attribute text
    Close(&'a str),
    Empty(&'a str, &'a str),
    Text(&'a str),
}

fn malformed(reason: impl Into<String>) -> JflapError {
    JflapError::MalformedDocument(reason.into())
}

fn split_tag(tag: &str) -> (&str, &str) {
    match tag.find(char::is_whitespace) {
        Some(idx) => (&tag[..idx], &tag[idx..]),
        None => (tag, ""),
    }
}

/// Split the document into tags and text, dropping comments, processing instructions and
/// declarations.
fn tokenize(document: &str) -> Result<Vec<Node<'_>>, JflapError> {
    let mut nodes = Vec::new();
    let mut rest = document;

    while !rest.is_empty() {
        let Some(tag_start) = rest.find('<') else {
            nodes.push(Node::Text(rest));
            break;
        };

        if tag_start > 0 {
            nodes.push(Node::Text(&rest[..tag_start]));
        }
        rest = &rest[tag_start..];

        let terminator = if rest.starts_with("<!--") {
            "-->"
        } else if rest.starts_with("<?") {
            "?>"
        } else {
            ">"
        };

        let Some(tag_len) = rest.find(terminator) else {
            return Err(malformed("unterminated markup at the end of the document"));
        };

        let tag = &rest[1..tag_len];
        rest = &rest[tag_len + terminator.len()..];

        if tag.starts_with('!') || tag.starts_with('?') {
            continue;
        }

        if let Some(name) = tag.strip_prefix('/') {
            nodes.push(Node::Close(name.trim()));
        } else if let Some(tag) = tag.strip_suffix('/') {
            let (name, attributes) = split_tag(tag.trim());
            nodes.push(Node::Empty(name, attributes));
        } else {
            let (name, attributes) = split_tag(tag.trim());
            nodes.push(Node::Open(name, attributes));
        }

        if nodes.last().is_some_and(|node| {
            matches!(node, Node::Open("", _) | Node::Close("") | Node::Empty("", _))
        }) {
            return Err(malformed("tag without a name"));
        }
    }

    Ok(nodes)
}

fn get_attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", name);
    let mut search_from = 0;

    // The attribute name must not be the tail of a longer name
    while let Some(idx) = attributes[search_from..].find(&pattern) {
        let start = search_from + idx;
        let preceded_by_space = attributes[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);

        if preceded_by_space {
            let value_start = start + pattern.len();
            let value_len = attributes[value_start..].find('"')?;
            return Some(&attributes[value_start..value_start + value_len]);
        }
        search_from = start + pattern.len();
    }
    None
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn encode_entities(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn parse_state_id(text: &str) -> Result<usize, JflapError> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| JflapError::InvalidStateId(text.to_string()))
}

#[derive(Default)]
struct StateEntry {
    id: usize,
    initial: bool,
    accept: bool,
}

#[derive(Default)]
struct TransitionEntry {
    from: Option<String>,
    to: Option<String>,
    read: Option<String>,
}

/// Parse the text of a JFLAP document into an automaton. Nothing is built unless the whole
/// document is valid.
pub fn parse_jflap(document: &str) -> Result<Automaton> {
    let nodes = tokenize(document)?;

    let mut open_elements: Vec<&str> = Vec::new();
    let mut states: Vec<StateEntry> = Vec::new();
    let mut transitions: Vec<TransitionEntry> = Vec::new();
    let mut current_state: Option<StateEntry> = None;
    let mut current_transition: Option<TransitionEntry> = None;
    let mut automaton_type: Option<String> = None;

    for node in nodes {
        match node {
            Node::Open(name, attributes) => {
                match name {
                    "state" => {
                        let id = get_attribute(attributes, "id")
                            .ok_or_else(|| malformed("<state> without an id"))?;
                        current_state = Some(StateEntry {
                            id: parse_state_id(id)?,
                            ..Default::default()
                        });
                    }
                    "transition" => current_transition = Some(TransitionEntry::default()),
                    _ => {}
                }
                open_elements.push(name);
            }
            Node::Empty(name, attributes) => match (name, current_state.as_mut(), current_transition.as_mut()) {
                ("state", _, _) => {
                    let id = get_attribute(attributes, "id")
                        .ok_or_else(|| malformed("<state> without an id"))?;
                    states.push(StateEntry {
                        id: parse_state_id(id)?,
                        ..Default::default()
                    });
                }
                ("initial", Some(state), _) => state.initial = true,
                ("final", Some(state), _) => state.accept = true,
                ("read", _, Some(transition)) => transition.read = Some(String::new()),
                ("transition", _, _) => transitions.push(TransitionEntry::default()),
                _ => {}
            },
            Node::Text(text) => {
                let element = open_elements.last().copied();
                match (element, current_transition.as_mut()) {
                    (Some("from"), Some(transition)) => {
                        transition.from = Some(text.to_string())
                    }
                    (Some("to"), Some(transition)) => transition.to = Some(text.to_string()),
                    (Some("read"), Some(transition)) => {
                        transition.read = Some(decode_entities(text))
                    }
                    (Some("type"), _) => automaton_type = Some(text.trim().to_string()),
                    _ => {}
                }
            }
            Node::Close(name) => {
                match open_elements.pop() {
                    Some(open) if open == name => {}
                    Some(open) => {
                        return Err(Report::new(malformed(format!(
                            "</{}> closes <{}>",
                            name, open
                        ))))
                    }
                    None => {
                        return Err(Report::new(malformed(format!(
                            "</{}> without a matching opening tag",
                            name
                        ))))
                    }
                }
                match name {
                    "state" => states.extend(current_state.take()),
                    "transition" => transitions.extend(current_transition.take()),
                    _ => {}
                }
            }
        }
    }

    if let Some(open) = open_elements.pop() {
        return Err(Report::new(malformed(format!("<{}> is never closed", open))));
    }

    if let Some(automaton_type) = automaton_type {
        if automaton_type != "fa" {
            return Err(Report::new(malformed(format!(
                "expected a finite automaton, found type {}",
                automaton_type
            ))));
        }
    }

    if states.is_empty() {
        return Err(Report::new(malformed("the document declares no states")));
    }

    if transitions.is_empty() {
        return Err(Report::new(JflapError::MissingTransitions));
    }

    let start_state = get_start_state(&states)?;
    check_state_ids(&mut states)?;

    let accept_states: Vec<usize> = states
        .iter()
        .filter(|state| state.accept)
        .map(|state| state.id)
        .collect();

    let transitions = transitions
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| build_transition(idx, entry))
        .collect::<Result<Vec<Transition>, JflapError>>()?;

    let automaton = Automaton::from_parts(states.len(), start_state, accept_states, transitions)?;

    Ok(automaton)
}

fn get_start_state(states: &[StateEntry]) -> Result<usize, JflapError> {
    let mut initial_states = states.iter().filter(|state| state.initial);

    match (initial_states.next(), initial_states.next()) {
        (None, _) => Err(JflapError::MissingStartState),
        (Some(first), Some(second)) => Err(JflapError::MultipleStartStates(first.id, second.id)),
        (Some(start), None) => Ok(start.id),
    }
}

// Ids must be exactly 0..number of states
fn check_state_ids(states: &mut [StateEntry]) -> Result<(), JflapError> {
    states.sort_by_key(|state| state.id);

    for pair in states.windows(2) {
        if pair[0].id == pair[1].id {
            return Err(JflapError::DuplicateState(pair[0].id));
        }
    }

    for (expected, state) in states.iter().enumerate() {
        if state.id != expected {
            return Err(JflapError::NonContiguousStates(expected));
        }
    }

    Ok(())
}

fn build_transition(idx: usize, entry: TransitionEntry) -> Result<Transition, JflapError> {
    let from = entry
        .from
        .ok_or_else(|| malformed(format!("transition {} has no <from>", idx + 1)))?;
    let to = entry
        .to
        .ok_or_else(|| malformed(format!("transition {} has no <to>", idx + 1)))?;

    let from = parse_state_id(&from)?;
    let to = parse_state_id(&to)?;

    let read = entry.read.unwrap_or_default();
    let mut symbols = read.chars();

    match (symbols.next(), symbols.next()) {
        (None, _) => Err(JflapError::EpsilonTransition(from, to)),
        (Some(symbol), None) => Ok(Transition::new(from, symbol, to)),
        (Some(_), Some(_)) => Err(JflapError::InvalidSymbol(read)),
    }
}

/// Read a JFLAP file describing a finite automaton
pub fn read_jflap_file<P: AsRef<Path>>(file_path: P) -> Result<Automaton> {
    let file_path = file_path.as_ref();

    let document = match fs::read_to_string(file_path) {
        Ok(document) => document,
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            let err = JflapError::MalformedDocument(format!(
                "{} is not valid UTF-8",
                file_path.display()
            ));
            return Err(Report::new(err));
        }
        Err(_) => {
            let err = JflapError::UnopenableSource(file_path.display().to_string());
            return Err(Report::new(err));
        }
    };

    parse_jflap(&document)
}

/// Display adapter rendering an automaton as a JFLAP document. States are laid out on a circle,
/// so the same automaton always produces the same file.
pub struct JflapDocument<'a>(pub &'a Automaton);

fn get_state_position(state_id: usize, num_states: usize) -> (f64, f64) {
    let radius = 60.0 + 30.0 * num_states as f64;
    let angle = 2.0 * PI * state_id as f64 / num_states as f64;
    let centre = radius + 50.0;

    (centre + radius * angle.cos(), centre + radius * angle.sin())
}

impl fmt::Display for JflapDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let automaton = self.0;
        let num_states = automaton.get_num_states();

        writeln!(
            f,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?><!--Created with automata-convert.--><structure>"
        )?;
        writeln!(f, "\t<type>fa</type>")?;
        writeln!(f, "\t<automaton>")?;
        writeln!(f, "\t\t<!--The list of states.-->")?;

        for state_id in 0..num_states {
            let (x, y) = get_state_position(state_id, num_states);

            writeln!(f, "\t\t<state id=\"{}\" name=\"q{}\">", state_id, state_id)?;
            writeln!(f, "\t\t\t<x>{:.1}</x>", x)?;
            writeln!(f, "\t\t\t<y>{:.1}</y>", y)?;
            if state_id == automaton.get_start_state() {
                writeln!(f, "\t\t\t<initial/>")?;
            }
            if automaton.is_accept_state(state_id) {
                writeln!(f, "\t\t\t<final/>")?;
            }
            writeln!(f, "\t\t</state>")?;
        }

        writeln!(f, "\t\t<!--The list of transitions.-->")?;

        for transition in automaton.get_transitions() {
            writeln!(f, "\t\t<transition>")?;
            writeln!(f, "\t\t\t<from>{}</from>", transition.from)?;
            writeln!(f, "\t\t\t<to>{}</to>", transition.to)?;
            writeln!(
                f,
                "\t\t\t<read>{}</read>",
                encode_entities(&transition.symbol.to_string())
            )?;
            writeln!(f, "\t\t</transition>")?;
        }

        writeln!(f, "\t</automaton>")?;
        write!(f, "</structure>")
    }
}

/// Render an automaton as a JFLAP document
pub fn to_jflap(automaton: &Automaton) -> String {
    JflapDocument(automaton).to_string()
}

/// Write an automaton to a JFLAP file
pub fn write_jflap_file<P: AsRef<Path>>(automaton: &Automaton, file_path: P) -> Result<()> {
    let file_path = file_path.as_ref();
    let sink_error = || Report::new(JflapError::UnwritableSink(file_path.display().to_string()));

    let mut file = File::create(file_path).map_err(|_| sink_error())?;

    writeln!(file, "{}", JflapDocument(automaton)).map_err(|_| sink_error())?;

    Ok(())
}
