use std::collections::HashMap;

use crate::fa::Automaton;
use color_eyre::eyre::{eyre, Result};
use eframe::{run_native, App, CreationContext, NativeOptions};
use egui::Color32;
use egui_graphs::{
    DefaultGraphView, Graph, SettingsInteraction, SettingsNavigation, SettingsStyle,
};
use petgraph::{graph::EdgeIndex, graph::NodeIndex, prelude::StableGraph};

struct Visualizer {
    graph: Graph,
}

impl Visualizer {
    fn new(_: &CreationContext<'_>, graph: Graph) -> Self {
        Visualizer { graph }
    }
}

impl App for Visualizer {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let navigation_settings = &SettingsNavigation::new()
                .with_zoom_and_pan_enabled(true)
                .with_fit_to_screen_enabled(true);
            let interactive_settings = &SettingsInteraction::new()
                .with_dragging_enabled(true)
                .with_node_clicking_enabled(true)
                .with_node_selection_enabled(true)
                .with_node_selection_multi_enabled(true)
                .with_edge_clicking_enabled(true)
                .with_edge_selection_enabled(true)
                .with_edge_selection_multi_enabled(true);
            let style_settings = &SettingsStyle::default().with_labels_always(true);
            ui.add(
                &mut DefaultGraphView::new(&mut self.graph)
                    .with_styles(style_settings)
                    .with_interactions(interactive_settings)
                    .with_navigations(navigation_settings),
            );
        });
    }
}

/// Edge labels keyed by (from, to); parallel transitions are listed on a single edge
fn get_edge_labels(fa: &Automaton) -> HashMap<(usize, usize), String> {
    let mut edge_labels: HashMap<(usize, usize), String> = HashMap::new();

    for transition in fa.get_transitions() {
        edge_labels
            .entry((transition.from, transition.to))
            .and_modify(|label| {
                label.push_str(", ");
                label.push(transition.symbol);
            })
            .or_insert_with(|| transition.symbol.to_string());
    }

    edge_labels
}

fn generate_stable_graph(fa: &Automaton) -> Result<Graph> {
    let mut stable_graph = StableGraph::new();

    let num_states = fa.get_num_states();

    let start_node_color = Color32::from_rgb(20, 67, 130);
    let accept_node_color = Color32::from_rgb(20, 130, 90);

    let edge_labels = get_edge_labels(fa);
    let mut edge_map: HashMap<(usize, usize), EdgeIndex> = HashMap::new();

    // Add all nodes

    for _state_idx in 0..num_states {
        stable_graph.add_node(());
    }

    // Add one edge per pair of connected states

    for (from, to) in edge_labels.keys() {
        let edge_idx = stable_graph.add_edge(NodeIndex::new(*from), NodeIndex::new(*to), ());
        edge_map.insert((*from, *to), edge_idx);
    }

    let mut graph = Graph::from(&stable_graph);

    for state_idx in 0..num_states {
        let node = graph
            .node_mut(NodeIndex::new(state_idx))
            .ok_or_else(|| eyre!("State {} is missing from the graph", state_idx))?;

        node.set_label(format!("q{}", state_idx));

        if fa.is_accept_state(state_idx) {
            node.set_color(accept_node_color);
        }
        if state_idx == fa.get_start_state() {
            node.set_color(start_node_color);
        }
    }

    for (key, label) in edge_labels {
        let edge = edge_map
            .get(&key)
            .and_then(|edge_idx| graph.edge_mut(*edge_idx))
            .ok_or_else(|| eyre!("Edge {} -> {} is missing from the graph", key.0, key.1))?;

        edge.set_label(label);
    }

    Ok(graph)
}

/// Visualizes the finite automaton provided inside an interactive window
pub fn visualize(fa: &Automaton) -> Result<()> {
    fa.validate()?;

    let graph = generate_stable_graph(fa)?;
    run_native(
        "finite automata visualizer",
        NativeOptions::default(),
        Box::new(|cc| Ok(Box::new(Visualizer::new(cc, graph)))),
    )
    .map_err(|err| eyre!("Failed to open the visualizer: {}", err))
}
