use ravdl::architecture::{build_layers, load_architecture};
use ravdl::graph::RecordingGraph;
use ravdl::optimizers::Adam;
use ravdl::wiring::{
    backward_layers, connect_layers, forward_layers, initialize_layers, persist_layers, summarize,
};
use std::env;
use std::error::Error;
use std::process;

// Dry run of an architecture file: wire the layers, declare one training step
// against a recording graph and print the summary.
//
// Usage: layer_summary <architecture.json> [--wire]
//   --wire  also print every declared op in the engine's JSON encoding

fn run(path: &str, print_wire: bool) -> Result<(), Box<dyn Error>> {
    let config = load_architecture(path)?;
    let mut layers = build_layers(&config)?;
    connect_layers(&mut layers, config.input_shape.clone())?;
    initialize_layers(&mut layers, &Adam::default())?;

    println!("{}", summarize(&layers)?);

    // One forward/backward declaration round.
    let mut graph = RecordingGraph::new();
    let input = graph.placeholder("input");
    forward_layers(&mut layers, &mut graph, &input, true)?;
    let loss_grad = graph.placeholder("loss_grad");
    backward_layers(&mut layers, &mut graph, &loss_grad)?;
    persist_layers(&layers, &mut graph)?;

    println!();
    println!("Declared ops: {}", graph.declarations().count());
    println!("Persisted nodes: {}", graph.persisted_names().count());

    if print_wire {
        println!("{}", serde_json::to_string_pretty(&graph.to_wire()?)?);
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let print_wire = args.iter().any(|arg| arg == "--wire");
    let path = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(path) => path,
        None => {
            eprintln!("Usage: layer_summary <architecture.json> [--wire]");
            process::exit(2);
        }
    };

    if let Err(err) = run(path, print_wire) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
