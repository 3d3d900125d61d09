//! Kirchhoff - DC circuit analyzer
//!
//! Reads a netlist, finds the circuit's loops and reports currents,
//! potentials, meter readings and faults.
//!
//! # Usage
//!
//! ```bash
//! kirchhoff bridge.cir --max-loops 20 --verbose
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use kirchhoff_core::{
    circuit::{Circuit, DeviceId, ElementRef, TerminalId, WireId},
    dsl,
    error::Result,
    Analysis, Analyzer, AnalyzerConfig,
};

/// DC circuit analyzer based on Kirchhoff's laws
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Cap on branch and loop discovery depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Cap on the number of distinct loops
    #[arg(long)]
    max_loops: Option<usize>,

    /// Numeric tolerance
    #[arg(long)]
    epsilon: Option<f64>,

    /// Log per-stage details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let ast = dsl::parse_file(&args.netlist)?;

    // Defaults, then netlist options, then flags
    let mut config = AnalyzerConfig::new().apply_options(&ast.options)?;
    if let Some(depth) = args.max_depth {
        config = config.with_max_depth(depth);
    }
    if let Some(loops) = args.max_loops {
        config = config.with_max_loops(loops);
    }
    if let Some(epsilon) = args.epsilon {
        config = config.with_epsilon(epsilon);
    }

    let circuit = Circuit::from_ast(ast)?;
    let analysis = Analyzer::with_config(config).analyze(&circuit)?;
    print_report(&circuit, &analysis);
    Ok(())
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.6} {}", v, unit),
        None => "unknown".to_string(),
    }
}

fn print_report(circuit: &Circuit, analysis: &Analysis) {
    println!("classification: {}", analysis.classification());
    println!("valid: {}", analysis.is_valid());

    println!("\ncurrents:");
    let devices = (0..circuit.devices.len()).map(|i| ElementRef::Device(DeviceId(i)));
    let wires = (0..circuit.wires.len()).map(|i| ElementRef::Wire(WireId(i)));
    for element in devices.chain(wires) {
        println!(
            "  {:<12} {}",
            circuit.element_name(element),
            format_value(analysis.current(element), "A")
        );
    }

    println!("\npotentials:");
    for t in 0..circuit.terminals.len() {
        let terminal = TerminalId(t);
        println!(
            "  {:<16} {}",
            circuit.terminal_label(terminal),
            format_value(analysis.terminal_potential(terminal), "V")
        );
    }

    let meters: Vec<_> = circuit
        .devices
        .iter()
        .enumerate()
        .filter(|(_, d)| matches!(d.kind(), "ammeter" | "voltmeter"))
        .collect();
    if !meters.is_empty() {
        println!("\nmeters:");
        for (i, device) in meters {
            let unit = if device.kind() == "ammeter" { "A" } else { "V" };
            let reading = analysis.meter_reading(DeviceId(i));
            println!("  {:<12} {}", device.name(), format_value(reading, unit));
        }
    }

    let bridges = analysis.bridge_elements();
    if !bridges.is_empty() {
        let names: Vec<&str> = bridges.iter().map(|e| circuit.element_name(*e)).collect();
        println!("\nbridge: {}", names.join(", "));
    }
}
