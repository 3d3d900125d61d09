//! Integration tests for full circuit analysis.

use approx::assert_relative_eq;
use kirchhoff_core::circuit::{ElementRef, Fault};
use kirchhoff_core::topology::{filter_loops, BranchSet};
use kirchhoff_core::{dsl, Analysis, Analyzer, AnalyzerConfig, Circuit, Classification, KirchhoffError};

fn build(netlist: &str) -> Circuit {
    Circuit::from_ast(dsl::parse(netlist).unwrap()).unwrap()
}

fn analyze(circuit: &Circuit) -> Analysis {
    Analyzer::new().analyze(circuit).unwrap()
}

fn current(circuit: &Circuit, analysis: &Analysis, name: &str) -> Option<f64> {
    analysis.current(circuit.find(name).unwrap())
}

fn potential(circuit: &Circuit, analysis: &Analysis, terminal: &str) -> Option<f64> {
    analysis.terminal_potential(circuit.resolve_terminal(terminal).unwrap())
}

/// Check both Kirchhoff laws on a valid analysis.
fn assert_kirchhoff(analysis: &Analysis) {
    assert!(analysis.is_valid());
    for node in &analysis.nodes().nodes {
        let imbalance = analysis.node_imbalance(node.id).unwrap();
        assert_relative_eq!(imbalance, 0.0, epsilon = 1e-9);
    }
    for &id in analysis.eligible_loops() {
        let residual = analysis.loop_residual(id).unwrap();
        assert_relative_eq!(residual, 0.0, epsilon = 1e-9);
    }
}

const SERIES: &str = "\
# battery, closed switch and one resistor
BAT1 9
SW1 closed
R1 30
W1 BAT1.pos SW1.left
W2 SW1.right R1.left
W3 R1.right BAT1.neg
";

const PARALLEL: &str = "\
BAT1 12
R1 4
R2 6
W1 BAT1.pos R1.left
W2 R1.right BAT1.neg
W3 BAT1.pos R2.left
W4 R2.right BAT1.neg
";

/// Wheatstone bridge:
///
/// ```text
///          A (BAT1.pos)
///        /   \
///      R1     R3
///      /       \
///     C ---R5--- D
///      \       /
///      R2     R4
///        \   /
///          B (BAT1.neg)
/// ```
fn wheatstone(r1: f64, r2: f64, r3: f64, r4: f64) -> String {
    format!(
        "BAT1 10\n\
         R1 {r1}\nR2 {r2}\nR3 {r3}\nR4 {r4}\nR5 50\n\
         W1 BAT1.pos R1.left\n\
         W2 BAT1.pos R3.left\n\
         W3 R1.right R2.left\n\
         W4 R3.right R4.left\n\
         W5 R2.right BAT1.neg\n\
         W6 R4.right BAT1.neg\n\
         W7 R1.right R5.left\n\
         W8 R3.right R5.right\n"
    )
}

// ============ Scenarios ============

#[test]
fn test_series_loop() {
    let c = build(SERIES);
    let analysis = analyze(&c);

    assert_eq!(analysis.branches().len(), 1);
    assert_eq!(analysis.loops().len(), 1);
    assert_eq!(analysis.classification(), Classification::Basic);
    assert_kirchhoff(&analysis);

    assert_relative_eq!(current(&c, &analysis, "R1").unwrap(), 0.3, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "BAT1").unwrap(), 0.3, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "SW1").unwrap(), 0.3, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "W2").unwrap().abs(), 0.3, epsilon = 1e-9);

    assert_relative_eq!(potential(&c, &analysis, "BAT1.neg").unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(potential(&c, &analysis, "BAT1.pos").unwrap(), 9.0, epsilon = 1e-9);
    assert_relative_eq!(potential(&c, &analysis, "R1.left").unwrap(), 9.0, epsilon = 1e-9);
}

#[test]
fn test_parallel_resistors() {
    let c = build(PARALLEL);
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Parallel);
    assert_eq!(analysis.eligible_loops().len(), 2);
    assert_kirchhoff(&analysis);

    let i1 = current(&c, &analysis, "R1").unwrap();
    let i2 = current(&c, &analysis, "R2").unwrap();
    assert_relative_eq!(i1, 3.0, epsilon = 1e-9);
    assert_relative_eq!(i2, 2.0, epsilon = 1e-9);
    assert_relative_eq!(i1 / i2, 6.0 / 4.0, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "BAT1").unwrap(), 5.0, epsilon = 1e-9);

    let v1 = potential(&c, &analysis, "R1.left").unwrap() - potential(&c, &analysis, "R1.right").unwrap();
    let v2 = potential(&c, &analysis, "R2.left").unwrap() - potential(&c, &analysis, "R2.right").unwrap();
    assert_relative_eq!(v1, 12.0, epsilon = 1e-9);
    assert_relative_eq!(v2, v1, epsilon = 1e-9);

    // every pair of the three branches spans the same two nodes
    assert_eq!(analysis.relations().parallel.len(), 3);
}

#[test]
fn test_open_switch() {
    let c = build(&SERIES.replace("SW1 closed", "SW1 open"));
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::AllOpen);
    assert!(!analysis.is_valid());
    for name in ["BAT1", "SW1", "R1", "W1"] {
        assert_eq!(current(&c, &analysis, name), None);
    }
    for b in analysis.branches().iter() {
        assert_eq!(analysis.branch_current(b.id), None);
    }

    assert_eq!(potential(&c, &analysis, "BAT1.neg"), Some(0.0));
    assert_eq!(potential(&c, &analysis, "BAT1.pos"), Some(9.0));
}

#[test]
fn test_power_short() {
    let c = build("BAT1 9\nW1 BAT1.pos BAT1.neg\n");
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::PowerShort);
    assert!(!analysis.is_valid());
    assert!(analysis.loops()[0].resistance.is_short());
    assert_eq!(current(&c, &analysis, "BAT1"), None);
}

#[test]
fn test_shorted_source_beside_load() {
    let c = build(
        "BAT1 9\nR1 10\n\
         W1 BAT1.pos R1.left\nW2 R1.right BAT1.neg\nW3 BAT1.pos BAT1.neg\n",
    );
    let analysis = analyze(&c);
    assert_eq!(analysis.classification(), Classification::PowerShort);
}

#[test]
fn test_wheatstone_bridge() {
    let c = build(&wheatstone(100.0, 200.0, 200.0, 100.0));
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Bridge);
    assert_eq!(analysis.eligible_loops().len(), 4);
    assert_kirchhoff(&analysis);

    let bridges = analysis.bridges();
    assert_eq!(bridges.len(), 1);
    assert_eq!(analysis.bridge_elements(), vec![c.find("R5").unwrap()]);

    // C sits above D, so current runs C -> D through R5
    let i5 = current(&c, &analysis, "R5").unwrap();
    assert!(i5 > 0.0);

    // mirror the arms and the bridge current reverses
    let mirrored = build(&wheatstone(200.0, 100.0, 100.0, 200.0));
    let mirrored = analyze_named(&mirrored, "R5");
    assert_relative_eq!(mirrored, -i5, epsilon = 1e-9);
}

fn analyze_named(c: &Circuit, name: &str) -> f64 {
    current(c, &analyze(c), name).unwrap()
}

#[test]
fn test_balanced_bridge_carries_nothing() {
    let c = build(&wheatstone(100.0, 100.0, 100.0, 100.0));
    let analysis = analyze(&c);
    assert_eq!(analysis.classification(), Classification::Bridge);
    assert_relative_eq!(current(&c, &analysis, "R5").unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "BAT1").unwrap(), 0.1, epsilon = 1e-9);
}

// ============ Devices and faults ============

#[test]
fn test_potentiometer_divider() {
    let c = build(
        "BAT1 10\nPOT1 100 0.25\nVM1\n\
         W1 BAT1.pos POT1.left\nW2 POT1.right BAT1.neg\n\
         W3 VM1.right POT1.wiper\nW4 VM1.left POT1.right\n",
    );
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Series);
    assert_kirchhoff(&analysis);
    assert_relative_eq!(current(&c, &analysis, "BAT1").unwrap(), 0.1, epsilon = 1e-9);
    // two segments, no single current
    assert_eq!(current(&c, &analysis, "POT1"), None);
    assert_relative_eq!(current(&c, &analysis, "VM1").unwrap(), 0.0);

    let vm = c.find_device("VM1").unwrap();
    assert_relative_eq!(analysis.meter_reading(vm).unwrap(), 7.5, epsilon = 1e-9);
}

#[test]
fn test_ammeter_reading() {
    let c = build(
        "BAT1 6 r=1\nAM1\nR1 2\n\
         W1 BAT1.pos AM1.left\nW2 AM1.right R1.left\nW3 R1.right BAT1.neg\n",
    );
    let analysis = analyze(&c);
    assert_kirchhoff(&analysis);

    let am = c.find_device("AM1").unwrap();
    assert_relative_eq!(analysis.meter_reading(am).unwrap(), 2.0, epsilon = 1e-9);
    // internal resistance drops 2 V
    let v = potential(&c, &analysis, "BAT1.pos").unwrap() - potential(&c, &analysis, "BAT1.neg").unwrap();
    assert_relative_eq!(v, 4.0, epsilon = 1e-9);
}

#[test]
fn test_open_fault_removes_branch() {
    let mut c = build(PARALLEL);
    c.set_fault(c.find("R1").unwrap(), Fault::Open);
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Basic);
    assert_kirchhoff(&analysis);
    assert_relative_eq!(current(&c, &analysis, "R1").unwrap(), 0.0);
    assert_relative_eq!(current(&c, &analysis, "R2").unwrap(), 2.0, epsilon = 1e-9);
}

#[test]
fn test_short_fault_shorts_source() {
    let mut c = build(PARALLEL);
    c.set_fault(c.find("R2").unwrap(), Fault::Short);
    assert_eq!(analyze(&c).classification(), Classification::PowerShort);

    c.set_fault(c.find("R2").unwrap(), Fault::None);
    assert_eq!(analyze(&c).classification(), Classification::Parallel);
}

#[test]
fn test_no_source() {
    let c = build("R1 10\nR2 10\nW1 R1.left R2.left\nW2 R1.right R2.right\n");
    let analysis = analyze(&c);
    assert_eq!(analysis.classification(), Classification::None);
    assert!(!analysis.is_valid());
}

#[test]
fn test_opposing_sources_cancel() {
    let c = build(
        "BAT1 5\nBAT2 5\nR1 10\n\
         W1 BAT1.pos R1.left\nW2 R1.right BAT2.pos\nW3 BAT2.neg BAT1.neg\n",
    );
    let analysis = analyze(&c);
    // zero net EMF leaves every current at zero
    assert!(!analysis.is_valid());
    assert_eq!(current(&c, &analysis, "R1"), None);
}

#[test]
fn test_ideal_sources_on_separate_node_pairs() {
    // BAT1 and BAT2 share no node; only the resistors tie the two pairs together
    let c = build(
        "BAT1 10\nBAT2 5\nRA 10\nRB 10\nRC 10\nRD 10\n\
         W1 BAT1.pos RA.left\nW2 RA.right BAT2.pos\n\
         W3 BAT1.neg RB.left\nW4 RB.right BAT2.neg\n\
         W5 BAT1.pos RC.left\nW6 RC.right BAT2.neg\n\
         W7 BAT1.neg RD.left\nW8 RD.right BAT2.pos\n",
    );
    let analysis = analyze(&c);
    assert_kirchhoff(&analysis);
    let unknowns = analysis.branches().iter().filter(|b| b.index.is_some()).count();
    assert_eq!(unknowns, 4);
    assert_eq!(analysis.equations().len(), 4);

    // BAT2.neg settles 2.5 V above BAT1.neg
    let shift = potential(&c, &analysis, "BAT2.neg").unwrap() - potential(&c, &analysis, "BAT1.neg").unwrap();
    assert_relative_eq!(shift, 2.5, epsilon = 1e-9);

    assert_relative_eq!(current(&c, &analysis, "RA").unwrap(), 0.25, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "RB").unwrap(), -0.25, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "RC").unwrap(), 0.75, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "RD").unwrap(), -0.75, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "BAT1").unwrap(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "BAT2").unwrap(), 0.5, epsilon = 1e-9);
}

#[test]
fn test_wide_resistance_spread() {
    let c = build(&PARALLEL.replace("BAT1 12", "BAT1 1").replace("R1 4", "R1 1m").replace("R2 6", "R2 10M"));
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Parallel);
    assert!(analysis.is_valid());
    assert_relative_eq!(current(&c, &analysis, "R1").unwrap(), 1e3, max_relative = 1e-9);
    assert_relative_eq!(current(&c, &analysis, "R2").unwrap(), 1e-7, max_relative = 1e-9);
}

#[test]
fn test_tiny_current_is_still_a_current() {
    let c = build("BAT1 1\nR1 10G\nW1 BAT1.pos R1.left\nW2 R1.right BAT1.neg\n");
    let analysis = analyze(&c);

    assert_eq!(analysis.classification(), Classification::Basic);
    assert!(analysis.is_valid());
    assert_relative_eq!(current(&c, &analysis, "R1").unwrap(), 1e-10, max_relative = 1e-9);
    assert_relative_eq!(potential(&c, &analysis, "BAT1.pos").unwrap(), 1.0, epsilon = 1e-9);
}

// ============ Properties ============

#[test]
fn test_analysis_is_idempotent() {
    let c = build(&wheatstone(120.0, 330.0, 470.0, 68.0));
    let first = analyze(&c);
    let second = analyze(&c);

    let currents = |a: &Analysis| a.branches().iter().map(|b| a.branch_current(b.id)).collect::<Vec<_>>();
    let potentials = |a: &Analysis| a.nodes().nodes.iter().map(|n| n.potential).collect::<Vec<_>>();
    assert_eq!(currents(&first), currents(&second));
    assert_eq!(potentials(&first), potentials(&second));
    assert_eq!(first.classification(), second.classification());
}

#[test]
fn test_filter_is_fixed_point() {
    let c = build(&wheatstone(120.0, 330.0, 470.0, 68.0));
    let analysis = analyze(&c);

    let mut loops = analysis.loops().to_vec();
    let mut branches = analysis.branches().clone();
    let outcome = filter_loops(&mut loops, &mut branches);

    assert_eq!(outcome.eligible, analysis.eligible_loops());
    assert_eq!(&outcome.relations, analysis.relations());
    let valid = |set: &BranchSet| set.iter().map(|b| b.valid).collect::<Vec<_>>();
    assert_eq!(valid(&branches), valid(analysis.branches()));
}

#[test]
fn test_equation_count_matches_unknowns() {
    let c = build(&wheatstone(120.0, 330.0, 470.0, 68.0));
    let analysis = analyze(&c);
    let unknowns = analysis.branches().iter().filter(|b| b.index.is_some()).count();
    assert_eq!(unknowns, 5);
    assert_eq!(analysis.equations().len(), unknowns);
}

// ============ Configuration ============

#[test]
fn test_loop_cap_is_fatal() {
    let c = build(&wheatstone(100.0, 200.0, 200.0, 100.0));
    let analyzer = Analyzer::with_config(AnalyzerConfig::new().with_max_loops(2));
    let err = analyzer.analyze(&c).unwrap_err();
    assert!(matches!(err, KirchhoffError::TooManyLoops { limit: 2 }));
    assert!(err.is_fatal_topology());
}

#[test]
fn test_netlist_options() {
    let ast = dsl::parse(".option max_loops=3 max_depth=10\nBAT1 1\nR1 1\nW1 BAT1.pos R1.left\nW2 R1.right BAT1.neg\n")
        .unwrap();
    let config = AnalyzerConfig::new().apply_options(&ast.options).unwrap();
    assert_eq!(config.max_loops, 3);
    assert_eq!(config.max_depth, 10);

    let c = Circuit::from_ast(ast).unwrap();
    let analysis = Analyzer::with_config(config).analyze(&c).unwrap();
    assert_relative_eq!(analysis.current(ElementRef::Device(c.find_device("R1").unwrap())).unwrap(), 1.0);
}

#[test]
fn test_toggle_and_reanalyze() {
    let mut c = build(SERIES);
    let sw = c.find_device("SW1").unwrap();
    assert!(analyze(&c).is_valid());

    assert!(c.toggle_switch(sw));
    assert_eq!(analyze(&c).classification(), Classification::AllOpen);

    assert!(c.toggle_switch(sw));
    let analysis = analyze(&c);
    assert!(analysis.is_valid());
    assert_relative_eq!(current(&c, &analysis, "R1").unwrap(), 0.3, epsilon = 1e-9);
}
