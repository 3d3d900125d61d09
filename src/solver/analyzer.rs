//! Main analyzer interface.

use std::collections::HashMap;

use crate::circuit::{
    validate_circuit, BranchId, Circuit, DeviceId, ElementRef, LoopId, NodeId, SegmentId, TerminalId,
};
use crate::components::{Device, Voltmeter};
use crate::error::{KirchhoffError, Result};
use crate::topology::{
    assemble_segments, filter_loops, find_branches, find_loops, merge_nodes, BranchSet, Loop, LoopLimits, NodeMap,
    Relations, Segment,
};

use super::classify::{bridge_branches, classify, Classification};
use super::equations::{build_equations, index_branches, Equation};
use super::linear::EquationSystem;
use super::potentials::{propagate_potentials, reference_node, seed_open_circuit};
use super::propagate::{assign_branch_currents, balance_branch_currents, segment_currents};
use super::{DEFAULT_EPSILON, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LOOPS, DEFAULT_MAX_PASSES};

/// Configuration for the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Cap on branch discovery generations and partial loop length.
    pub max_depth: usize,
    /// Cap on distinct discovered loops.
    pub max_loops: usize,
    /// Tolerance for zero pivots, row relatedness and all-zero solutions.
    pub epsilon: f64,
    /// Pass limit for current and potential propagation.
    pub max_propagation_passes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_loops: DEFAULT_MAX_LOOPS,
            epsilon: DEFAULT_EPSILON,
            max_propagation_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl AnalyzerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery depth cap.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the loop count cap.
    pub fn with_max_loops(mut self, max_loops: usize) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Set the numeric tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the propagation pass limit.
    pub fn with_max_propagation_passes(mut self, passes: usize) -> Self {
        self.max_propagation_passes = passes;
        self
    }

    /// Apply `.option` values from a netlist.
    pub fn apply_options(mut self, options: &HashMap<String, f64>) -> Result<Self> {
        let mut keys: Vec<&String> = options.keys().collect();
        keys.sort();

        for key in keys {
            let value = options[key];
            match key.as_str() {
                "max_depth" => self.max_depth = count_option(key, value)?,
                "max_loops" => self.max_loops = count_option(key, value)?,
                "max_passes" | "max_propagation_passes" => {
                    self.max_propagation_passes = count_option(key, value)?
                }
                "epsilon" => {
                    if !(value.is_finite() && value > 0.0) {
                        return Err(KirchhoffError::invalid_parameter(
                            ".option",
                            key,
                            "must be a positive number",
                        ));
                    }
                    self.epsilon = value;
                }
                _ => {
                    return Err(KirchhoffError::invalid_parameter(".option", key, "unknown option"));
                }
            }
        }
        Ok(self)
    }
}

fn count_option(key: &str, value: f64) -> Result<usize> {
    if value.is_finite() && value >= 1.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(KirchhoffError::invalid_parameter(
            ".option",
            key,
            "must be a positive integer",
        ))
    }
}

/// Runs the full analysis pipeline over a circuit.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an analyzer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with custom configuration.
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze the circuit from scratch.
    ///
    /// Fails only on invalid input or when discovery exceeds the configured
    /// caps. A circuit that cannot be solved still yields an [`Analysis`],
    /// marked invalid.
    pub fn analyze(&self, circuit: &Circuit) -> Result<Analysis> {
        let cfg = &self.config;
        validate_circuit(circuit)?;

        let mut nodes = merge_nodes(circuit);
        let segments = assemble_segments(circuit, &nodes)?;
        let mut branches = find_branches(&segments, nodes.len(), cfg.max_depth)?;
        let limits = LoopLimits {
            max_depth: cfg.max_depth,
            max_loops: cfg.max_loops,
        };
        let mut loops = find_loops(&segments, &branches, limits)?;
        let outcome = filter_loops(&mut loops, &mut branches);

        for b in branches.iter() {
            nodes.node_mut(b.start).branches.push(b.id);
            if !b.is_ring() {
                nodes.node_mut(b.end).branches.push(b.id);
            }
        }

        log::debug!(
            "topology: {} nodes, {} segments, {} branches, {} loops ({} eligible)",
            nodes.len(),
            segments.len(),
            branches.len(),
            loops.len(),
            outcome.eligible.len()
        );

        let classification = classify(&loops, &outcome, &branches, &segments, cfg.epsilon);
        log::debug!("classification: {}", classification);

        let mut equations = Vec::new();
        let mut currents = vec![None; segments.len()];
        let mut valid = false;

        if classification == Classification::AllOpen {
            seed_open_circuit(&mut nodes, &segments, cfg.max_propagation_passes);
        } else if classification.is_solvable() {
            let unknowns = index_branches(&mut branches, &loops, &outcome.eligible);
            equations = build_equations(&branches, &loops, &outcome.eligible, &nodes, unknowns, cfg.epsilon);

            if let Some(solution) = solve(&equations, unknowns, cfg.epsilon) {
                assign_branch_currents(&mut branches, &solution);
                balance_branch_currents(&mut branches, &nodes, cfg.max_propagation_passes);
                currents = segment_currents(circuit, &segments, &branches, cfg.max_propagation_passes);

                if let Some(reference) = reference_node(&nodes, &branches) {
                    propagate_potentials(
                        &mut nodes,
                        &segments,
                        &branches,
                        &loops,
                        &outcome.eligible,
                        &currents,
                        reference,
                        cfg.max_propagation_passes,
                    );
                }
                valid = true;
            }
        }

        if !valid {
            for b in branches.branches.iter_mut() {
                b.current = None;
            }
            if classification != Classification::AllOpen {
                for node in nodes.nodes.iter_mut() {
                    node.potential = None;
                }
            }
        }

        let mut analysis = Analysis {
            nodes,
            segments,
            branches,
            loops,
            equations,
            eligible: outcome.eligible,
            relations: outcome.relations,
            classification,
            valid,
            segment_currents: currents,
            element_currents: HashMap::new(),
            meter_readings: HashMap::new(),
        };
        analysis.read_elements(circuit);
        Ok(analysis)
    }
}

/// Solve the accepted rows. `None` when the system is not square, is
/// singular, or yields no current anywhere. "No current" is judged against
/// the currents the constants themselves imply, not an absolute floor.
fn solve(equations: &[Equation], unknowns: usize, epsilon: f64) -> Option<Vec<f64>> {
    let Some(mut system) = EquationSystem::from_equations(equations, unknowns, epsilon) else {
        log::warn!(
            "{} independent equations for {} unknown currents",
            equations.len(),
            unknowns
        );
        return None;
    };
    let floor = epsilon * system.current_scale();
    let solution = match system.solve(epsilon) {
        Ok(x) => x.to_vec(),
        Err(e) => {
            log::warn!("{}", e);
            return None;
        }
    };
    if solution.iter().all(|x| x.abs() <= floor) {
        log::warn!("solved currents are all zero");
        return None;
    }
    Some(solution)
}

/// Result of one analysis pass.
///
/// `None` is the undetermined value for every current and potential. An
/// invalid analysis reports no currents at all.
#[derive(Debug, Clone)]
pub struct Analysis {
    nodes: NodeMap,
    segments: Vec<Segment>,
    branches: BranchSet,
    loops: Vec<Loop>,
    equations: Vec<Equation>,
    eligible: Vec<LoopId>,
    relations: Relations,
    classification: Classification,
    valid: bool,
    segment_currents: Vec<Option<f64>>,
    /// Current through single-segment elements, first terminal to second
    element_currents: HashMap<ElementRef, Option<f64>>,
    meter_readings: HashMap<DeviceId, Option<f64>>,
}

impl Analysis {
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Currents and potentials were determined.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn branches(&self) -> &BranchSet {
        &self.branches
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    /// Accepted equations in the order they were accepted.
    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn eligible_loops(&self) -> &[LoopId] {
        &self.eligible
    }

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Bridge branches, empty unless the circuit is classified as a bridge.
    pub fn bridges(&self) -> Vec<BranchId> {
        if self.classification == Classification::Bridge {
            bridge_branches(&self.branches, &self.segments)
        } else {
            Vec::new()
        }
    }

    /// Elements lying on bridge branches, without repeats.
    pub fn bridge_elements(&self) -> Vec<ElementRef> {
        let mut elements = Vec::new();
        for id in self.bridges() {
            for step in &self.branches.get(id).steps {
                elements.push(self.segments[step.segment.0].element);
            }
        }
        elements.sort();
        elements.dedup();
        elements
    }

    /// Current through a device or wire, from its first terminal to its
    /// second. `None` for elements made of several segments.
    pub fn current(&self, element: ElementRef) -> Option<f64> {
        if !self.valid {
            return None;
        }
        self.element_currents.get(&element).copied().unwrap_or(Some(0.0))
    }

    /// Current through a segment from its `a` to its `b` terminal.
    pub fn segment_current(&self, segment: SegmentId) -> Option<f64> {
        if !self.valid {
            return None;
        }
        self.segment_currents.get(segment.0).copied().flatten()
    }

    /// Current along a branch from its start node to its end node.
    pub fn branch_current(&self, branch: BranchId) -> Option<f64> {
        if !self.valid {
            return None;
        }
        self.branches.branches.get(branch.0).and_then(|b| b.current)
    }

    pub fn node_potential(&self, node: NodeId) -> Option<f64> {
        self.nodes.nodes.get(node.0).and_then(|n| n.potential)
    }

    pub fn terminal_potential(&self, terminal: TerminalId) -> Option<f64> {
        self.node_potential(self.nodes.node_of(terminal))
    }

    /// Ammeter current or voltmeter voltage. `None` for other devices.
    pub fn meter_reading(&self, device: DeviceId) -> Option<f64> {
        self.meter_readings.get(&device).copied().flatten()
    }

    /// Net current into a node over its valid branches.
    pub fn node_imbalance(&self, node: NodeId) -> Option<f64> {
        let mut net = 0.0;
        for b in self.branches.incident(node).filter(|b| b.valid && !b.is_ring()) {
            let i = self.branch_current(b.id)?;
            net += if b.end == node { i } else { -i };
        }
        Some(net)
    }

    /// IR drops minus EMF around a loop.
    pub fn loop_residual(&self, id: LoopId) -> Option<f64> {
        let l = self.loops.get(id.0)?;
        let mut residual = 0.0;
        for step in &l.steps {
            let b = self.branches.get(step.branch);
            let sign = if step.forward { 1.0 } else { -1.0 };
            let drop = b.resistance.drop_for(self.branch_current(b.id)?)?;
            residual += sign * (drop - b.emf);
        }
        Some(residual)
    }

    fn read_elements(&mut self, circuit: &Circuit) {
        let mut by_element: HashMap<ElementRef, Vec<&Segment>> = HashMap::new();
        for s in &self.segments {
            by_element.entry(s.element).or_default().push(s);
        }

        for (element, segments) in by_element {
            let current = match segments.as_slice() {
                [s] => {
                    let forward = match element {
                        ElementRef::Device(_) => circuit.terminal(s.a).key < circuit.terminal(s.b).key,
                        ElementRef::Wire(w) => circuit.wire(w).ends[0] == Some(s.a),
                    };
                    self.segment_currents[s.id.0].map(|i| if forward { i } else { -i })
                }
                _ => None,
            };
            self.element_currents.insert(element, current);
        }

        for (index, device) in circuit.devices.iter().enumerate() {
            let id = DeviceId(index);
            let reading = match device {
                Device::Ammeter(_) => self.current(ElementRef::Device(id)),
                Device::Voltmeter(_) => {
                    let v = |key| {
                        circuit
                            .terminal_of(id, key)
                            .ok()
                            .and_then(|t| self.terminal_potential(t))
                    };
                    match (v(Voltmeter::POSITIVE), v(Voltmeter::NEGATIVE)) {
                        (Some(pos), Some(neg)) => Some(pos - neg),
                        _ => None,
                    }
                }
                _ => continue,
            };
            self.meter_readings.insert(id, reading);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ammeter, Battery, Resistor, Switch};
    use approx::assert_relative_eq;

    fn wire(c: &mut Circuit, name: &str, a: &str, b: &str) {
        let a = c.resolve_terminal(a).unwrap();
        let b = c.resolve_terminal(b).unwrap();
        c.connect(name, a, b).unwrap();
    }

    /// BAT1 (9 V) -> SW1 -> AM1 -> R1 (10) -> R2 (20) -> BAT1
    fn series_circuit() -> Circuit {
        let mut c = Circuit::new();
        c.add_device(Device::Battery(Battery::new("BAT1", 9.0))).unwrap();
        c.add_device(Device::Switch(Switch::new("SW1", true))).unwrap();
        c.add_device(Device::Ammeter(Ammeter::new("AM1"))).unwrap();
        c.add_device(Device::Resistor(Resistor::new("R1", 10.0))).unwrap();
        c.add_device(Device::Resistor(Resistor::new("R2", 20.0))).unwrap();
        c.add_device(Device::Voltmeter(Voltmeter::new("VM1"))).unwrap();
        wire(&mut c, "W1", "BAT1.pos", "SW1.left");
        wire(&mut c, "W2", "SW1.right", "AM1.left");
        wire(&mut c, "W3", "AM1.right", "R1.left");
        wire(&mut c, "W4", "R1.right", "R2.left");
        wire(&mut c, "W5", "R2.right", "BAT1.neg");
        wire(&mut c, "W6", "VM1.left", "R1.right");
        wire(&mut c, "W7", "VM1.right", "R1.left");
        c
    }

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_depth, 100);
        assert_eq!(config.max_loops, 50);
        assert_eq!(config.max_propagation_passes, 64);
        assert_relative_eq!(config.epsilon, 1e-9);
    }

    #[test]
    fn test_apply_options() {
        let mut options = HashMap::new();
        options.insert("max_loops".to_string(), 8.0);
        options.insert("epsilon".to_string(), 1e-6);
        let config = AnalyzerConfig::new().with_max_depth(20).apply_options(&options).unwrap();
        assert_eq!(config.max_loops, 8);
        assert_eq!(config.max_depth, 20);
        assert_relative_eq!(config.epsilon, 1e-6);

        options.insert("max_depth".to_string(), 2.5);
        assert!(AnalyzerConfig::new().apply_options(&options).is_err());

        let mut unknown = HashMap::new();
        unknown.insert("tolerance".to_string(), 1.0);
        assert!(matches!(
            AnalyzerConfig::new().apply_options(&unknown),
            Err(KirchhoffError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_series_analysis() {
        let c = series_circuit();
        let analysis = Analyzer::new().analyze(&c).unwrap();

        assert!(analysis.is_valid());
        assert_eq!(analysis.classification(), Classification::Series);

        let am = c.find_device("AM1").unwrap();
        assert_relative_eq!(analysis.meter_reading(am).unwrap(), 0.3, epsilon = 1e-9);

        let r2 = c.find("R2").unwrap();
        assert_relative_eq!(analysis.current(r2).unwrap(), 0.3, epsilon = 1e-9);

        // battery current runs neg -> pos inside the source
        let bat = c.find("BAT1").unwrap();
        assert_relative_eq!(analysis.current(bat).unwrap(), 0.3, epsilon = 1e-9);

        // VM1 reads V(R1.left) - V(R1.right)
        let vm = c.find_device("VM1").unwrap();
        assert_relative_eq!(analysis.meter_reading(vm).unwrap(), 3.0, epsilon = 1e-9);

        let pos = c.resolve_terminal("BAT1.pos").unwrap();
        let neg = c.resolve_terminal("BAT1.neg").unwrap();
        assert_relative_eq!(
            analysis.terminal_potential(pos).unwrap() - analysis.terminal_potential(neg).unwrap(),
            9.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_open_switch_invalidates_currents() {
        let mut c = series_circuit();
        let sw = c.find_device("SW1").unwrap();
        c.set_switch(sw, false);

        let analysis = Analyzer::new().analyze(&c).unwrap();
        assert_eq!(analysis.classification(), Classification::AllOpen);
        assert!(!analysis.is_valid());
        assert_eq!(analysis.current(c.find("R1").unwrap()), None);

        let pos = c.resolve_terminal("BAT1.pos").unwrap();
        assert_eq!(analysis.terminal_potential(pos), Some(9.0));
    }

    #[test]
    fn test_loop_residuals_vanish() {
        let c = series_circuit();
        let analysis = Analyzer::new().analyze(&c).unwrap();
        for &id in analysis.eligible_loops() {
            assert_relative_eq!(analysis.loop_residual(id).unwrap(), 0.0, epsilon = 1e-9);
        }
        for node in &analysis.nodes().nodes {
            assert_relative_eq!(analysis.node_imbalance(node.id).unwrap(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_circuit() {
        let analysis = Analyzer::new().analyze(&Circuit::new()).unwrap();
        assert_eq!(analysis.classification(), Classification::None);
        assert!(!analysis.is_valid());
        assert!(analysis.bridges().is_empty());
    }
}
