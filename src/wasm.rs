//! WASM bindings for Kirchhoff Core.
//!
//! This module exposes the analyzer to a browser-based schematic editor.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmAnalyzer } from 'kirchhoff_core';
//!
//! await init();
//!
//! const netlist = `
//!   BAT1 9
//!   SW1 closed
//!   R1 1k
//!   W1 BAT1.pos SW1.left
//!   W2 SW1.right R1.left
//!   W3 R1.right BAT1.neg
//! `;
//!
//! const analyzer = new WasmAnalyzer(netlist);
//! analyzer.current("R1");          // 0.009
//! analyzer.toggle_switch("SW1");
//! analyzer.classification();       // "all-open"
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::Circuit;
use crate::dsl;
use crate::error::KirchhoffError;
use crate::solver::{Analysis, Analyzer, AnalyzerConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: KirchhoffError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible circuit analyzer.
///
/// Owns the circuit and the latest analysis. Every edit re-runs the full
/// analysis.
#[wasm_bindgen]
pub struct WasmAnalyzer {
    circuit: Circuit,
    analyzer: Analyzer,
    analysis: Analysis,
}

#[wasm_bindgen]
impl WasmAnalyzer {
    /// Parse a netlist and analyze it.
    ///
    /// `.option` lines in the netlist configure the analyzer.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist: &str) -> Result<WasmAnalyzer, JsValue> {
        let ast = dsl::parse(netlist).map_err(to_js)?;
        let config = AnalyzerConfig::new().apply_options(&ast.options).map_err(to_js)?;
        let circuit = Circuit::from_ast(ast).map_err(to_js)?;
        let analyzer = Analyzer::with_config(config);
        let analysis = analyzer.analyze(&circuit).map_err(to_js)?;

        Ok(WasmAnalyzer {
            circuit,
            analyzer,
            analysis,
        })
    }

    /// Classification name, e.g. `"series"` or `"power-short"`.
    #[wasm_bindgen]
    pub fn classification(&self) -> String {
        self.analysis.classification().to_string()
    }

    #[wasm_bindgen]
    pub fn is_valid(&self) -> bool {
        self.analysis.is_valid()
    }

    /// Current through a named device or wire, or `undefined`.
    #[wasm_bindgen]
    pub fn current(&self, name: &str) -> Option<f64> {
        self.circuit.find(name).and_then(|e| self.analysis.current(e))
    }

    /// Potential at a `DEVICE.key` terminal, or `undefined`.
    #[wasm_bindgen]
    pub fn potential(&self, terminal: &str) -> Option<f64> {
        let terminal = self.circuit.resolve_terminal(terminal).ok()?;
        self.analysis.terminal_potential(terminal)
    }

    /// Reading of a named ammeter or voltmeter, or `undefined`.
    #[wasm_bindgen]
    pub fn meter_reading(&self, name: &str) -> Option<f64> {
        self.circuit
            .find_device(name)
            .and_then(|d| self.analysis.meter_reading(d))
    }

    /// Names of the elements on bridge branches.
    #[wasm_bindgen]
    pub fn bridge_elements(&self) -> Vec<String> {
        self.analysis
            .bridge_elements()
            .into_iter()
            .map(|e| self.circuit.element_name(e).to_string())
            .collect()
    }

    /// Flip a switch and re-analyze.
    #[wasm_bindgen]
    pub fn toggle_switch(&mut self, name: &str) -> Result<(), JsValue> {
        let device = self
            .circuit
            .find_device(name)
            .ok_or_else(|| JsValue::from_str(&format!("no device named '{}'", name)))?;
        if !self.circuit.toggle_switch(device) {
            return Err(JsValue::from_str(&format!("'{}' is not a switch", name)));
        }
        self.analysis = self.analyzer.analyze(&self.circuit).map_err(to_js)?;
        Ok(())
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
