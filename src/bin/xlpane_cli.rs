//! CLI tool for xlpane - replays a session scenario against an in-memory
//! workbook and prints what the controller did as JSON
//!
//! Usage:
//!   xlpane_cli <scenario.json>              # Output report to stdout
//!   xlpane_cli <scenario.json> -o out.json  # Output report to file
//!
//! Scenario format:
//!
//! ```json
//! {
//!   "config": { "minOpenIntervalMs": 750 },
//!   "sheets": ["Sheet1", "Sheet2"],
//!   "names": { "PaneTrigger": "=Sheet1!$B$2" },
//!   "steps": [
//!     { "select": "Sheet1!B2" },
//!     { "advance": 1000 },
//!     { "addSheet": "Sheet3" },
//!     { "push": "#ffaa33" },
//!     "closePane"
//!   ]
//! }
//! ```

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Write};

use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use xlpane::{
    logging, ColorTargets, HostEvent, MemoryHost, PaneAction, PaneConfig, PaneController,
    VisibilityState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    #[serde(default)]
    config: PaneConfig,
    #[serde(default)]
    sheets: Vec<String>,
    #[serde(default)]
    names: BTreeMap<String, String>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Step {
    /// Select a sheet-qualified range, as the user would.
    Select(String),
    /// Move the clock forward (ms).
    Advance(f64),
    /// Deliver a raw host event.
    Event(HostEvent),
    AddSheet(String),
    DeleteSheet(String),
    DefineName { name: String, reference: String },
    Push(String),
    ApplyColor {
        color: String,
        #[serde(default)]
        targets: Option<ColorTargets>,
    },
    /// The user closes the pane by hand.
    ClosePane,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepReport {
    step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<PaneAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recent_colors: Option<Vec<String>>,
    pane_visible: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    instrumented: Option<usize>,
    steps: Vec<StepReport>,
    visibility: VisibilityState,
    watched_sheets: usize,
    recent_colors: Vec<String>,
    reported_errors: Vec<(String, String)>,
}

fn run(scenario: Scenario) -> Result<Report, String> {
    let sheet_refs: Vec<&str> = scenario.sheets.iter().map(String::as_str).collect();
    let host = if sheet_refs.is_empty() {
        MemoryHost::new()
    } else {
        MemoryHost::with_sheets(&sheet_refs)
    };
    for (name, reference) in &scenario.names {
        host.define_name(name, reference);
    }

    let controller = PaneController::new(host, scenario.config).map_err(|e| e.to_string())?;
    let instrumented = block_on(controller.start());

    let mut steps = Vec::new();
    for (i, step) in scenario.steps.into_iter().enumerate() {
        let host = controller.host();
        let mut action = None;
        let mut recent_colors = None;
        match step {
            Step::Select(address) => {
                let event = host.select(&address).map_err(|e| e.to_string())?;
                action = block_on(controller.on_host_event(event));
            }
            Step::Advance(ms) => host.advance(ms),
            Step::Event(event) => action = block_on(controller.on_host_event(event)),
            Step::AddSheet(name) => {
                let sheet_id = host.add_sheet(&name);
                block_on(controller.on_host_event(HostEvent::SheetAdded { sheet_id }));
            }
            Step::DeleteSheet(name) => {
                if let Some(sheet_id) = host.delete_sheet(&name) {
                    block_on(controller.on_host_event(HostEvent::SheetDeleted { sheet_id }));
                }
            }
            Step::DefineName { name, reference } => host.define_name(&name, &reference),
            Step::Push(value) => recent_colors = Some(block_on(controller.push_color(&value))),
            Step::ApplyColor { color, targets } => {
                let targets = targets.unwrap_or(ColorTargets::FILL);
                recent_colors = block_on(controller.apply_color(&color, targets));
            }
            Step::ClosePane => {
                let event = host.set_pane_visible(false);
                block_on(controller.on_host_event(event));
            }
        }
        steps.push(StepReport {
            step: i,
            action,
            recent_colors,
            pane_visible: controller.host().pane_visible(),
        });
    }

    Ok(Report {
        instrumented,
        steps,
        visibility: controller.visibility(),
        watched_sheets: controller.watcher().watched_count(),
        recent_colors: controller.store().cached(),
        reported_errors: controller.host().reported_errors(),
    })
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: xlpane_cli <scenario.json> [-o output.json]");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = if args.len() > 3 && args[2] == "-o" {
        Some(&args[3])
    } else {
        None
    };

    let text = match fs::read_to_string(input_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    let scenario: Scenario = match serde_json::from_str(&text) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error parsing scenario: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(scenario.config.level_filter().unwrap_or(log::LevelFilter::Info));

    let report = match run(scenario) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error replaying scenario: {}", e);
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Wrote {}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).unwrap();
        }
    }
}
