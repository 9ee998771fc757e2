//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::driver::{ClockMode, drive};
use crate::intake::read_batch;
use cmoflow_core::{Asset, FlowError, FlowEvent, Millis, Payload, PhaseController, SessionPhase};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// REPORTS
// =============================================================================

/// One asset as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub classification: String,
    pub preview: Option<String>,
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id().to_string(),
            name: asset.name().to_string(),
            content_type: asset.content_type().to_string(),
            classification: asset.classification().label().to_string(),
            preview: asset.preview().map(|p| p.to_string()),
        }
    }
}

/// Outcome of a `run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Assets as they stood when processing was requested.
    pub assets: Vec<AssetSummary>,
    /// Whether the advance guard let processing start.
    pub started: bool,
    /// Phase after the clock settled.
    pub final_phase: SessionPhase,
    /// Number of completed processing runs.
    pub completed_runs: u64,
    /// Virtual time elapsed.
    pub elapsed_ms: u64,
}

/// Run one session over `payloads` and report how it ended.
///
/// Every event is handed to `on_event` as it happens.
pub async fn run_session(
    payloads: Vec<Payload>,
    app: &AppConfig,
    mode: ClockMode,
    reset_at: Option<Millis>,
    on_event: impl FnMut(&FlowEvent) + 'static,
) -> SessionReport {
    let mut controller = PhaseController::new(app.flow.clone());
    controller.subscribe(on_event);

    let assets: Vec<AssetSummary> = controller
        .ingest(payloads)
        .iter()
        .map(AssetSummary::from)
        .collect();

    let started = controller.request_advance();
    if started {
        drive(&mut controller, mode, reset_at).await;
    } else {
        tracing::warn!("processing not started: no profile photo among the files");
    }

    SessionReport {
        assets,
        started,
        final_phase: controller.current_phase(),
        completed_runs: controller.completed_runs(),
        elapsed_ms: controller.now().value(),
    }
}

// =============================================================================
// RENDERING
// =============================================================================

/// Render an event as one line of text.
#[must_use]
pub fn describe_event(event: &FlowEvent) -> String {
    match event {
        FlowEvent::PhaseChanged { from, to } => format!("phase: {} -> {}", from, to),
        FlowEvent::StageStarted { progress } => format!(
            "[{}/{}] {}",
            progress.index.saturating_add(1),
            progress.total,
            progress.label.as_deref().unwrap_or("")
        ),
        FlowEvent::StagesFinished => "Ready to reveal your results!".to_string(),
        FlowEvent::AssetsChanged { count, has_primary } => {
            let prompt = if *has_primary {
                "add supporting documents"
            } else {
                "upload your photo first"
            };
            format!("{} file(s) ready, {}", count, prompt)
        }
    }
}

/// Render the end-of-run report as one JSON line, tagged like the event
/// lines that precede it.
#[must_use]
pub fn report_line(report: &SessionReport, skipped: &[PathBuf]) -> String {
    let output = serde_json::json!({
        "event": "report",
        "report": report,
        "skipped": skipped.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
    });
    output.to_string()
}

fn print_event(event: &FlowEvent, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
        }
    } else {
        println!("{}", describe_event(event));
    }
}

fn print_assets(assets: &[AssetSummary]) {
    for asset in assets {
        println!(
            "  {:<10} {:<14} {:<32} {}",
            asset.id,
            asset.classification,
            asset.content_type,
            asset.name
        );
    }
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Ingest files, start processing and drive the session.
pub async fn cmd_run(
    config_path: Option<&Path>,
    json_mode: bool,
    files: &[PathBuf],
    mode: ClockMode,
    reset_at: Option<Millis>,
) -> Result<(), FlowError> {
    let app = AppConfig::load(config_path)?;
    let batch = read_batch(files, &app)?;

    tracing::info!(
        files = batch.payloads.len(),
        skipped = batch.skipped.len(),
        ?mode,
        "starting session"
    );

    let report = run_session(batch.payloads, &app, mode, reset_at, move |event| {
        print_event(event, json_mode)
    })
    .await;

    // Event lines are already on stdout; the report is one more line.
    if json_mode {
        println!("{}", report_line(&report, &batch.skipped));
        return Ok(());
    }

    println!();
    println!("Session Summary");
    println!("===============");
    print_assets(&report.assets);
    for path in &batch.skipped {
        println!("  skipped    {}", path.display());
    }
    println!();
    if !report.started {
        println!("Processing did not start: upload a profile photo first.");
    }
    println!("Final phase:  {}", report.final_phase);
    println!("Elapsed:      {}", Millis(report.elapsed_ms));

    Ok(())
}

// =============================================================================
// CLASSIFY COMMAND
// =============================================================================

/// Ingest files and print their classification without processing.
pub fn cmd_classify(
    config_path: Option<&Path>,
    json_mode: bool,
    files: &[PathBuf],
) -> Result<(), FlowError> {
    let app = AppConfig::load(config_path)?;
    let batch = read_batch(files, &app)?;

    let mut controller = PhaseController::new(app.flow);
    let assets: Vec<AssetSummary> = controller
        .ingest(batch.payloads)
        .iter()
        .map(AssetSummary::from)
        .collect();
    let trigger = controller.trigger_state();

    if json_mode {
        let output = serde_json::json!({
            "assets": assets,
            "can_advance": trigger.enabled,
            "skipped": batch.skipped.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Intake");
    println!("======");
    print_assets(&assets);
    for path in &batch.skipped {
        println!("  skipped    {}", path.display());
    }
    println!();
    if trigger.enabled {
        println!("Ready: {} file(s), processing can start.", trigger.asset_count);
    } else {
        println!("Not ready: upload a profile photo first.");
    }

    Ok(())
}

// =============================================================================
// STAGES COMMAND
// =============================================================================

/// Print the configured stage list.
pub fn cmd_stages(config_path: Option<&Path>, json_mode: bool) -> Result<(), FlowError> {
    let app = AppConfig::load(config_path)?;
    let flow = &app.flow;

    if json_mode {
        let output = serde_json::json!({
            "stages": flow.stages,
            "settle_delay_ms": flow.settle_delay,
            "total_ms": flow.total_duration(),
            "accept": app.accept,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Processing Stages");
    println!("=================");
    for (i, stage) in flow.stages.iter().enumerate() {
        println!("  {}. {:<40} {}", i.saturating_add(1), stage.label, stage.duration);
    }
    println!();
    println!("Settle delay: {}", flow.settle_delay);
    println!("Total:        {}", flow.total_duration());
    println!("Accepts:      {}", app.accept.join(", "));

    Ok(())
}
