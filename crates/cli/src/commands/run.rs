use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use upkeep_agent::build_triage_oracle;
use upkeep_core::approvals::RandomAutoApproval;
use upkeep_core::audit::TracingAuditSink;
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::config::AppConfig;
use upkeep_core::domain::incident::IncidentRecord;
use upkeep_core::orchestrator::IncidentOrchestrator;
use upkeep_core::trace::IncidentTrace;
use upkeep_vendor::build_vendor_client;

use crate::commands::{CommandResult, GlobalOptions, EXIT_CONFIG, EXIT_INPUT, EXIT_RUNTIME};

const COMMAND: &str = "run";

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    incident_id: &'a str,
    final_state: Option<&'static str>,
    states: Vec<&'static str>,
    paid: bool,
    trace: &'a IncidentTrace,
}

pub fn run(global: &GlobalOptions, incident_path: &Path) -> CommandResult {
    let config = match global.load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    crate::init_logging(&config);

    let incident = match read_incident(incident_path) {
        Ok(incident) => incident,
        Err(message) => {
            return CommandResult::failure(COMMAND, "incident_input", message, EXIT_INPUT)
        }
    };

    let orchestrator = match build_orchestrator(&config) {
        Ok(orchestrator) => orchestrator,
        Err(result) => return result,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };
    let trace = runtime.block_on(orchestrator.run(&incident));

    CommandResult::report(
        COMMAND,
        &RunReport {
            incident_id: &trace.incident_id.0,
            final_state: trace.final_state().map(|state| state.as_str()),
            states: trace.state_names(),
            paid: trace.paid(),
            trace: &trace,
        },
    )
}

pub fn read_incident(path: &Path) -> Result<IncidentRecord, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read incident file `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("incident file `{}` is not valid: {error}", path.display()))
}

fn build_orchestrator(config: &AppConfig) -> Result<IncidentOrchestrator, CommandResult> {
    let catalog = VendorCatalog::load_or_builtin(config.catalog.path.as_deref())
        .map(Arc::new)
        .map_err(|error| {
            CommandResult::failure(COMMAND, "catalog", error.to_string(), EXIT_CONFIG)
        })?;
    let triage = build_triage_oracle(config, catalog.clone()).map_err(|error| {
        CommandResult::failure(COMMAND, "triage_setup", format!("{error:#}"), EXIT_CONFIG)
    })?;
    let vendor_service = build_vendor_client(&config.vendor_service).map_err(|error| {
        CommandResult::failure(COMMAND, "vendor_setup", error.to_string(), EXIT_CONFIG)
    })?;

    Ok(IncidentOrchestrator::new(triage, vendor_service, catalog)
        .with_approval_policy(Arc::new(RandomAutoApproval::new(
            config.approval_thresholds(),
            config.approval.seed,
        )))
        .with_audit_sink(Arc::new(TracingAuditSink))
        .with_settings(config.orchestrator_settings()))
}
