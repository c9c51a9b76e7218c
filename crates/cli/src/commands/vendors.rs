use serde::Serialize;
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::domain::vendor::{ServiceType, VendorRecord};

use crate::commands::{CommandResult, GlobalOptions, EXIT_CONFIG, EXIT_INPUT};

const COMMAND: &str = "vendors";

#[derive(Debug, Serialize)]
struct VendorListing<'a> {
    source: String,
    count: usize,
    vendors: Vec<&'a VendorRecord>,
}

pub fn run(global: &GlobalOptions, service_type: Option<&str>) -> CommandResult {
    let filter = match service_type.map(str::parse::<ServiceType>).transpose() {
        Ok(filter) => filter,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, EXIT_INPUT),
    };

    let config = match global.load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match VendorCatalog::load_or_builtin(config.catalog.path.as_deref()) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure(COMMAND, "catalog", error.to_string(), EXIT_CONFIG)
        }
    };

    let vendors: Vec<&VendorRecord> = match filter {
        Some(service_type) => catalog.by_service_type(service_type),
        None => catalog.records().iter().collect(),
    };
    let source = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_owned());

    CommandResult::report(COMMAND, &VendorListing { source, count: vendors.len(), vendors })
}
