use std::sync::Arc;

use serde::Serialize;
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::domain::incident::{IssueType, Severity};
use upkeep_core::domain::vendor::VendorSelection;
use upkeep_core::ranking::{RankedCandidate, VendorRanker};

use crate::commands::{CommandResult, GlobalOptions, EXIT_CONFIG, EXIT_INPUT};

const COMMAND: &str = "rank";

#[derive(Debug, Serialize)]
struct RankReport {
    issue_type: IssueType,
    zip: String,
    severity: Severity,
    selection: VendorSelection,
    candidates: Vec<RankedCandidate>,
}

pub fn run(global: &GlobalOptions, issue_type: &str, zip: &str, severity: &str) -> CommandResult {
    let issue_type = match issue_type.parse::<IssueType>() {
        Ok(issue_type) => issue_type,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, EXIT_INPUT),
    };
    let severity = match severity.parse::<Severity>() {
        Ok(severity) => severity,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, EXIT_INPUT),
    };

    let config = match global.load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match VendorCatalog::load_or_builtin(config.catalog.path.as_deref()) {
        Ok(catalog) => Arc::new(catalog),
        Err(error) => {
            return CommandResult::failure(COMMAND, "catalog", error.to_string(), EXIT_CONFIG)
        }
    };

    let ranker = VendorRanker::new(catalog);
    CommandResult::report(
        COMMAND,
        &RankReport {
            issue_type,
            zip: zip.to_owned(),
            severity,
            selection: ranker.rank(issue_type, zip, severity),
            candidates: ranker.ranked_candidates(issue_type, zip, severity),
        },
    )
}
