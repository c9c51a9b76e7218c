use std::sync::Arc;

use anyhow::Result;
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::config::{AppConfig, TriageMode};
use upkeep_core::triage::TriageOracle;

use crate::llm::build_llm_client;
use crate::triage::{LlmTriageOracle, RuleBasedTriageOracle};

/// Picks the triage oracle named by `triage.mode`.
pub fn build_triage_oracle(
    config: &AppConfig,
    catalog: Arc<VendorCatalog>,
) -> Result<Arc<dyn TriageOracle>> {
    let oracle: Arc<dyn TriageOracle> = match config.triage.mode {
        TriageMode::Rules => Arc::new(RuleBasedTriageOracle::new(catalog)),
        TriageMode::Llm => {
            let llm = build_llm_client(&config.llm)?;
            Arc::new(LlmTriageOracle::new(llm, catalog))
        }
    };
    tracing::info!(
        event_name = "triage.oracle_selected",
        mode = ?config.triage.mode,
        provider = ?config.llm.provider,
        "triage oracle ready"
    );
    Ok(oracle)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use upkeep_core::catalog::VendorCatalog;
    use upkeep_core::config::{AppConfig, LlmProvider, TriageMode};

    use super::build_triage_oracle;

    fn catalog() -> Arc<VendorCatalog> {
        Arc::new(VendorCatalog::builtin().expect("built-in catalog loads"))
    }

    #[test]
    fn rules_mode_needs_no_llm_settings() {
        let mut config = AppConfig::default();
        config.triage.mode = TriageMode::Rules;
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = None;
        assert!(build_triage_oracle(&config, catalog()).is_ok());
    }

    #[test]
    fn llm_mode_surfaces_missing_credentials() {
        let mut config = AppConfig::default();
        config.triage.mode = TriageMode::Llm;
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = None;
        assert!(build_triage_oracle(&config, catalog()).is_err());
    }
}
