use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use upkeep_core::config::{resolve_config_path, AppConfig};

use crate::commands::GlobalOptions;

pub fn run(global: &GlobalOptions) -> String {
    let config = match global.load_config("config") {
        Ok(config) => config,
        Err(result) => return result.output,
    };

    let config_file_path = resolve_config_path(global.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }
    lines.join("\n")
}

struct Entry {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

fn entry(key: &'static str, env_keys: &'static [&'static str], value: String) -> Entry {
    Entry { key, env_keys, value }
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());
    vec![
        entry(
            "catalog.path",
            &["UPKEEP_CATALOG_PATH"],
            optional(config.catalog.path.as_ref().map(|path| path.display().to_string())),
        ),
        entry("payment.currency", &["UPKEEP_PAYMENT_CURRENCY"], config.payment.currency.clone()),
        entry(
            "payment.default_max_amount",
            &["UPKEEP_PAYMENT_DEFAULT_MAX_AMOUNT"],
            config.payment.default_max_amount.to_string(),
        ),
        entry(
            "payment.mandate_validity_days",
            &["UPKEEP_PAYMENT_MANDATE_VALIDITY_DAYS"],
            config.payment.mandate_validity_days.to_string(),
        ),
        entry(
            "approval.low_value_threshold",
            &["UPKEEP_APPROVAL_LOW_VALUE_THRESHOLD"],
            config.approval.low_value_threshold.to_string(),
        ),
        entry(
            "approval.low_value_probability",
            &["UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY"],
            config.approval.low_value_probability.to_string(),
        ),
        entry(
            "approval.high_value_probability",
            &["UPKEEP_APPROVAL_HIGH_VALUE_PROBABILITY"],
            config.approval.high_value_probability.to_string(),
        ),
        entry(
            "approval.seed",
            &["UPKEEP_APPROVAL_SEED"],
            optional(config.approval.seed.map(|seed| seed.to_string())),
        ),
        entry(
            "orchestrator.record_paid_state",
            &["UPKEEP_ORCHESTRATOR_RECORD_PAID_STATE"],
            config.orchestrator.record_paid_state.to_string(),
        ),
        entry(
            "orchestrator.tenant_name",
            &["UPKEEP_ORCHESTRATOR_TENANT_NAME"],
            config.orchestrator.tenant_name.clone(),
        ),
        entry("triage.mode", &["UPKEEP_TRIAGE_MODE"], format!("{:?}", config.triage.mode)),
        entry("llm.provider", &["UPKEEP_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        entry("llm.model", &["UPKEEP_LLM_MODEL"], config.llm.model.clone()),
        entry("llm.base_url", &["UPKEEP_LLM_BASE_URL"], optional(config.llm.base_url.clone())),
        entry(
            "llm.api_key",
            &["UPKEEP_LLM_API_KEY"],
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
        ),
        entry(
            "llm.timeout_secs",
            &["UPKEEP_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        entry(
            "vendor_service.mode",
            &["UPKEEP_VENDOR_SERVICE_MODE"],
            format!("{:?}", config.vendor_service.mode),
        ),
        entry(
            "vendor_service.base_url",
            &["UPKEEP_VENDOR_SERVICE_BASE_URL"],
            optional(config.vendor_service.base_url.clone()),
        ),
        entry(
            "vendor_service.timeout_secs",
            &["UPKEEP_VENDOR_SERVICE_TIMEOUT_SECS"],
            config.vendor_service.timeout_secs.to_string(),
        ),
        entry(
            "vendor_service.simulated_job_status",
            &["UPKEEP_VENDOR_SERVICE_SIMULATED_JOB_STATUS"],
            config.vendor_service.simulated_job_status.to_string(),
        ),
        entry(
            "server.bind_address",
            &["UPKEEP_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        entry("server.port", &["UPKEEP_SERVER_PORT"], config.server.port.to_string()),
        entry(
            "logging.level",
            &["UPKEEP_LOGGING_LEVEL", "UPKEEP_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["UPKEEP_LOGGING_FORMAT", "UPKEEP_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
