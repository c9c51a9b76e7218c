use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::ApprovalThresholds;
use crate::domain::booking::JobStatus;
use crate::orchestrator::OrchestratorSettings;
use crate::settlement::SettlementPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub payment: PaymentConfig,
    pub approval: ApprovalConfig,
    pub orchestrator: OrchestratorConfig,
    pub triage: TriageConfig,
    pub llm: LlmConfig,
    pub vendor_service: VendorServiceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    /// Built-in directory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub currency: String,
    pub default_max_amount: Decimal,
    pub mandate_validity_days: i64,
}

#[derive(Clone, Debug)]
pub struct ApprovalConfig {
    pub low_value_threshold: Decimal,
    pub low_value_probability: f64,
    pub high_value_probability: f64,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub record_paid_state: bool,
    pub tenant_name: String,
    pub tenant_phone: String,
}

#[derive(Clone, Debug)]
pub struct TriageConfig {
    pub mode: TriageMode,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct VendorServiceConfig {
    pub mode: VendorServiceMode,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Seeds the simulated desk.
    pub seed: Option<u64>,
    /// Outcome the simulated desk reports for every job.
    pub simulated_job_status: JobStatus,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageMode {
    Rules,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorServiceMode {
    Simulated,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub triage_mode: Option<TriageMode>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub vendor_service_mode: Option<VendorServiceMode>,
    pub vendor_service_base_url: Option<String>,
    pub approval_seed: Option<u64>,
    pub record_paid_state: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            payment: PaymentConfig {
                currency: "USD".to_string(),
                default_max_amount: Decimal::new(500, 0),
                mandate_validity_days: 30,
            },
            approval: ApprovalConfig {
                low_value_threshold: Decimal::new(500, 0),
                low_value_probability: 0.7,
                high_value_probability: 0.3,
                seed: None,
            },
            orchestrator: OrchestratorConfig {
                record_paid_state: false,
                tenant_name: "Test Tenant".to_string(),
                tenant_phone: "000-000-0000".to_string(),
            },
            triage: TriageConfig { mode: TriageMode::Rules },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            vendor_service: VendorServiceConfig {
                mode: VendorServiceMode::Simulated,
                base_url: None,
                timeout_secs: 10,
                seed: None,
                simulated_job_status: JobStatus::Done,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8088 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for TriageMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported triage mode `{other}` (expected rules|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for VendorServiceMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Validation(format!(
                "unsupported vendor service mode `{other}` (expected simulated|http)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("upkeep.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn approval_thresholds(&self) -> ApprovalThresholds {
        ApprovalThresholds {
            low_value_threshold: self.approval.low_value_threshold,
            low_value_probability: self.approval.low_value_probability,
            high_value_probability: self.approval.high_value_probability,
        }
    }

    pub fn settlement_policy(&self) -> SettlementPolicy {
        SettlementPolicy {
            currency: self.payment.currency.clone(),
            default_max_amount: self.payment.default_max_amount,
            mandate_validity_days: self.payment.mandate_validity_days,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            settlement: self.settlement_policy(),
            record_paid_state: self.orchestrator.record_paid_state,
            tenant_name: self.orchestrator.tenant_name.clone(),
            tenant_phone: self.orchestrator.tenant_phone.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(payment) = patch.payment {
            if let Some(currency) = payment.currency {
                self.payment.currency = currency;
            }
            if let Some(default_max_amount) = payment.default_max_amount {
                self.payment.default_max_amount = default_max_amount;
            }
            if let Some(mandate_validity_days) = payment.mandate_validity_days {
                self.payment.mandate_validity_days = mandate_validity_days;
            }
        }

        if let Some(approval) = patch.approval {
            if let Some(low_value_threshold) = approval.low_value_threshold {
                self.approval.low_value_threshold = low_value_threshold;
            }
            if let Some(low_value_probability) = approval.low_value_probability {
                self.approval.low_value_probability = low_value_probability;
            }
            if let Some(high_value_probability) = approval.high_value_probability {
                self.approval.high_value_probability = high_value_probability;
            }
            if let Some(seed) = approval.seed {
                self.approval.seed = Some(seed);
            }
        }

        if let Some(orchestrator) = patch.orchestrator {
            if let Some(record_paid_state) = orchestrator.record_paid_state {
                self.orchestrator.record_paid_state = record_paid_state;
            }
            if let Some(tenant_name) = orchestrator.tenant_name {
                self.orchestrator.tenant_name = tenant_name;
            }
            if let Some(tenant_phone) = orchestrator.tenant_phone {
                self.orchestrator.tenant_phone = tenant_phone;
            }
        }

        if let Some(triage) = patch.triage {
            if let Some(mode) = triage.mode {
                self.triage.mode = mode;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(vendor_service) = patch.vendor_service {
            if let Some(mode) = vendor_service.mode {
                self.vendor_service.mode = mode;
            }
            if let Some(base_url) = vendor_service.base_url {
                self.vendor_service.base_url = Some(base_url);
            }
            if let Some(timeout_secs) = vendor_service.timeout_secs {
                self.vendor_service.timeout_secs = timeout_secs;
            }
            if let Some(seed) = vendor_service.seed {
                self.vendor_service.seed = Some(seed);
            }
            if let Some(status) = vendor_service.simulated_job_status {
                self.vendor_service.simulated_job_status = status;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("UPKEEP_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("UPKEEP_PAYMENT_CURRENCY") {
            self.payment.currency = value;
        }
        if let Some(value) = read_env("UPKEEP_PAYMENT_DEFAULT_MAX_AMOUNT") {
            self.payment.default_max_amount =
                parse_decimal("UPKEEP_PAYMENT_DEFAULT_MAX_AMOUNT", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_PAYMENT_MANDATE_VALIDITY_DAYS") {
            self.payment.mandate_validity_days =
                parse_i64("UPKEEP_PAYMENT_MANDATE_VALIDITY_DAYS", &value)?;
        }

        if let Some(value) = read_env("UPKEEP_APPROVAL_LOW_VALUE_THRESHOLD") {
            self.approval.low_value_threshold =
                parse_decimal("UPKEEP_APPROVAL_LOW_VALUE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY") {
            self.approval.low_value_probability =
                parse_f64("UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_APPROVAL_HIGH_VALUE_PROBABILITY") {
            self.approval.high_value_probability =
                parse_f64("UPKEEP_APPROVAL_HIGH_VALUE_PROBABILITY", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_APPROVAL_SEED") {
            self.approval.seed = Some(parse_u64("UPKEEP_APPROVAL_SEED", &value)?);
        }

        if let Some(value) = read_env("UPKEEP_ORCHESTRATOR_RECORD_PAID_STATE") {
            self.orchestrator.record_paid_state =
                parse_bool("UPKEEP_ORCHESTRATOR_RECORD_PAID_STATE", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_ORCHESTRATOR_TENANT_NAME") {
            self.orchestrator.tenant_name = value;
        }
        if let Some(value) = read_env("UPKEEP_ORCHESTRATOR_TENANT_PHONE") {
            self.orchestrator.tenant_phone = value;
        }

        if let Some(value) = read_env("UPKEEP_TRIAGE_MODE") {
            self.triage.mode = value.parse()?;
        }

        if let Some(value) = read_env("UPKEEP_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("UPKEEP_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("UPKEEP_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("UPKEEP_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("UPKEEP_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("UPKEEP_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("UPKEEP_VENDOR_SERVICE_MODE") {
            self.vendor_service.mode = value.parse()?;
        }
        if let Some(value) = read_env("UPKEEP_VENDOR_SERVICE_BASE_URL") {
            self.vendor_service.base_url = Some(value);
        }
        if let Some(value) = read_env("UPKEEP_VENDOR_SERVICE_TIMEOUT_SECS") {
            self.vendor_service.timeout_secs =
                parse_u64("UPKEEP_VENDOR_SERVICE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("UPKEEP_VENDOR_SERVICE_SEED") {
            self.vendor_service.seed = Some(parse_u64("UPKEEP_VENDOR_SERVICE_SEED", &value)?);
        }
        if let Some(value) = read_env("UPKEEP_VENDOR_SERVICE_SIMULATED_JOB_STATUS") {
            self.vendor_service.simulated_job_status =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "UPKEEP_VENDOR_SERVICE_SIMULATED_JOB_STATUS".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Some(value) = read_env("UPKEEP_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("UPKEEP_SERVER_PORT") {
            self.server.port = parse_u16("UPKEEP_SERVER_PORT", &value)?;
        }

        let log_level = read_env("UPKEEP_LOGGING_LEVEL").or_else(|| read_env("UPKEEP_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("UPKEEP_LOGGING_FORMAT").or_else(|| read_env("UPKEEP_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(triage_mode) = overrides.triage_mode {
            self.triage.mode = triage_mode;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(mode) = overrides.vendor_service_mode {
            self.vendor_service.mode = mode;
        }
        if let Some(base_url) = overrides.vendor_service_base_url {
            self.vendor_service.base_url = Some(base_url);
        }
        if let Some(seed) = overrides.approval_seed {
            self.approval.seed = Some(seed);
        }
        if let Some(record_paid_state) = overrides.record_paid_state {
            self.orchestrator.record_paid_state = record_paid_state;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_payment(&self.payment)?;
        validate_approval(&self.approval)?;
        validate_orchestrator(&self.orchestrator)?;
        validate_llm(&self.llm, self.triage.mode)?;
        validate_vendor_service(&self.vendor_service)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("upkeep.toml"), PathBuf::from("config/upkeep.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

const MAX_MANDATE_VALIDITY_DAYS: i64 = 3650;

fn validate_payment(payment: &PaymentConfig) -> Result<(), ConfigError> {
    let currency = payment.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "payment.currency must be a three-letter uppercase ISO code".to_string(),
        ));
    }
    if payment.default_max_amount <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "payment.default_max_amount must be greater than zero".to_string(),
        ));
    }
    if !(1..=MAX_MANDATE_VALIDITY_DAYS).contains(&payment.mandate_validity_days) {
        return Err(ConfigError::Validation(format!(
            "payment.mandate_validity_days must be in range 1..={MAX_MANDATE_VALIDITY_DAYS}"
        )));
    }
    Ok(())
}

fn validate_approval(approval: &ApprovalConfig) -> Result<(), ConfigError> {
    if approval.low_value_threshold < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "approval.low_value_threshold must not be negative".to_string(),
        ));
    }
    for (key, value) in [
        ("approval.low_value_probability", approval.low_value_probability),
        ("approval.high_value_probability", approval.high_value_probability),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }
    Ok(())
}

fn validate_orchestrator(orchestrator: &OrchestratorConfig) -> Result<(), ConfigError> {
    if orchestrator.tenant_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "orchestrator.tenant_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig, mode: TriageMode) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if mode == TriageMode::Rules {
        return Ok(());
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_vendor_service(vendor_service: &VendorServiceConfig) -> Result<(), ConfigError> {
    if vendor_service.timeout_secs == 0 || vendor_service.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "vendor_service.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if vendor_service.mode == VendorServiceMode::Http {
        let valid = vendor_service.base_url.as_deref().is_some_and(|base_url| {
            base_url.starts_with("http://") || base_url.starts_with("https://")
        });
        if !valid {
            return Err(ConfigError::Validation(
                "vendor_service.base_url must start with http:// or https:// in http mode"
                    .to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    payment: Option<PaymentPatch>,
    approval: Option<ApprovalPatch>,
    orchestrator: Option<OrchestratorPatch>,
    triage: Option<TriagePatch>,
    llm: Option<LlmPatch>,
    vendor_service: Option<VendorServicePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentPatch {
    currency: Option<String>,
    default_max_amount: Option<Decimal>,
    mandate_validity_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalPatch {
    low_value_threshold: Option<Decimal>,
    low_value_probability: Option<f64>,
    high_value_probability: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OrchestratorPatch {
    record_paid_state: Option<bool>,
    tenant_name: Option<String>,
    tenant_phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TriagePatch {
    mode: Option<TriageMode>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct VendorServicePatch {
    mode: Option<VendorServiceMode>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    seed: Option<u64>,
    simulated_job_status: Option<JobStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, TriageMode,
        VendorServiceMode,
    };
    use crate::domain::booking::JobStatus;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(config.triage.mode == TriageMode::Rules, "rules triage is the default")?;
        ensure(
            config.vendor_service.mode == VendorServiceMode::Simulated,
            "simulated vendor desk is the default",
        )?;
        ensure(!config.orchestrator.record_paid_state, "PAID state is opt-in")?;
        ensure(
            config.payment.default_max_amount == Decimal::new(500, 0),
            "default mandate is 500",
        )?;
        let thresholds = config.approval_thresholds();
        ensure(
            thresholds.low_value_probability == 0.7 && thresholds.high_value_probability == 0.3,
            "approval probabilities default to 0.7/0.3",
        )?;
        ensure(
            config.orchestrator_settings().settlement.currency == "USD",
            "settlement currency defaults to USD",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_UPKEEP_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("upkeep.toml");
            fs::write(
                &path,
                r#"
[triage]
mode = "llm"

[llm]
provider = "open_ai"
api_key = "${TEST_UPKEEP_LLM_KEY}"
model = "gpt-4o-mini"

[payment]
default_max_amount = "750"

[vendor_service]
simulated_job_status = "FAILED"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string())
                    == Some("sk-from-env".to_string()),
                "api key should be interpolated from environment",
            )?;
            ensure(
                config.payment.default_max_amount == Decimal::new(750, 0),
                "payment default should come from file",
            )?;
            ensure(
                config.vendor_service.simulated_job_status == JobStatus::Failed,
                "simulated job status should come from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_UPKEEP_LLM_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("UPKEEP_LOG_LEVEL", "warn");
        env::set_var("UPKEEP_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["UPKEEP_LOG_LEVEL", "UPKEEP_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("UPKEEP_APPROVAL_SEED", "11");
        env::set_var("UPKEEP_ORCHESTRATOR_TENANT_NAME", "Env Tenant");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("upkeep.toml");
            fs::write(
                &path,
                r#"
[approval]
seed = 3

[orchestrator]
tenant_name = "File Tenant"
record_paid_state = true

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    approval_seed: Some(99),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.approval.seed == Some(99), "override seed should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.orchestrator.tenant_name == "Env Tenant",
                "env tenant name should win over file",
            )?;
            ensure(config.orchestrator.record_paid_state, "file value should beat default")?;
            Ok(())
        })();

        clear_vars(&["UPKEEP_APPROVAL_SEED", "UPKEEP_ORCHESTRATOR_TENANT_NAME"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("UPKEEP_VENDOR_SERVICE_MODE", "http");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("vendor_service.base_url")
            );
            ensure(has_message, "validation failure should mention vendor_service.base_url")
        })();

        clear_vars(&["UPKEEP_VENDOR_SERVICE_MODE"]);
        result
    }

    #[test]
    fn malformed_numeric_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY", "likely");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY"),
                "override error should name the variable",
            )
        })();

        clear_vars(&["UPKEEP_APPROVAL_LOW_VALUE_PROBABILITY"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("UPKEEP_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["UPKEEP_LLM_API_KEY"]);
        result
    }

    #[test]
    fn mandate_validity_window_is_bounded() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.payment.mandate_validity_days = 3650;
        config.validate().map_err(|err| format!("ten years should validate: {err}"))?;

        config.payment.mandate_validity_days = 200_000_000;
        let has_message = matches!(
            config.validate(),
            Err(ConfigError::Validation(ref message)) if message.contains("payment.mandate_validity_days")
        );
        ensure(has_message, "oversized validity window should be rejected")?;

        config.payment.mandate_validity_days = 0;
        ensure(config.validate().is_err(), "zero-day validity window should be rejected")
    }
}
