use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::vendor::{ServiceType, VendorId, VendorRecord};

const BUILTIN_CATALOG: &str = include_str!("../data/vendors.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read vendor catalog {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse vendor catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate vendor id `{0}` in catalog")]
    DuplicateVendor(VendorId),
    #[error("vendor `{vendor_id}` is invalid: {message}")]
    InvalidVendor { vendor_id: VendorId, message: String },
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    vendors: Vec<VendorRecord>,
}

/// Immutable vendor directory. Row order is preserved and acts as the final
/// ranking tie-break, so shared instances must never be reordered.
#[derive(Clone, Debug, PartialEq)]
pub struct VendorCatalog {
    vendors: Vec<VendorRecord>,
}

impl VendorCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        let catalog = Self::from_toml_str(&raw)?;
        tracing::info!(
            event_name = "catalog.loaded",
            path = %path.display(),
            vendor_count = catalog.len(),
            "vendor catalog loaded"
        );
        Ok(catalog)
    }

    /// Loads from `path` when given, otherwise the built-in directory.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        Self::from_records(file.vendors)
    }

    pub fn from_records(vendors: Vec<VendorRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for vendor in &vendors {
            if !seen.insert(vendor.vendor_id.clone()) {
                return Err(CatalogError::DuplicateVendor(vendor.vendor_id.clone()));
            }
            validate_record(vendor)?;
        }
        Ok(Self { vendors })
    }

    pub fn records(&self) -> &[VendorRecord] {
        &self.vendors
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    pub fn find(&self, vendor_id: &VendorId) -> Option<&VendorRecord> {
        self.vendors.iter().find(|vendor| &vendor.vendor_id == vendor_id)
    }

    /// Vendors of one trade, in catalog order.
    pub fn by_service_type(&self, service_type: ServiceType) -> Vec<&VendorRecord> {
        self.vendors.iter().filter(|vendor| vendor.service_type == service_type).collect()
    }
}

fn validate_record(vendor: &VendorRecord) -> Result<(), CatalogError> {
    let invalid = |message: &str| CatalogError::InvalidVendor {
        vendor_id: vendor.vendor_id.clone(),
        message: message.to_owned(),
    };

    if vendor.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if !(0.0..=5.0).contains(&vendor.rating) {
        return Err(invalid("rating must be within 0..=5"));
    }
    if vendor.base_fee < Decimal::ZERO || vendor.hourly_rate < Decimal::ZERO {
        return Err(invalid("fees must be non-negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{CatalogError, VendorCatalog};
    use crate::domain::vendor::{ServiceType, VendorId};

    #[test]
    fn builtin_catalog_has_every_trade() {
        let catalog = VendorCatalog::builtin().expect("builtin catalog parses");
        assert_eq!(catalog.len(), 9);
        for service_type in [
            ServiceType::Electrician,
            ServiceType::Plumber,
            ServiceType::Hvac,
            ServiceType::GasTechnician,
            ServiceType::ApplianceRepair,
        ] {
            assert!(!catalog.by_service_type(service_type).is_empty(), "{service_type}");
        }
    }

    #[test]
    fn plumbers_keep_catalog_order() {
        let catalog = VendorCatalog::builtin().expect("builtin catalog parses");
        let ids: Vec<_> = catalog
            .by_service_type(ServiceType::Plumber)
            .into_iter()
            .map(|vendor| vendor.vendor_id.0.as_str())
            .collect();
        assert_eq!(ids, vec!["V_PLUMB_FAST", "V_PLUMB_BALANCED", "V_PLUMB_CHEAP"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"
            [[vendors]]
            vendor_id = "V1"
            name = "One"
            service_type = "PLUMBER"
            zip = 1
            radius_km = 1
            rating = 4.0
            price_band = 1
            speed_score = 1
            base_fee = "10"
            hourly_rate = "10"

            [[vendors]]
            vendor_id = "V1"
            name = "Two"
            service_type = "PLUMBER"
            zip = 1
            radius_km = 1
            rating = 4.0
            price_band = 1
            speed_score = 1
            base_fee = "10"
            hourly_rate = "10"
        "#;
        let error = VendorCatalog::from_toml_str(raw).expect_err("duplicate must fail");
        assert!(matches!(error, CatalogError::DuplicateVendor(VendorId(ref id)) if id == "V1"));
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let raw = r#"
            [[vendors]]
            vendor_id = "V1"
            name = "One"
            service_type = "HVAC"
            zip = 1
            radius_km = 1
            rating = 7.5
            price_band = 1
            speed_score = 1
            base_fee = "10"
            hourly_rate = "10"
        "#;
        let error = VendorCatalog::from_toml_str(raw).expect_err("rating must be bounded");
        assert!(matches!(error, CatalogError::InvalidVendor { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
            [[vendors]]
            vendor_id = "V_LOCAL"
            name = "Local Gas"
            service_type = "GAS_TECHNICIAN"
            zip = 10001
            radius_km = 5
            rating = 4.2
            price_band = 2
            speed_score = 3
            base_fee = "50"
            hourly_rate = "60"
            "#
        )
        .expect("write catalog");

        let catalog = VendorCatalog::load(file.path()).expect("catalog loads");
        assert!(catalog.find(&VendorId("V_LOCAL".to_owned())).is_some());
        assert!(VendorCatalog::load(std::path::Path::new("/definitely/missing.toml")).is_err());
    }
}
