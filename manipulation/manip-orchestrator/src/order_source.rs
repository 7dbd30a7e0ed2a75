//! Loading work orders and configuration from JSON files.
//!
//! An order manifest lists what each bin holds and the orders to pick:
//!
//! ```json
//! {
//!   "bin_contents": {
//!     "bin_A": ["glue_bottle", "duct_tape"],
//!     "bin_B": ["sponge"]
//!   },
//!   "work_order": [
//!     { "bin": "bin_A", "item": "duct_tape" },
//!     { "bin": "bin_B", "item": "sponge" }
//!   ]
//! }
//! ```
//!
//! Every order is checked against the bin contents when the manifest is
//! parsed, so a bad order is rejected before any motion.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use manip_types::{ManipulationConfig, WorkOrder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Deserialize)]
struct RawOrder {
    bin: String,
    item: String,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    bin_contents: HashMap<String, Vec<String>>,
    #[serde(default)]
    work_order: Vec<RawOrder>,
}

/// Validated bin contents and work orders.
///
/// # Example
///
/// ```
/// use manip_orchestrator::OrderManifest;
///
/// let json = r#"{
///     "bin_contents": { "bin_A": ["glue_bottle"] },
///     "work_order": [{ "bin": "bin_A", "item": "glue_bottle" }]
/// }"#;
/// let manifest = OrderManifest::from_json(json).unwrap();
/// assert_eq!(manifest.orders().len(), 1);
/// assert_eq!(manifest.orders()[0].product(), "glue_bottle");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderManifest {
    bins: HashMap<String, Vec<String>>,
    orders: Vec<WorkOrder>,
}

impl OrderManifest {
    /// Parses and validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Json`] on malformed input,
    /// [`OrchestratorError::UnknownBin`] if an order names an unlisted bin,
    /// and [`OrchestratorError::ProductNotInBin`] if the bin does not hold the
    /// product.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let mut orders = Vec::with_capacity(raw.work_order.len());
        for order in raw.work_order {
            let contents = raw
                .bin_contents
                .get(&order.bin)
                .ok_or_else(|| OrchestratorError::unknown_bin(&order.bin))?;
            if !contents.iter().any(|item| *item == order.item) {
                return Err(OrchestratorError::product_not_in_bin(order.bin, order.item));
            }
            orders.push(WorkOrder::new(order.bin, order.item));
        }
        debug!(
            bins = raw.bin_contents.len(),
            orders = orders.len(),
            "Parsed order manifest"
        );
        Ok(Self {
            bins: raw.bin_contents,
            orders,
        })
    }

    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Io`] if the file cannot be read, or any
    /// error of [`Self::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = Self::from_json(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            orders = manifest.orders.len(),
            "Loaded order manifest"
        );
        Ok(manifest)
    }

    /// Returns the orders in file order.
    #[must_use]
    pub fn orders(&self) -> &[WorkOrder] {
        &self.orders
    }

    /// Returns the listed contents of a bin.
    #[must_use]
    pub fn bin(&self, name: &str) -> Option<&[String]> {
        self.bins.get(name).map(Vec::as_slice)
    }

    /// Consumes the manifest, returning its orders.
    #[must_use]
    pub fn into_orders(self) -> Vec<WorkOrder> {
        self.orders
    }
}

/// Reads a [`ManipulationConfig`] from a JSON file and validates it.
///
/// Missing sections take their defaults.
///
/// # Errors
///
/// Returns [`OrchestratorError::Io`] or [`OrchestratorError::Json`] if the
/// file cannot be read or parsed, and [`OrchestratorError::Manip`] if a
/// section fails validation.
pub fn load_config(path: impl AsRef<Path>) -> Result<ManipulationConfig> {
    let path = path.as_ref();
    let config: ManipulationConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
    config.validate()?;
    info!(path = %path.display(), "Loaded manipulation config");
    Ok(config)
}
