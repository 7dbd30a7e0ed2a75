//! Work orders.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One pick task: take `product` out of `bin`.
///
/// # Example
///
/// ```
/// use manip_types::WorkOrder;
///
/// let order = WorkOrder::new("bin_A", "crayola_64_ct");
/// assert_eq!(order.bin(), "bin_A");
/// assert_eq!(order.to_string(), "crayola_64_ct from bin_A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkOrder {
    bin: String,
    product: String,
}

impl WorkOrder {
    /// Creates a work order.
    #[must_use]
    pub fn new(bin: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            product: product.into(),
        }
    }

    /// Returns the bin identifier.
    #[must_use]
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Returns the product identifier.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }
}

impl fmt::Display for WorkOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.product, self.bin)
    }
}
