//! Marketplace roles
//!
//! A participant's role decides which weight profile its overall score uses.
//! Roles come from the entity directory; identifiers carry no role information.

use serde::{Deserialize, Serialize};

/// Participant role in the circular-economy marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Produces feedstock (waste streams)
    Supplier,
    /// Collects and transports feedstock
    Collector,
    /// Converts feedstock into energy or material
    Processor,
    /// Purchases processed output
    Buyer,
}

impl Role {
    /// All roles, in profile-table order
    pub const ALL: [Role; 4] = [Role::Supplier, Role::Collector, Role::Processor, Role::Buyer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Supplier => "supplier",
            Role::Collector => "collector",
            Role::Processor => "processor",
            Role::Buyer => "buyer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supplier" => Ok(Role::Supplier),
            "collector" => Ok(Role::Collector),
            "processor" => Ok(Role::Processor),
            "buyer" => Ok(Role::Buyer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}
