//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Stored as text in the `orders.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    New,
    Assembling,
    Delivering,
    Finished,
}

impl OrderStatus {
    /// Sort key for the staff dashboard: new orders first, finished orders never shown.
    #[must_use]
    pub const fn dashboard_priority(&self) -> Option<u8> {
        match self {
            Self::New => Some(1),
            Self::Assembling => Some(2),
            Self::Delivering => Some(3),
            Self::Finished => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "Новый",
            Self::Assembling => "Сборка",
            Self::Delivering => "Доставка",
            Self::Finished => "Завершён",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Assembling => write!(f, "ASSEMBLING"),
            Self::Delivering => write!(f, "DELIVERING"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ASSEMBLING" => Ok(Self::Assembling),
            "DELIVERING" => Ok(Self::Delivering),
            "FINISHED" => Ok(Self::Finished),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    NonCash,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::NonCash => write!(f, "non-cash"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "non-cash" => Ok(Self::NonCash),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
