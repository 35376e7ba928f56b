use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub category: String,
    pub active: bool,
}
