use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::bookings::SubjectKind;

/// Read-only snapshot of a tour or destination as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub kind: SubjectKind,
    pub title: String,
    pub unit_price: Decimal,
    pub duration_days: Option<i64>,
}
