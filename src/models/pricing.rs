use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPreference {
    #[default]
    Shared,
    Single,
    Double,
    Family,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PartyComposition {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

impl PartyComposition {
    pub fn new(adults: u32, children: u32, infants: u32) -> Self {
        Self {
            adults,
            children,
            infants,
        }
    }

    /// Headcount, or `None` when the counts do not fit in a `u32`.
    pub fn checked_total(&self) -> Option<u32> {
        self.adults
            .checked_add(self.children)?
            .checked_add(self.infants)
    }

    /// Saturates instead of wrapping; validated parties never get near it.
    pub fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.infants)
    }
}

/// Line items behind a quoted total.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriceBreakdown {
    pub unit_price: Decimal,
    pub adults_cost: Decimal,
    pub child_price: Decimal,
    pub children_cost: Decimal,
    pub infant_price: Decimal,
    pub infants_cost: Decimal,
    pub room_preference: RoomPreference,
    pub room_surcharge: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriceQuote {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub breakdown: PriceBreakdown,
}

impl PriceQuote {
    /// Reduction against charging every traveler the full unit price.
    pub fn party_discount(&self, party: &PartyComposition) -> Decimal {
        let b = &self.breakdown;
        let full_price = b.unit_price * Decimal::from(party.children + party.infants);
        full_price - b.children_cost - b.infants_cost
    }

    /// Tax plus room surcharge, persisted as the booking's `taxes`.
    pub fn taxes_and_fees(&self) -> Decimal {
        self.tax + self.breakdown.room_surcharge
    }
}
