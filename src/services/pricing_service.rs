use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::BookingError;
use crate::models::pricing::{PartyComposition, PriceBreakdown, PriceQuote, RoomPreference};

/// Rates and surcharges used to price a party. Passed in explicitly so tests
/// and tenants can vary them.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub tax_rate: Decimal,
    pub child_rate: Decimal,
    pub infant_rate: Decimal,
    pub room_surcharges: HashMap<RoomPreference, Decimal>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let room_surcharges = HashMap::from([
            (RoomPreference::Shared, Decimal::ZERO),
            (RoomPreference::Single, Decimal::from(50)),
            (RoomPreference::Double, Decimal::from(80)),
            (RoomPreference::Family, Decimal::from(120)),
        ]);

        Self {
            tax_rate: Decimal::new(17, 2),
            child_rate: Decimal::new(70, 2),
            infant_rate: Decimal::new(10, 2),
            room_surcharges,
        }
    }
}

impl PricingConfig {
    pub fn room_surcharge(&self, room: RoomPreference) -> Decimal {
        self.room_surcharges
            .get(&room)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct PricingService;

impl PricingService {
    /// Price a party for one subject. Pure: the same inputs always give the
    /// same quote, so a client estimate can be checked against it.
    pub fn quote(
        config: &PricingConfig,
        unit_price: Decimal,
        party: &PartyComposition,
        room_preference: RoomPreference,
    ) -> Result<PriceQuote, BookingError> {
        if unit_price.is_sign_negative() {
            return Err(BookingError::Validation(
                "unit price cannot be negative".to_string(),
            ));
        }
        if party.adults == 0 {
            return Err(BookingError::Validation(
                "at least one adult is required".to_string(),
            ));
        }

        let child_price = round_money(unit_price * config.child_rate);
        let infant_price = round_money(unit_price * config.infant_rate);

        let adults_cost = unit_price * Decimal::from(party.adults);
        let children_cost = child_price * Decimal::from(party.children);
        let infants_cost = infant_price * Decimal::from(party.infants);
        let room_surcharge = config.room_surcharge(room_preference);

        let subtotal = adults_cost + children_cost + infants_cost + room_surcharge;
        let tax = round_money(subtotal * config.tax_rate);
        let total = subtotal + tax;

        Ok(PriceQuote {
            subtotal,
            tax,
            total,
            breakdown: PriceBreakdown {
                unit_price,
                adults_cost,
                child_price,
                children_cost,
                infant_price,
                infants_cost,
                room_preference,
                room_surcharge,
                tax_rate: config.tax_rate,
            },
        })
    }

    /// Whether a client-side estimate agrees with the server quote to the cent.
    pub fn matches_estimate(quote: &PriceQuote, estimate: Decimal) -> bool {
        round_money(estimate) == quote.total
    }
}
