use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::bookings::BookingStatus;
use crate::services::pricing_service::round_money;

const SECONDS_PER_DAY: i64 = 86_400;

/// One step of the refund ladder: strictly more than `min_days` of lead time
/// earns `percentage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundTier {
    pub min_days: i64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPolicy {
    tiers: Vec<RefundTier>,
    /// Traveler cancellations need strictly more lead time than this.
    pub cancellation_cutoff_days: i64,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::new(
            vec![
                RefundTier { min_days: 7, percentage: 90 },
                RefundTier { min_days: 3, percentage: 50 },
                RefundTier { min_days: 1, percentage: 25 },
            ],
            1,
        )
    }
}

impl RefundPolicy {
    pub fn new(mut tiers: Vec<RefundTier>, cancellation_cutoff_days: i64) -> Self {
        tiers.sort_by(|a, b| b.min_days.cmp(&a.min_days));
        Self {
            tiers,
            cancellation_cutoff_days,
        }
    }

    /// Percentage for a given lead time. Past dates fall through to 0.
    pub fn percentage_for(&self, days_until_service: i64) -> u32 {
        self.tiers
            .iter()
            .find(|tier| days_until_service > tier.min_days)
            .map_or(0, |tier| tier.percentage)
    }

    /// Refund percentage for a booking in `status`; only cancelled bookings earn one.
    pub fn refund_percentage(&self, status: BookingStatus, days_until_service: i64) -> u32 {
        if status != BookingStatus::Cancelled {
            return 0;
        }
        self.percentage_for(days_until_service)
    }

    pub fn refund_amount(
        &self,
        status: BookingStatus,
        total_price: Decimal,
        days_until_service: i64,
    ) -> Decimal {
        let percentage = self.refund_percentage(status, days_until_service);
        round_money(total_price * Decimal::from(percentage) / Decimal::ONE_HUNDRED)
    }

    pub fn allows_cancellation(&self, days_until_service: i64) -> bool {
        days_until_service > self.cancellation_cutoff_days
    }
}

/// Whole days between `now` and the service date, rounded up. Negative once
/// the date has passed.
pub fn days_until(service_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (service_date - now).num_seconds();
    let days = seconds.div_euclid(SECONDS_PER_DAY);
    if seconds.rem_euclid(SECONDS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}
