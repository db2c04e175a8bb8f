//! Pure valuation calculation. No I/O.
//!
//! Priority order:
//! 1. user override -> display band around the override (the stored override
//!    itself is never touched here)
//! 2. area x locality band, with status and conservative adjustments
//! 3. purchase-price fallback band when area or locality data is missing
//! 4. insufficient data

use crate::domain::{Asset, CalculationOutcome, Confidence, ValuationResult, ValuationSource};
use crate::engine::adjustment::{conservative_factor, status_factor};
use crate::engine::confidence::{self, ConfidenceInputs};
use crate::provider::LocalityPriceRange;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Half-width of the display band derived from a user override (5%).
const OVERRIDE_BAND: (i64, i64) = (95, 105);
/// Half-width of the purchase-price fallback band (10%).
const FALLBACK_BAND: (i64, i64) = (90, 110);

pub struct ValuationCalculator;

impl ValuationCalculator {
    /// Compute a value range for an asset from its attributes and an optional
    /// locality price band.
    pub fn calculate(
        asset: &Asset,
        locality: Option<&LocalityPriceRange>,
        now: DateTime<Utc>,
    ) -> CalculationOutcome {
        // A user override always wins; the band is a display derivation only.
        if let Some(override_value) = positive(asset.user_override_value) {
            return CalculationOutcome::Valued(ValuationResult {
                min: override_value * Decimal::new(OVERRIDE_BAND.0, 2),
                max: override_value * Decimal::new(OVERRIDE_BAND.1, 2),
                confidence: Confidence::High,
                source: ValuationSource::UserOverride,
                computed_at: now,
            });
        }

        let area = positive(asset.effective_area());
        let purchase_price = positive(asset.purchase_price);

        if area.is_none() && purchase_price.is_none() {
            return CalculationOutcome::InsufficientData {
                reason: "no area and no purchase price".to_string(),
            };
        }

        let (area, range) = match (area, locality) {
            (Some(area), Some(range)) if range.min_per_unit > Decimal::ZERO => (area, range),
            _ => return Self::purchase_price_fallback(purchase_price, now),
        };

        let raw_min = area * range.min_per_unit;
        let raw_max = area * range.max_per_unit;

        let factor = status_factor(asset.property_status)
            * conservative_factor(&asset.id, now.date_naive());
        let mut min = raw_min * factor;
        let mut max = raw_max * factor;
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }

        let width_ratio = (range.max_per_unit - range.min_per_unit) / range.min_per_unit;
        let data_age_days = (now - range.as_of).num_days().max(0);
        let confidence = confidence::score(&ConfidenceInputs {
            sample_size: range.sample_size,
            range_width_ratio: width_ratio,
            source_count: range.source_count,
            data_age_days,
        });

        CalculationOutcome::Valued(ValuationResult {
            min,
            max,
            confidence,
            source: ValuationSource::LocalityData,
            computed_at: now,
        })
    }

    fn purchase_price_fallback(
        purchase_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> CalculationOutcome {
        match purchase_price {
            Some(price) => CalculationOutcome::Valued(ValuationResult {
                min: price * Decimal::new(FALLBACK_BAND.0, 2),
                max: price * Decimal::new(FALLBACK_BAND.1, 2),
                confidence: Confidence::Low,
                source: ValuationSource::PurchasePriceFallback,
                computed_at: now,
            }),
            None => CalculationOutcome::InsufficientData {
                reason: "no locality data and no purchase price".to_string(),
            },
        }
    }
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}
