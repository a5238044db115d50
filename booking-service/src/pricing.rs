use bigdecimal::BigDecimal;
use shared::SETTLEMENT_CURRENCY;

use crate::currency::{CurrencyNormalizer, RateLookupError};
use crate::models::{Availability, Product};

#[derive(Debug, Clone, Copy)]
pub struct PriceTag<'a> {
    pub amount: &'a BigDecimal,
    pub currency: &'a str,
}

impl Product {
    pub fn price_tag(&self) -> PriceTag<'_> {
        PriceTag { amount: &self.price, currency: &self.currency }
    }
}

impl Availability {
    pub fn price_tag(&self) -> PriceTag<'_> {
        PriceTag { amount: &self.price, currency: &self.currency }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub price: BigDecimal,
    pub currency: String,
}

/// Total a booking of `units` owes for a product booked on a given slot.
///
/// Matching currencies (compared exactly as stored) are summed as-is. Otherwise
/// both prices are converted to the settlement currency one by one and the
/// converted per-unit amounts are each multiplied by `units` before summing.
pub async fn settle(
    normalizer: &CurrencyNormalizer,
    product: PriceTag<'_>,
    slot: PriceTag<'_>,
    units: i32,
) -> Result<Settlement, RateLookupError> {
    let units = BigDecimal::from(units);

    if product.currency == slot.currency {
        return Ok(Settlement {
            price: (product.amount + slot.amount) * &units,
            currency: product.currency.to_string(),
        });
    }

    let (product_amount, slot_amount) = futures::try_join!(
        normalizer.normalize(product.amount, product.currency, SETTLEMENT_CURRENCY),
        normalizer.normalize(slot.amount, slot.currency, SETTLEMENT_CURRENCY),
    )?;

    Ok(Settlement {
        price: product_amount * &units + slot_amount * &units,
        currency: SETTLEMENT_CURRENCY.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::testing::FixedRates;
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn tag<'a>(amount: &'a BigDecimal, currency: &'a str) -> PriceTag<'a> {
        PriceTag { amount, currency }
    }

    #[tokio::test]
    async fn same_currency_sums_then_multiplies() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("50"), dec("20"));

        let settlement = settle(&normalizer, tag(&product, "USD"), tag(&slot, "USD"), 3)
            .await
            .unwrap();

        assert_eq!(settlement.price, dec("210"));
        assert_eq!(settlement.currency, "USD");
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn same_foreign_currency_is_not_converted() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("10"), dec("5"));

        let settlement = settle(&normalizer, tag(&product, "EUR"), tag(&slot, "EUR"), 2)
            .await
            .unwrap();

        assert_eq!(settlement, Settlement { price: dec("30"), currency: "EUR".into() });
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn mixed_currencies_settle_in_usd() {
        let rates = Arc::new(FixedRates::default().with("EUR", "USD", "1.1"));
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("50"), dec("100"));

        let settlement = settle(&normalizer, tag(&product, "USD"), tag(&slot, "EUR"), 2)
            .await
            .unwrap();

        assert_eq!(settlement.price, dec("320"));
        assert_eq!(settlement.currency, "USD");
        assert_eq!(rates.calls(), 1);
    }

    #[tokio::test]
    async fn each_side_is_converted_independently() {
        let rates = Arc::new(
            FixedRates::default()
                .with("EUR", "USD", "1.1")
                .with("GBP", "USD", "1.25"),
        );
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("40"), dec("8"));

        let settlement = settle(&normalizer, tag(&product, "GBP"), tag(&slot, "EUR"), 3)
            .await
            .unwrap();

        // 40 * 1.25 * 3 + 8 * 1.1 * 3
        assert_eq!(settlement.price, dec("176.4"));
        assert_eq!(rates.calls(), 2);
    }

    #[tokio::test]
    async fn currency_match_is_case_sensitive() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("50"), dec("20"));

        let settlement = settle(&normalizer, tag(&product, "USD"), tag(&slot, "usd"), 1)
            .await
            .unwrap();

        assert_eq!(settlement, Settlement { price: dec("70"), currency: "USD".into() });
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn zero_priced_side_needs_no_rate() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());
        let (product, slot) = (dec("25"), dec("0"));

        let settlement = settle(&normalizer, tag(&product, "USD"), tag(&slot, "EUR"), 4)
            .await
            .unwrap();

        assert_eq!(settlement.price, dec("100"));
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn missing_rate_fails_the_settlement() {
        let normalizer = CurrencyNormalizer::new(Arc::new(FixedRates::default()));
        let (product, slot) = (dec("25"), dec("10"));

        let result = settle(&normalizer, tag(&product, "USD"), tag(&slot, "JPY"), 1).await;

        assert!(matches!(result, Err(RateLookupError::RateNotAvailable { .. })));
    }
}
