//! Price normalization.
//!
//! Both oracle modes collapse into one uniform representation: an integer
//! multiplier over `10^decimals`, where `decimals` already includes the
//! asset's extra-decimal padding. Pull-oracle rounds are used as-is after a
//! recency check; push-oracle quotes are scaled from the feed's exponent,
//! optionally combined with a derived-price rate, and checked against a
//! staleness bound. Statically configured default prices bypass the oracle
//! entirely.

use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::error::LiquidationError;
use crate::math;
use burrow_chain::views::{PriceDataView, PriceView, PythQuoteView, TokenPythInfoView};

/// Denominator of derived-price rates (10^24).
fn rate_denominator() -> BigDecimal {
    math::pow10(24)
}

/// Uniform fixed-point price: `multiplier / 10^decimals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub multiplier: u128,
    pub decimals: u8,
}

impl Price {
    fn from_view(view: &PriceView) -> Option<Self> {
        Some(Self {
            multiplier: math::parse_amount(&view.multiplier)?,
            decimals: view.decimals,
        })
    }
}

/// Price table for one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Prices {
    prices: HashMap<String, Price>,
}

impl Prices {
    pub fn get(&self, token_id: &str) -> Result<&Price, LiquidationError> {
        self.prices
            .get(token_id)
            .ok_or_else(|| LiquidationError::UnknownAsset(token_id.to_string()))
    }

    pub fn insert(&mut self, token_id: String, price: Price) {
        self.prices.insert(token_id, price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Parse a pull-oracle round, rejecting it wholesale when older than its
    /// own recency window. Assets the oracle has no quote for are skipped.
    pub fn from_price_data(
        data: &PriceDataView,
        now_epoch_secs: i64,
    ) -> Result<Self, LiquidationError> {
        let round_secs = data
            .timestamp
            .parse::<i128>()
            .map(|nanos| (nanos / 1_000_000_000) as i64)
            .map_err(|e| LiquidationError::MalformedView(format!("oracle timestamp: {e}")))?;
        let recency_secs = data
            .recency_duration_sec
            .parse::<i64>()
            .map_err(|e| LiquidationError::MalformedView(format!("recency duration: {e}")))?;
        let age_secs = now_epoch_secs - round_secs;
        if age_secs > recency_secs {
            return Err(LiquidationError::StalePrice {
                token_id: "price-oracle round".to_string(),
                age_secs,
                max_age_secs: recency_secs,
            });
        }

        let mut prices = Prices::default();
        for entry in &data.prices {
            if let Some(price) = entry.price.as_ref().and_then(Price::from_view) {
                prices.insert(entry.asset_id.clone(), price);
            }
        }
        Ok(prices)
    }
}

/// Normalize one push-oracle quote.
///
/// `derived_rate` is the result of the asset's extra call when configured
/// (`None` otherwise). A missing quote, or one published outside the
/// staleness bound, fails the whole pass.
pub fn normalize_pyth(
    token_id: &str,
    info: &TokenPythInfoView,
    quote: Option<&PythQuoteView>,
    derived_rate: Option<&str>,
    now_epoch_secs: i64,
    max_age_secs: i64,
) -> Result<Price, LiquidationError> {
    if let Some(default_price) = &info.default_price {
        return Price::from_view(default_price).ok_or_else(|| {
            LiquidationError::MalformedView(format!("default price for {token_id}"))
        });
    }

    let quote = quote.ok_or_else(|| LiquidationError::StalePrice {
        token_id: token_id.to_string(),
        age_secs: max_age_secs + 1,
        max_age_secs,
    })?;
    let age_secs = now_epoch_secs - quote.publish_time;
    if age_secs > max_age_secs {
        return Err(LiquidationError::StalePrice {
            token_id: token_id.to_string(),
            age_secs,
            max_age_secs,
        });
    }

    let raw = math::parse_decimal(&quote.price)
        .ok_or_else(|| LiquidationError::MalformedView(format!("pyth price for {token_id}")))?;
    let scaled = if quote.expo >= 0 {
        raw * math::pow10(quote.expo as u32)
    } else {
        math::div(&raw, &math::pow10(quote.expo.unsigned_abs()))
    };

    let with_rate = match (info.extra_call.as_ref(), derived_rate) {
        (Some(_), Some(rate)) => {
            let rate = math::parse_decimal(rate).ok_or_else(|| {
                LiquidationError::MalformedView(format!("derived rate for {token_id}"))
            })?;
            scaled * rate / rate_denominator()
        }
        (Some(method), None) => {
            return Err(LiquidationError::MalformedView(format!(
                "missing derived rate {method} for {token_id}"
            )));
        }
        _ => scaled,
    };

    let multiplier = math::round_half_up(&(with_rate * math::pow10(info.fraction_digits as u32)));
    let multiplier = math::floor_to_u128(&multiplier);
    Ok(Price {
        multiplier,
        decimals: info.fraction_digits + info.decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_chain::views::AssetPriceView;

    fn pyth_info(decimals: u8, fraction_digits: u8) -> TokenPythInfoView {
        TokenPythInfoView {
            price_identifier: "f9c0172ba10dfa4d19088d94f5bf61d3b54d5bd7483a322a982e1373ee8ea31b".into(),
            decimals,
            fraction_digits,
            extra_call: None,
            default_price: None,
        }
    }

    #[test]
    fn pyth_quote_scales_exponent() {
        // $3.25 quoted as 325000000 * 10^-8, 4 fraction digits.
        let quote = PythQuoteView {
            price: "325000000".into(),
            expo: -8,
            publish_time: 1_000,
        };
        let price = normalize_pyth("wrap.near", &pyth_info(24, 4), Some(&quote), None, 1_010, 60)
            .unwrap();
        assert_eq!(price.multiplier, 32_500);
        assert_eq!(price.decimals, 28);
    }

    #[test]
    fn default_price_bypasses_oracle() {
        let mut info = pyth_info(18, 4);
        info.default_price = Some(PriceView {
            multiplier: "10000".into(),
            decimals: 22,
        });
        // No quote at all: still fine.
        let price = normalize_pyth("usn", &info, None, None, 0, 60).unwrap();
        assert_eq!(price.multiplier, 10_000);
        assert_eq!(price.decimals, 22);
    }

    #[test]
    fn stale_quote_is_rejected() {
        let quote = PythQuoteView {
            price: "100000000".into(),
            expo: -8,
            publish_time: 1_000,
        };
        let result = normalize_pyth("usdt.near", &pyth_info(6, 4), Some(&quote), None, 1_100, 60);
        assert!(matches!(result, Err(LiquidationError::StalePrice { .. })));
    }

    #[test]
    fn missing_quote_is_stale() {
        let result = normalize_pyth("usdt.near", &pyth_info(6, 4), None, None, 0, 60);
        assert!(matches!(result, Err(LiquidationError::StalePrice { .. })));
    }

    #[test]
    fn derived_rate_multiplies_quote() {
        // Underlying at $4.00, LST rate 1.25 (in 10^24 units).
        let mut info = pyth_info(24, 4);
        info.extra_call = Some("ft_price".into());
        let quote = PythQuoteView {
            price: "400000000".into(),
            expo: -8,
            publish_time: 50,
        };
        let rate = "1250000000000000000000000"; // 1.25
        let price =
            normalize_pyth("stnear.near", &info, Some(&quote), Some(rate), 60, 60).unwrap();
        assert_eq!(price.multiplier, 50_000); // 5.00 in 4 fraction digits
    }

    #[test]
    fn pull_round_within_recency_parses() {
        let data = PriceDataView {
            timestamp: "1700000000000000000".into(),
            recency_duration_sec: "90".into(),
            prices: vec![
                AssetPriceView {
                    asset_id: "usdc.near".into(),
                    price: Some(PriceView { multiplier: "10000".into(), decimals: 10 }),
                },
                AssetPriceView { asset_id: "unlisted.near".into(), price: None },
            ],
        };
        let prices = Prices::from_price_data(&data, 1_700_000_030).unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("usdc.near").unwrap().multiplier, 10_000);
        assert!(prices.get("unlisted.near").is_err());
    }

    #[test]
    fn pull_round_outside_recency_aborts() {
        let data = PriceDataView {
            timestamp: "1700000000000000000".into(),
            recency_duration_sec: "90".into(),
            prices: vec![],
        };
        let result = Prices::from_price_data(&data, 1_700_000_200);
        assert!(matches!(result, Err(LiquidationError::StalePrice { .. })));
    }
}
