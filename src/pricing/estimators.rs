/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Price estimators: turn a quote plus a signed quantity into a fill price.
//!
//! Each variant implements one of the rules a real paper-trading engine needs
//! to approximate execution quality — from the trivial midpoint to a
//! composite weighted estimator. All estimators round to two decimal places
//! unless the options tick-size rule overrides that.

use chrono::Timelike;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::cell::RefCell;
use thiserror::Error;

use crate::model::quote::Quote;

/// Failure modes specific to price estimation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    /// Neither a valid bid/ask pair nor a last price was available.
    #[error("no usable bid/ask or last price in quote for {symbol}")]
    NoUsablePrice {
        /// The asset symbol the quote was for.
        symbol: String,
    },
    /// A direction-sensitive estimator was called without a signed quantity.
    #[error("estimator requires a non-zero signed quantity")]
    MissingQuantity,
    /// Every sub-estimator of a [`Estimator::Multi`] failed.
    #[error("all sub-estimators failed")]
    AllFailed,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Rounds an option price to the nearest nickel below $3.00, dime at/above.
fn round_option_tick(value: Decimal) -> Decimal {
    if value < dec!(3.00) {
        (value / dec!(0.05)).round() * dec!(0.05)
    } else {
        (value / dec!(0.10)).round() * dec!(0.10)
    }
}

fn valid_bid_ask(quote: &Quote) -> Option<(Decimal, Decimal)> {
    match (quote.bid, quote.ask) {
        (Some(bid), Some(ask)) if bid > Decimal::ZERO && ask > Decimal::ZERO => Some((bid, ask)),
        _ => None,
    }
}

fn symbol_of(quote: &Quote) -> String {
    quote.asset.symbol().to_string()
}

/// A configured price-estimation rule.
pub enum Estimator {
    /// Mid of bid/ask; falls back to last price.
    Midpoint,
    /// Buys pay ask, sells receive bid; falls back to mid if quote is incomplete.
    Market,
    /// `s ∈ [-1, 1]`; positive favours the caller.
    Slippage(Decimal),
    /// Always returns the configured price.
    Fixed(Decimal),
    /// `k ∈ [0, 1]`; worsens the fill by `spread · min(|qty|/visible_size, 1) · k`.
    VolumeWeighted(Decimal),
    /// Combined base-slippage, size-impact, and volatility-uplift model.
    Realistic {
        /// Base market-microstructure slippage, `[0, 1]`.
        base_slippage: Decimal,
        /// Order-size impact factor, `[0, 1]`.
        size_impact: Decimal,
        /// Volatility uplift factor, `[0, 1]`.
        volatility_impact: Decimal,
    },
    /// Options-specific spread capture with tick-size rounding.
    Options {
        /// `[0, 1]` fraction of the spread captured from the adverse side.
        spread_factor: Decimal,
    },
    /// Midpoint perturbed by a seeded Gaussian random walk, clamped to ±20%.
    RandomWalk {
        /// Daily volatility used to scale the intraday perturbation.
        volatility: Decimal,
        /// The estimator's own seeded RNG.
        rng: RefCell<StdRng>,
    },
    /// Weighted combination of named sub-estimators; failures are skipped and
    /// the remaining weights renormalised.
    Multi(Vec<(String, Box<Estimator>, Decimal)>),
}

impl Estimator {
    /// Convenience constructor for [`Estimator::RandomWalk`] from an integer seed.
    pub fn random_walk(volatility: Decimal, seed: u64) -> Self {
        Estimator::RandomWalk {
            volatility,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Estimates the fill price for `quote` given a signed `quantity`
    /// (positive = buy, negative = sell).
    pub fn estimate(&self, quote: &Quote, quantity: i64) -> Result<Decimal, EstimatorError> {
        match self {
            Estimator::Midpoint => Self::midpoint(quote),
            Estimator::Market => Self::market(quote, quantity),
            Estimator::Slippage(s) => Self::slippage(quote, quantity, *s),
            Estimator::Fixed(price) => Ok(*price),
            Estimator::VolumeWeighted(k) => Self::volume_weighted(quote, quantity, *k),
            Estimator::Realistic {
                base_slippage,
                size_impact,
                volatility_impact,
            } => Self::realistic(quote, quantity, *base_slippage, *size_impact, *volatility_impact),
            Estimator::Options { spread_factor } => Self::options(quote, quantity, *spread_factor),
            Estimator::RandomWalk { volatility, rng } => Self::random_walk_estimate(quote, quantity, *volatility, rng),
            Estimator::Multi(sub) => Self::multi(quote, quantity, sub),
        }
    }

    fn midpoint(quote: &Quote) -> Result<Decimal, EstimatorError> {
        if let Some(mid) = quote.mid() {
            return Ok(round2(mid));
        }
        if let Some(last) = quote.last.filter(|p| *p > Decimal::ZERO) {
            return Ok(round2(last));
        }
        Err(EstimatorError::NoUsablePrice { symbol: symbol_of(quote) })
    }

    fn market(quote: &Quote, quantity: i64) -> Result<Decimal, EstimatorError> {
        let Some((bid, ask)) = valid_bid_ask(quote) else {
            return Self::midpoint(quote);
        };
        if quantity == 0 {
            return Ok(round2((bid + ask) / dec!(2)));
        }
        Ok(round2(if quantity > 0 { ask } else { bid }))
    }

    fn slippage(quote: &Quote, quantity: i64, s: Decimal) -> Result<Decimal, EstimatorError> {
        let Some((bid, ask)) = valid_bid_ask(quote) else {
            return Err(EstimatorError::NoUsablePrice { symbol: symbol_of(quote) });
        };
        if quantity == 0 {
            return Err(EstimatorError::MissingQuantity);
        }
        let half_spread = (ask - bid) / dec!(2);
        let mid = bid + half_spread;
        let price = if quantity > 0 {
            mid - half_spread * s
        } else {
            mid + half_spread * s
        };
        Ok(round2(price))
    }

    fn volume_weighted(quote: &Quote, quantity: i64, k: Decimal) -> Result<Decimal, EstimatorError> {
        let Some((bid, ask)) = valid_bid_ask(quote) else {
            return Self::midpoint(quote);
        };
        if quantity == 0 {
            return Ok(round2((bid + ask) / dec!(2)));
        }
        let visible_size = if quantity > 0 { quote.ask_size } else { quote.bid_size };
        let Some(visible_size) = visible_size.filter(|s| *s > 0) else {
            return Self::market(quote, quantity);
        };
        let order_size = Decimal::from(quantity.unsigned_abs());
        let ratio = (order_size / Decimal::from(visible_size)).min(Decimal::ONE);
        let spread = ask - bid;
        let impact = spread * ratio * k;
        let base = if quantity > 0 { ask } else { bid };
        Ok(round2(if quantity > 0 { base + impact } else { base - impact }))
    }

    fn time_of_day_factor() -> Decimal {
        let now = chrono::Utc::now().time();
        let minutes = now.hour() as i64 * 60 + now.minute() as i64;
        // US market hours convention: 9:30 open, 16:00 close, first/last half hour elevated.
        let open = 9 * 60 + 30;
        let close = 16 * 60;
        if minutes < open || minutes >= close {
            return Decimal::ONE;
        }
        if minutes < open + 30 || minutes >= close - 30 {
            dec!(1.3)
        } else {
            Decimal::ONE
        }
    }

    fn realistic(
        quote: &Quote,
        quantity: i64,
        base_slippage: Decimal,
        size_impact: Decimal,
        volatility_impact: Decimal,
    ) -> Result<Decimal, EstimatorError> {
        let Some((bid, ask)) = valid_bid_ask(quote) else {
            return Self::midpoint(quote);
        };
        if quantity == 0 {
            return Ok(round2((bid + ask) / dec!(2)));
        }
        let spread = ask - bid;
        let mid = bid + spread / dec!(2);

        let base_impact = spread * base_slippage * dec!(0.5);

        const TYPICAL_SIZE: u64 = 100;
        let order_size = quantity.unsigned_abs();
        let available_size = if quantity > 0 { quote.ask_size } else { quote.bid_size };
        let size_ratio = match available_size.filter(|s| *s > 0) {
            Some(size) => Decimal::from(order_size) / Decimal::from(size.max(TYPICAL_SIZE)),
            None => Decimal::from(order_size) / Decimal::from(TYPICAL_SIZE),
        };
        let size_ratio_sqrt = size_ratio.to_f64().unwrap_or(0.0).max(0.0).sqrt();
        let size_ratio_sqrt = Decimal::try_from(size_ratio_sqrt).unwrap_or(Decimal::ZERO);
        let size_impact_amount = spread * size_impact * size_ratio_sqrt;

        let volatility_factor = match quote.greeks.as_ref().map(|g| g.iv) {
            Some(iv) => Decimal::ONE + iv * volatility_impact,
            None => {
                if mid > Decimal::ZERO && spread / mid > dec!(0.05) {
                    dec!(1.2)
                } else {
                    Decimal::ONE
                }
            }
        };

        let time_factor = Self::time_of_day_factor();
        let total_impact = (base_impact + size_impact_amount) * volatility_factor * time_factor;

        Ok(round2(if quantity > 0 { mid + total_impact } else { mid - total_impact }))
    }

    fn options(quote: &Quote, quantity: i64, spread_factor: Decimal) -> Result<Decimal, EstimatorError> {
        let Some((bid, ask)) = valid_bid_ask(quote) else {
            if let Some(last) = quote.last.filter(|p| *p > Decimal::ZERO) {
                return Ok(round2(last));
            }
            return Err(EstimatorError::NoUsablePrice { symbol: symbol_of(quote) });
        };
        let spread = ask - bid;
        if quantity == 0 {
            return Ok(round_option_tick(bid + spread * dec!(0.6)));
        }
        let price = if quantity > 0 {
            ask - spread * spread_factor
        } else {
            bid + spread * spread_factor
        };
        Ok(round_option_tick(price))
    }

    fn random_walk_estimate(
        quote: &Quote,
        quantity: i64,
        volatility: Decimal,
        rng: &RefCell<StdRng>,
    ) -> Result<Decimal, EstimatorError> {
        let base_price = Self::midpoint(quote)?;
        let base_f64 = base_price.to_f64().unwrap_or(0.0);
        let vol_f64 = volatility.to_f64().unwrap_or(0.0);
        let intraday_vol = vol_f64 / (252.0_f64 * 6.5).sqrt();
        let normal = Normal::new(0.0, intraday_vol.max(0.0)).unwrap_or(Normal::new(0.0, 1e-9).unwrap());
        let random_factor = {
            let mut rng = rng.borrow_mut();
            normal.sample(&mut *rng)
        };
        let adjusted = base_f64 * (1.0 + random_factor);
        let adjusted = adjusted.clamp(base_f64 * 0.8, base_f64 * 1.2);
        let _ = quantity;
        Decimal::try_from(adjusted)
            .map(round2)
            .map_err(|_| EstimatorError::NoUsablePrice { symbol: symbol_of(quote) })
    }

    fn multi(quote: &Quote, quantity: i64, sub: &[(String, Box<Estimator>, Decimal)]) -> Result<Decimal, EstimatorError> {
        let mut weighted_sum = Decimal::ZERO;
        let mut total_weight = Decimal::ZERO;
        for (_name, estimator, weight) in sub {
            if let Ok(price) = estimator.estimate(quote, quantity) {
                weighted_sum += price * weight;
                total_weight += weight;
            }
        }
        if total_weight == Decimal::ZERO {
            return Err(EstimatorError::AllFailed);
        }
        Ok(round2(weighted_sum / total_weight))
    }
}

/// Builds an estimator by name for config-driven wiring.
pub fn estimator_for_name(name: &str) -> Option<Estimator> {
    match name.to_ascii_lowercase().as_str() {
        "midpoint" => Some(Estimator::Midpoint),
        "market" => Some(Estimator::Market),
        "slippage" => Some(Estimator::Slippage(Decimal::ZERO)),
        "fixed" => Some(Estimator::Fixed(Decimal::ZERO)),
        "volume" => Some(Estimator::VolumeWeighted(dec!(0.1))),
        "realistic" => Some(Estimator::Realistic {
            base_slippage: dec!(0.1),
            size_impact: dec!(0.05),
            volatility_impact: dec!(0.02),
        }),
        "options" => Some(Estimator::Options { spread_factor: dec!(0.3) }),
        "random" => Some(Estimator::random_walk(dec!(0.01), 0)),
        _ => None,
    }
}

/// Preset configurations mirroring common scenario profiles.
pub fn estimator_preset(preset: &str) -> Option<Estimator> {
    match preset {
        "conservative" => Some(Estimator::Realistic {
            base_slippage: dec!(0.2),
            size_impact: dec!(0.1),
            volatility_impact: dec!(0.05),
        }),
        "aggressive" => Some(Estimator::Realistic {
            base_slippage: dec!(0.05),
            size_impact: dec!(0.02),
            volatility_impact: dec!(0.01),
        }),
        "realistic" => Some(Estimator::Realistic {
            base_slippage: dec!(0.1),
            size_impact: dec!(0.05),
            volatility_impact: dec!(0.02),
        }),
        "options" => Some(Estimator::Options { spread_factor: dec!(0.3) }),
        "test" => Some(Estimator::random_walk(dec!(0.005), 42)),
        _ => None,
    }
}

#[cfg(test)]
mod tests_estimators {
    use super::*;
    use crate::model::asset::asset_for;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn quote_with(bid: Option<Decimal>, ask: Option<Decimal>, last: Option<Decimal>) -> Quote {
        Quote::new(
            asset_for("AAPL").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 11)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            bid,
            ask,
            last,
            Some(100),
            Some(100),
            None,
            None,
            dec!(0.05),
            None,
        )
    }

    #[test]
    fn midpoint_symmetric_regardless_of_quantity_sign() {
        let quote = quote_with(Some(dec!(149.50)), Some(dec!(150.50)), None);
        let buy = Estimator::Midpoint.estimate(&quote, 100).unwrap();
        let sell = Estimator::Midpoint.estimate(&quote, -100).unwrap();
        assert_eq!(buy, sell);
        assert_eq!(buy, dec!(150.00));
    }

    #[test]
    fn midpoint_falls_back_to_last() {
        let quote = quote_with(None, None, Some(dec!(150.00)));
        assert_eq!(Estimator::Midpoint.estimate(&quote, 1).unwrap(), dec!(150.00));
    }

    #[test]
    fn midpoint_errors_without_any_price() {
        let quote = quote_with(None, None, None);
        assert!(Estimator::Midpoint.estimate(&quote, 1).is_err());
    }

    #[test]
    fn market_buys_pay_ask_sells_receive_bid() {
        let quote = quote_with(Some(dec!(149.50)), Some(dec!(150.50)), None);
        assert_eq!(Estimator::Market.estimate(&quote, 100).unwrap(), dec!(150.50));
        assert_eq!(Estimator::Market.estimate(&quote, -100).unwrap(), dec!(149.50));
    }

    #[test]
    fn slippage_symmetric_for_opposite_signs() {
        let quote = quote_with(Some(dec!(149.00)), Some(dec!(151.00)), None);
        let buy_favorable = Estimator::Slippage(dec!(0.5)).estimate(&quote, 100).unwrap();
        let sell_favorable = Estimator::Slippage(dec!(-0.5)).estimate(&quote, -100).unwrap();
        assert_eq!(buy_favorable, sell_favorable);
    }

    #[test]
    fn fixed_always_returns_configured_price() {
        let quote = quote_with(None, None, None);
        assert_eq!(Estimator::Fixed(Decimal::ZERO).estimate(&quote, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn volume_weighted_worsens_with_size() {
        let quote = quote_with(Some(dec!(149.00)), Some(dec!(151.00)), None);
        let small = Estimator::VolumeWeighted(dec!(1.0)).estimate(&quote, 10).unwrap();
        let large = Estimator::VolumeWeighted(dec!(1.0)).estimate(&quote, 200).unwrap();
        assert!(large >= small);
    }

    #[test]
    fn options_rounds_to_tick_size() {
        let quote = quote_with(Some(dec!(2.90)), Some(dec!(3.10)), None);
        let price = Estimator::Options { spread_factor: dec!(0.5) }.estimate(&quote, 1).unwrap();
        assert_eq!(price % dec!(0.05), Decimal::ZERO);
    }

    #[test]
    fn multi_renormalises_after_a_failed_sub_estimator() {
        let quote = quote_with(None, None, Some(dec!(150.00)));
        let sub = vec![
            ("midpoint".to_string(), Box::new(Estimator::Midpoint), dec!(0.5)),
            (
                "slippage".to_string(),
                Box::new(Estimator::Slippage(dec!(0.0))),
                dec!(0.5),
            ),
        ];
        // Slippage requires bid/ask, which this quote lacks — it should be skipped.
        let price = Estimator::Multi(sub).estimate(&quote, 1).unwrap();
        assert_eq!(price, dec!(150.00));
    }

    #[test]
    fn multi_errors_when_every_sub_estimator_fails() {
        let quote = quote_with(None, None, None);
        let sub = vec![(
            "slippage".to_string(),
            Box::new(Estimator::Slippage(dec!(0.0))),
            dec!(1.0),
        )];
        assert!(Estimator::Multi(sub).estimate(&quote, 1).is_err());
    }

    #[test]
    fn random_walk_stays_within_twenty_percent_band() {
        let quote = quote_with(Some(dec!(149.50)), Some(dec!(150.50)), None);
        let estimator = Estimator::random_walk(dec!(0.5), 7);
        let price = estimator.estimate(&quote, 1).unwrap();
        assert!(price >= dec!(120.00) && price <= dec!(180.00));
    }

    #[test]
    fn estimator_for_name_recognises_known_names() {
        assert!(estimator_for_name("midpoint").is_some());
        assert!(estimator_for_name("unknown").is_none());
    }

    #[test]
    fn preset_options_matches_named_options_estimator() {
        let preset = estimator_preset("options");
        assert!(matches!(preset, Some(Estimator::Options { .. })));
        let _ = Utc.with_ymd_and_hms(2025, 2, 11, 9, 30, 0).unwrap();
    }
}
