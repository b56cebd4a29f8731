/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! The strategy recogniser: a pure function that greedily groups an
//! account's positions into the canonical [`Strategy`] variants.
//!
//! Positions are grouped by underlying symbol first (every multi-leg pattern
//! the recogniser knows about trades a single underlying), then each group is
//! run through the detectors in a fixed detection order — covered
//! call/put, protective, vertical spread, calendar/diagonal, straddle,
//! strangle, butterfly, iron condor, iron butterfly — each consuming whole
//! positions (never a fraction of one) until exhausted. Leftover positions
//! become their bare single-leg strategy; the recogniser never mutates a
//! position and never persists its output.

use crate::model::asset::Asset;
use crate::model::position::Position;
use crate::model::strategy::{SpreadParams, Strategy};
use crate::model::types::OptionStyle;
use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Recognises every strategy in `positions`, grouped by underlying symbol.
/// The result is a partition of `positions` with no overlap: every position
/// is consumed by exactly one returned [`Strategy`].
pub fn recognise(positions: &BTreeMap<String, Position>) -> Vec<Strategy> {
    let groups: BTreeMap<String, Vec<&Position>> =
        positions.values().into_group_map_by(|position| match &position.asset {
            Asset::Stock { symbol } => symbol.clone(),
            Asset::Option(opt) => opt.underlying.clone(),
        }).into_iter().collect();

    let mut strategies = Vec::new();
    for (_underlying, group) in groups {
        strategies.extend(recognise_group(group));
    }
    strategies
}

fn sort_key(position: &Position) -> (Decimal, NaiveDate, String) {
    let earliest = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
    match &position.asset {
        Asset::Stock { symbol } => (-Decimal::ONE, earliest, symbol.clone()),
        Asset::Option(opt) => (opt.strike.to_dec(), opt.expiration, opt.symbol.clone()),
    }
}

fn recognise_group(mut remaining: Vec<&Position>) -> Vec<Strategy> {
    remaining.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut strategies = Vec::new();
    macro_rules! drain_matches {
        ($detector:expr) => {
            while let Some(strategy) = $detector(&mut remaining) {
                strategies.push(strategy);
            }
        };
    }
    // Wider structures (4-leg iron shapes, 3-leg butterflies) are detected
    // before the 2-leg vertical-spread scan: a vertical spread matches any
    // two same-type legs of opposite sign and equal magnitude, which is also
    // true of an iron condor's put pair and call pair taken separately, so
    // draining verticals first would consume the iron shape's legs as two
    // plain spreads and the iron detectors would never get to run.
    drain_matches!(detect_covered_call);
    drain_matches!(detect_covered_put);
    drain_matches!(detect_protective);
    drain_matches!(detect_iron_condor);
    drain_matches!(detect_iron_butterfly);
    drain_matches!(detect_butterfly);
    drain_matches!(detect_vertical_spread);
    drain_matches!(detect_calendar_diagonal);
    drain_matches!(detect_straddle);
    drain_matches!(detect_strangle);

    for position in remaining {
        strategies.push(classify_single(position));
    }
    strategies
}

fn remove_by_symbols(remaining: &mut Vec<&Position>, symbols: &[&str]) {
    remaining.retain(|p| !symbols.contains(&p.asset.symbol()));
}

fn classify_single(position: &Position) -> Strategy {
    let symbol = position.asset.symbol().to_string();
    match &position.asset {
        Asset::Stock { .. } => {
            if position.quantity > 0 {
                Strategy::LongStock { symbol }
            } else {
                Strategy::ShortStock { symbol }
            }
        }
        Asset::Option(opt) => match (opt.option_style, position.quantity > 0) {
            (OptionStyle::Call, true) => Strategy::LongCall { symbol },
            (OptionStyle::Call, false) => Strategy::ShortCall { symbol },
            (OptionStyle::Put, true) => Strategy::LongPut { symbol },
            (OptionStyle::Put, false) => Strategy::ShortPut { symbol },
        },
    }
}

/// 100·n long stock + n short call at strike ≥ spot. Spot falls back to the
/// stock's average entry price when no current price is cached.
fn detect_covered_call(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    let stock = remaining
        .iter()
        .find(|p| matches!(&p.asset, Asset::Stock { .. }) && p.quantity > 0)?;
    let stock_symbol = stock.asset.symbol().to_string();
    let spot = stock.current_price.unwrap_or(stock.avg_price);
    let stock_qty = stock.quantity;

    let call = remaining.iter().find(|p| match &p.asset {
        Asset::Option(opt) => {
            opt.option_style == OptionStyle::Call
                && opt.underlying == stock_symbol
                && p.quantity < 0
                && stock_qty == -p.quantity * 100
                && opt.strike.to_dec() >= spot
        }
        _ => false,
    })?;
    let call_symbol = call.asset.symbol().to_string();
    remove_by_symbols(remaining, &[stock_symbol.as_str(), call_symbol.as_str()]);
    Some(Strategy::CoveredCall { stock_symbol, call_symbol })
}

/// 100·n short stock + n short put at strike ≤ spot.
fn detect_covered_put(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    let stock = remaining
        .iter()
        .find(|p| matches!(&p.asset, Asset::Stock { .. }) && p.quantity < 0)?;
    let stock_symbol = stock.asset.symbol().to_string();
    let spot = stock.current_price.unwrap_or(stock.avg_price);
    let stock_qty_abs = stock.quantity.unsigned_abs();

    let put = remaining.iter().find(|p| match &p.asset {
        Asset::Option(opt) => {
            opt.option_style == OptionStyle::Put
                && opt.underlying == stock_symbol
                && p.quantity < 0
                && stock_qty_abs == p.quantity.unsigned_abs() * 100
                && opt.strike.to_dec() <= spot
        }
        _ => false,
    })?;
    let put_symbol = put.asset.symbol().to_string();
    remove_by_symbols(remaining, &[stock_symbol.as_str(), put_symbol.as_str()]);
    Some(Strategy::CoveredPut { stock_symbol, put_symbol })
}

/// Long stock + long put, or short stock + long call, same underlying,
/// one contract hedging every 100 shares.
fn detect_protective(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    if let Some(stock) = remaining
        .iter()
        .find(|p| matches!(&p.asset, Asset::Stock { .. }) && p.quantity > 0)
    {
        let stock_symbol = stock.asset.symbol().to_string();
        let stock_qty = stock.quantity;
        if let Some(put) = remaining.iter().find(|p| match &p.asset {
            Asset::Option(opt) => {
                opt.option_style == OptionStyle::Put
                    && opt.underlying == stock_symbol
                    && p.quantity > 0
                    && stock_qty == p.quantity * 100
            }
            _ => false,
        }) {
            let option_symbol = put.asset.symbol().to_string();
            remove_by_symbols(remaining, &[stock_symbol.as_str(), option_symbol.as_str()]);
            return Some(Strategy::Protective { underlying_symbol: stock_symbol, option_symbol });
        }
    }

    let stock = remaining
        .iter()
        .find(|p| matches!(&p.asset, Asset::Stock { .. }) && p.quantity < 0)?;
    let stock_symbol = stock.asset.symbol().to_string();
    let stock_qty_abs = stock.quantity.unsigned_abs();
    let call = remaining.iter().find(|p| match &p.asset {
        Asset::Option(opt) => {
            opt.option_style == OptionStyle::Call
                && opt.underlying == stock_symbol
                && p.quantity > 0
                && stock_qty_abs == p.quantity.unsigned_abs() * 100
        }
        _ => false,
    })?;
    let option_symbol = call.asset.symbol().to_string();
    remove_by_symbols(remaining, &[stock_symbol.as_str(), option_symbol.as_str()]);
    Some(Strategy::Protective { underlying_symbol: stock_symbol, option_symbol })
}

/// Same-type options, same underlying and expiration, different strikes,
/// opposite quantities of equal magnitude.
fn detect_vertical_spread(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    let options: Vec<&Position> = remaining.iter().copied().filter(|p| p.asset.is_option()).collect();
    for a in options.iter().copied() {
        let Asset::Option(oa) = &a.asset else { continue };
        for b in options.iter().copied() {
            let Asset::Option(ob) = &b.asset else { continue };
            if oa.symbol == ob.symbol { continue; }
            if oa.option_style != ob.option_style || oa.underlying != ob.underlying { continue; }
            if oa.expiration != ob.expiration { continue; }
            if oa.strike == ob.strike { continue; }
            if a.quantity <= 0 || b.quantity >= 0 { continue; }
            if a.quantity != -b.quantity { continue; }

            let long_symbol = oa.symbol.clone();
            let short_symbol = ob.symbol.clone();
            let params = SpreadParams {
                long_strike: oa.strike.to_dec(),
                short_strike: ob.strike.to_dec(),
                width: (oa.strike.to_dec() - ob.strike.to_dec()).abs(),
            };
            remove_by_symbols(remaining, &[long_symbol.as_str(), short_symbol.as_str()]);
            return Some(match oa.option_style {
                OptionStyle::Call => Strategy::VerticalCallSpread { long_symbol, short_symbol, params },
                OptionStyle::Put => Strategy::VerticalPutSpread { long_symbol, short_symbol, params },
            });
        }
    }
    None
}

/// Same-type options, same underlying, **different** expirations, opposite
/// quantities of equal magnitude. Same strike = calendar, different strike =
/// diagonal.
fn detect_calendar_diagonal(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    let options: Vec<&Position> = remaining.iter().copied().filter(|p| p.asset.is_option()).collect();
    for a in options.iter().copied() {
        let Asset::Option(oa) = &a.asset else { continue };
        for b in options.iter().copied() {
            let Asset::Option(ob) = &b.asset else { continue };
            if oa.symbol == ob.symbol { continue; }
            if oa.option_style != ob.option_style || oa.underlying != ob.underlying { continue; }
            if oa.expiration >= ob.expiration { continue; }
            if a.quantity == 0 || b.quantity == 0 || a.quantity != -b.quantity { continue; }

            let near_symbol = oa.symbol.clone();
            let far_symbol = ob.symbol.clone();
            let is_calendar = oa.strike == ob.strike;
            remove_by_symbols(remaining, &[near_symbol.as_str(), far_symbol.as_str()]);
            return Some(if is_calendar {
                Strategy::CalendarSpread { near_symbol, far_symbol }
            } else {
                Strategy::DiagonalSpread { near_symbol, far_symbol }
            });
        }
    }
    None
}

/// Long call + long put (or short call + short put), same underlying, same
/// strike, same expiration, same magnitude.
fn detect_straddle(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    find_call_put_pair(remaining, |oc, op, call, put| {
        oc.strike == op.strike
            && call.quantity.signum() == put.quantity.signum()
            && call.quantity.abs() == put.quantity.abs()
    })
    .map(|(call_symbol, put_symbol)| Strategy::Straddle { call_symbol, put_symbol })
}

/// As straddle but different strikes, call strike above put strike.
fn detect_strangle(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    find_call_put_pair(remaining, |oc, op, call, put| {
        oc.strike.to_dec() > op.strike.to_dec()
            && call.quantity.signum() == put.quantity.signum()
            && call.quantity.abs() == put.quantity.abs()
    })
    .map(|(call_symbol, put_symbol)| Strategy::Strangle { call_symbol, put_symbol })
}

fn find_call_put_pair(
    remaining: &mut Vec<&Position>,
    matches_pair: impl Fn(&crate::model::asset::OptionAsset, &crate::model::asset::OptionAsset, &Position, &Position) -> bool,
) -> Option<(String, String)> {
    let calls: Vec<&Position> = remaining
        .iter()
        .copied()
        .filter(|p| matches!(&p.asset, Asset::Option(o) if o.option_style == OptionStyle::Call))
        .collect();
    let puts: Vec<&Position> = remaining
        .iter()
        .copied()
        .filter(|p| matches!(&p.asset, Asset::Option(o) if o.option_style == OptionStyle::Put))
        .collect();

    for call in calls.iter().copied() {
        let Asset::Option(oc) = &call.asset else { continue };
        for put in puts.iter().copied() {
            let Asset::Option(op) = &put.asset else { continue };
            if oc.underlying != op.underlying || oc.expiration != op.expiration { continue; }
            if !matches_pair(oc, op, call, put) { continue; }
            let call_symbol = oc.symbol.clone();
            let put_symbol = op.symbol.clone();
            remove_by_symbols(remaining, &[call_symbol.as_str(), put_symbol.as_str()]);
            return Some((call_symbol, put_symbol));
        }
    }
    None
}

/// Three strikes, same underlying/expiration/type, quantity pattern
/// `[+n, -2n, +n]` or `[-n, +2n, -n]` in ascending strike order.
fn detect_butterfly(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    let options: Vec<&Position> = remaining.iter().copied().filter(|p| p.asset.is_option()).collect();
    for lo in options.iter().copied() {
        let Asset::Option(ol) = &lo.asset else { continue };
        for mid in options.iter().copied() {
            let Asset::Option(om) = &mid.asset else { continue };
            if om.symbol == ol.symbol { continue; }
            for hi in options.iter().copied() {
                let Asset::Option(oh) = &hi.asset else { continue };
                if oh.symbol == ol.symbol || oh.symbol == om.symbol { continue; }

                if ol.option_style != om.option_style || om.option_style != oh.option_style { continue; }
                if ol.underlying != om.underlying || om.underlying != oh.underlying { continue; }
                if ol.expiration != om.expiration || om.expiration != oh.expiration { continue; }

                let (sl, sm, sh) = (ol.strike.to_dec(), om.strike.to_dec(), oh.strike.to_dec());
                if !(sl < sm && sm < sh) { continue; }

                let n = lo.quantity;
                if n == 0 || mid.quantity != -2 * n || hi.quantity != n { continue; }

                let low_symbol = ol.symbol.clone();
                let mid_symbol = om.symbol.clone();
                let high_symbol = oh.symbol.clone();
                remove_by_symbols(remaining, &[low_symbol.as_str(), mid_symbol.as_str(), high_symbol.as_str()]);
                return Some(Strategy::Butterfly { low_symbol, mid_symbol, high_symbol });
            }
        }
    }
    None
}

/// Four legs, same underlying and expiration: long low put, short higher
/// put, short lower call, long highest call, all of equal magnitude. When
/// `butterfly` is true, the two short strikes must coincide (iron
/// butterfly); otherwise they must differ (iron condor).
fn detect_iron_shape(remaining: &mut Vec<&Position>, butterfly: bool) -> Option<Strategy> {
    let puts: Vec<&Position> = remaining
        .iter()
        .copied()
        .filter(|p| matches!(&p.asset, Asset::Option(o) if o.option_style == OptionStyle::Put))
        .collect();
    let calls: Vec<&Position> = remaining
        .iter()
        .copied()
        .filter(|p| matches!(&p.asset, Asset::Option(o) if o.option_style == OptionStyle::Call))
        .collect();

    for long_put in puts.iter().copied() {
        let Asset::Option(olp) = &long_put.asset else { continue };
        for short_put in puts.iter().copied() {
            let Asset::Option(osp) = &short_put.asset else { continue };
            if olp.symbol == osp.symbol { continue; }
            if olp.underlying != osp.underlying || olp.expiration != osp.expiration { continue; }
            if long_put.quantity <= 0 || short_put.quantity >= 0 { continue; }
            let n = long_put.quantity;
            if short_put.quantity != -n { continue; }
            let sp_strike = osp.strike.to_dec();
            if olp.strike.to_dec() >= sp_strike { continue; }

            for short_call in calls.iter().copied() {
                let Asset::Option(osc) = &short_call.asset else { continue };
                if osc.underlying != olp.underlying || osc.expiration != olp.expiration { continue; }
                if short_call.quantity != -n { continue; }
                let sc_strike = osc.strike.to_dec();
                if sc_strike < sp_strike { continue; }
                let strikes_coincide = sc_strike == sp_strike;
                if strikes_coincide != butterfly { continue; }

                for long_call in calls.iter().copied() {
                    let Asset::Option(olc) = &long_call.asset else { continue };
                    if olc.symbol == osc.symbol { continue; }
                    if olc.underlying != olp.underlying || olc.expiration != olp.expiration { continue; }
                    if long_call.quantity != n { continue; }
                    if olc.strike.to_dec() <= sc_strike { continue; }

                    let long_put_symbol = olp.symbol.clone();
                    let short_put_symbol = osp.symbol.clone();
                    let short_call_symbol = osc.symbol.clone();
                    let long_call_symbol = olc.symbol.clone();
                    remove_by_symbols(
                        remaining,
                        &[
                            long_put_symbol.as_str(),
                            short_put_symbol.as_str(),
                            short_call_symbol.as_str(),
                            long_call_symbol.as_str(),
                        ],
                    );
                    return Some(if butterfly {
                        Strategy::IronButterfly { long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol }
                    } else {
                        Strategy::IronCondor { long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol }
                    });
                }
            }
        }
    }
    None
}

fn detect_iron_condor(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    detect_iron_shape(remaining, false)
}

fn detect_iron_butterfly(remaining: &mut Vec<&Position>) -> Option<Strategy> {
    detect_iron_shape(remaining, true)
}

#[cfg(test)]
mod tests_strategies {
    use super::*;
    use crate::model::asset::asset_for;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 9, 30, 0).unwrap()
    }

    fn positions(entries: Vec<(&str, i64, Decimal)>) -> BTreeMap<String, Position> {
        let mut map = BTreeMap::new();
        for (symbol, quantity, avg_price) in entries {
            let asset = asset_for(symbol).unwrap();
            let position = Position::open(asset, quantity, avg_price, now());
            map.insert(symbol.to_string(), position);
        }
        map
    }

    #[test]
    fn bare_long_stock_is_recognised_alone() {
        let positions = positions(vec![("AAPL", 100, dec!(150.0))]);
        let strategies = recognise(&positions);
        assert_eq!(strategies, vec![Strategy::LongStock { symbol: "AAPL".to_string() }]);
    }

    #[test]
    fn covered_call_consumes_stock_and_short_call() {
        let positions = positions(vec![
            ("AAPL", 100, dec!(150.0)),
            ("AAPL250221C00160000", -1, dec!(3.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        match &strategies[0] {
            Strategy::CoveredCall { stock_symbol, call_symbol } => {
                assert_eq!(stock_symbol, "AAPL");
                assert_eq!(call_symbol, "AAPL250221C00160000");
            }
            other => panic!("expected CoveredCall, got {other:?}"),
        }
    }

    #[test]
    fn vertical_credit_spread_is_recognised() {
        let positions = positions(vec![
            ("AAPL250221C00155000", 1, dec!(3.0)),
            ("AAPL250221C00150000", -1, dec!(5.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        match &strategies[0] {
            Strategy::VerticalCallSpread { long_symbol, short_symbol, params } => {
                assert_eq!(long_symbol, "AAPL250221C00155000");
                assert_eq!(short_symbol, "AAPL250221C00150000");
                assert_eq!(params.width, dec!(5.0));
            }
            other => panic!("expected VerticalCallSpread, got {other:?}"),
        }
    }

    #[test]
    fn long_straddle_is_recognised() {
        let positions = positions(vec![
            ("AAPL250221C00150000", 1, dec!(5.0)),
            ("AAPL250221P00150000", 1, dec!(4.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::Straddle { .. }));
    }

    #[test]
    fn strangle_requires_call_strike_above_put_strike() {
        let positions = positions(vec![
            ("AAPL250221C00160000", 1, dec!(3.0)),
            ("AAPL250221P00140000", 1, dec!(2.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::Strangle { .. }));
    }

    #[test]
    fn iron_condor_recognised_from_four_legs() {
        let positions = positions(vec![
            ("AAPL250221P00140000", 1, dec!(1.0)),
            ("AAPL250221P00145000", -1, dec!(2.0)),
            ("AAPL250221C00155000", -1, dec!(2.0)),
            ("AAPL250221C00160000", 1, dec!(1.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::IronCondor { .. }));
    }

    #[test]
    fn iron_butterfly_requires_coinciding_short_strikes() {
        let positions = positions(vec![
            ("AAPL250221P00140000", 1, dec!(1.0)),
            ("AAPL250221P00150000", -1, dec!(4.0)),
            ("AAPL250221C00150000", -1, dec!(4.0)),
            ("AAPL250221C00160000", 1, dec!(1.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::IronButterfly { .. }));
    }

    #[test]
    fn call_butterfly_recognised_from_wing_pattern() {
        let positions = positions(vec![
            ("AAPL250221C00145000", 1, dec!(8.0)),
            ("AAPL250221C00150000", -2, dec!(5.0)),
            ("AAPL250221C00155000", 1, dec!(3.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::Butterfly { .. }));
    }

    #[test]
    fn recognised_strategies_partition_the_input_with_no_overlap() {
        let positions = positions(vec![
            ("AAPL", 100, dec!(150.0)),
            ("AAPL250221C00160000", -1, dec!(3.0)),
            ("TSLA250221C00200000", 1, dec!(10.0)),
            ("TSLA250221P00200000", 1, dec!(8.0)),
        ]);
        let strategies = recognise(&positions);
        let mut consumed: Vec<&str> = strategies.iter().flat_map(|s| s.symbols()).collect();
        consumed.sort_unstable();
        let mut expected: Vec<&str> = positions.keys().map(String::as_str).collect();
        expected.sort_unstable();
        assert_eq!(consumed, expected);
    }

    #[test]
    fn protective_put_pairs_long_stock_with_long_put() {
        let positions = positions(vec![
            ("AAPL", 100, dec!(150.0)),
            ("AAPL250221P00140000", 1, dec!(2.0)),
        ]);
        let strategies = recognise(&positions);
        assert_eq!(strategies.len(), 1);
        assert!(matches!(strategies[0], Strategy::Protective { .. }));
    }
}
