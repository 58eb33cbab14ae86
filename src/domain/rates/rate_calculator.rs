//! Profit and rate calculation across the source and target fiat markets

use crate::domain::market::MarketAnalysis;
use crate::math;
use crate::shared::utils::round_to;
use super::{ArbitrageEstimate, ArbitrageRoute, RateEstimate, RateSheet, RouteChoice};

/// Arbitrage percentages are published with 2 decimals
const PCT_DECIMALS: u32 = 2;

/// Analyses of one fiat currency as seen by the rate calculator
#[derive(Debug, Clone, Copy)]
pub struct CurrencyView<'a> {
    pub fiat: &'a str,
    /// Top-of-book window, feeds remittance rates
    pub remittance_buy: &'a MarketAnalysis,
    pub remittance_sell: &'a MarketAnalysis,
    /// Full fetched sample, feeds arbitrage percentages
    pub full_buy: &'a MarketAnalysis,
    pub full_sell: &'a MarketAnalysis,
}

/// Rate calculator
#[derive(Debug, Clone)]
pub struct RateCalculator {
    pub margins_pct: Vec<f64>,
    pub rate_decimals: u32,
}

impl RateCalculator {
    pub fn new(margins_pct: Vec<f64>, rate_decimals: u32) -> Self {
        Self {
            margins_pct,
            rate_decimals,
        }
    }

    pub fn calculate(&self, source: CurrencyView<'_>, target: CurrencyView<'_>) -> RateSheet {
        RateSheet {
            forward: self.remittance_rates(
                source.fiat,
                target.fiat,
                source.remittance_buy,
                target.remittance_sell,
            ),
            reverse: self.remittance_rates(
                target.fiat,
                source.fiat,
                target.remittance_buy,
                source.remittance_sell,
            ),
            arbitrage: self.arbitrage(source, target),
        }
    }

    /// `(avg_buy(base) / avg_sell(quote)) * (1 + margin)` for every configured margin.
    /// Buying the asset with `base` and selling it for `quote` prices the
    /// base→quote remittance.
    pub fn remittance_rates(
        &self,
        base: &str,
        quote: &str,
        base_buy: &MarketAnalysis,
        quote_sell: &MarketAnalysis,
    ) -> Vec<RateEstimate> {
        let cross = match (base_buy.simple_mean(), quote_sell.simple_mean()) {
            (Some(buy), Some(sell)) => math::ratio(buy, sell),
            _ => None,
        };

        self.margins_pct
            .iter()
            .map(|margin| RateEstimate {
                base_currency: base.to_string(),
                quote_currency: quote.to_string(),
                margin_pct: *margin,
                value: cross.map(|c| round_to(c * (1.0 + margin / 100.0), self.rate_decimals)),
            })
            .collect()
    }

    /// Route A→asset→B: `(avg_sell(B) / avg_buy(A) - 1) * 100`, on weighted means
    pub fn arbitrage_route(
        &self,
        from: &str,
        to: &str,
        buy_from: &MarketAnalysis,
        sell_to: &MarketAnalysis,
    ) -> ArbitrageRoute {
        let pct = match (preferred_mean(buy_from), preferred_mean(sell_to)) {
            (Some(buy), Some(sell)) => math::pct_change(buy, sell).map(|p| round_to(p, PCT_DECIMALS)),
            _ => None,
        };
        ArbitrageRoute {
            from: from.to_string(),
            to: to.to_string(),
            pct,
        }
    }

    pub fn arbitrage(&self, source: CurrencyView<'_>, target: CurrencyView<'_>) -> ArbitrageEstimate {
        let source_to_target =
            self.arbitrage_route(source.fiat, target.fiat, source.full_buy, target.full_sell);
        let target_to_source =
            self.arbitrage_route(target.fiat, source.fiat, target.full_buy, source.full_sell);
        let recommended = recommend(&source_to_target, &target_to_source);
        ArbitrageEstimate {
            source_to_target,
            target_to_source,
            recommended,
        }
    }
}

/// Weighted mean when available, simple mean otherwise
fn preferred_mean(analysis: &MarketAnalysis) -> Option<f64> {
    analysis.weighted_mean().or_else(|| analysis.simple_mean())
}

/// A route is recommended only when it is profitable and strictly beats the
/// other one. An unavailable route never beats an available one.
fn recommend(forward: &ArbitrageRoute, reverse: &ArbitrageRoute) -> Option<RouteChoice> {
    match (forward.pct, reverse.pct) {
        (Some(f), Some(r)) if f > 0.0 && f > r => Some(RouteChoice::SourceToTarget),
        (Some(f), Some(r)) if r > 0.0 && r > f => Some(RouteChoice::TargetToSource),
        (Some(f), None) if f > 0.0 => Some(RouteChoice::SourceToTarget),
        (None, Some(r)) if r > 0.0 => Some(RouteChoice::TargetToSource),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketStats;

    fn stats(simple: f64, weighted: f64) -> MarketAnalysis {
        MarketAnalysis::Stats(MarketStats {
            simple_mean: simple,
            weighted_mean: weighted,
            std_dev: 0.0,
            coefficient_of_variation: 0.0,
            outlier_count: 0,
            min: simple.min(weighted),
            max: simple.max(weighted),
            sample_count: 5,
            total_capacity: 100.0,
        })
    }

    fn view<'a>(fiat: &'a str, buy: &'a MarketAnalysis, sell: &'a MarketAnalysis) -> CurrencyView<'a> {
        CurrencyView {
            fiat,
            remittance_buy: buy,
            remittance_sell: sell,
            full_buy: buy,
            full_sell: sell,
        }
    }

    fn calculator() -> RateCalculator {
        RateCalculator::new(vec![5.0, 7.5, 10.0], 4)
    }

    #[test]
    fn test_remittance_rate_example() {
        let rates = calculator().remittance_rates("COP", "VES", &stats(4000.0, 4000.0), &stats(40.0, 40.0));
        assert_eq!(rates.len(), 3);
        assert_eq!(rates[0].value, Some(105.0));
        assert_eq!(rates[1].value, Some(107.5));
        assert_eq!(rates[2].value, Some(110.0));
        assert_eq!(rates[0].base_currency, "COP");
        assert_eq!(rates[0].quote_currency, "VES");
        assert_eq!(rates[0].id(), "COP→VES +5%");
    }

    #[test]
    fn test_remittance_uses_simple_mean() {
        let rates = calculator().remittance_rates("COP", "VES", &stats(4000.0, 3000.0), &stats(40.0, 80.0));
        assert_eq!(rates[0].value, Some(105.0));
    }

    #[test]
    fn test_calculate_swaps_averages_for_reverse() {
        let (cop_buy, cop_sell) = (stats(4000.0, 4000.0), stats(3900.0, 3900.0));
        let (ves_buy, ves_sell) = (stats(42.0, 42.0), stats(40.0, 40.0));
        let sheet = calculator().calculate(view("COP", &cop_buy, &cop_sell), view("VES", &ves_buy, &ves_sell));

        // COP→VES: avg_buy(COP) / avg_sell(VES)
        assert_eq!(sheet.forward[0].value, Some(105.0));
        assert_eq!(sheet.forward[2].value, Some(110.0));
        assert_eq!(sheet.forward[0].id(), "COP→VES +5%");

        // VES→COP: avg_buy(VES) / avg_sell(COP)
        assert_eq!(sheet.reverse[0].value, Some(round_to(42.0 / 3900.0 * 1.05, 4)));
        assert_eq!(sheet.reverse[0].value, Some(0.0113));
        assert_eq!(sheet.reverse[2].value, Some(round_to(42.0 / 3900.0 * 1.10, 4)));
        assert_eq!(sheet.reverse[0].id(), "VES→COP +5%");
        assert_ne!(sheet.reverse[0].value, sheet.forward[0].value.map(|f| round_to(1.0 / f, 4)));
    }

    #[test]
    fn test_missing_average_is_not_available() {
        let calc = calculator();
        let rates = calc.remittance_rates("COP", "VES", &MarketAnalysis::InsufficientData, &stats(40.0, 40.0));
        assert!(rates.iter().all(|r| r.value.is_none()));
        let rates = calc.remittance_rates("COP", "VES", &stats(4000.0, 4000.0), &MarketAnalysis::InsufficientData);
        assert!(rates.iter().all(|r| r.value.is_none()));
    }

    #[test]
    fn test_arbitrage_route_formulas() {
        let calc = calculator();
        let buy_cop = stats(4010.0, 4000.0);
        let sell_ves = stats(39.0, 39.5);
        // COP -> USDT -> VES: (sell_VES_w / buy_COP_w - 1) * 100
        let route = calc.arbitrage_route("COP", "VES", &buy_cop, &sell_ves);
        let expected = round_to((39.5 / 4000.0 - 1.0) * 100.0, 2);
        assert_eq!(route.pct, Some(expected));
        assert!(!route.is_profitable());

        // VES -> USDT -> COP: (sell_COP_w / buy_VES_w - 1) * 100
        let buy_ves = stats(40.0, 40.0);
        let sell_cop = stats(4100.0, 4200.0);
        let route = calc.arbitrage_route("VES", "COP", &buy_ves, &sell_cop);
        assert_eq!(route.pct, Some(round_to((4200.0 / 40.0 - 1.0) * 100.0, 2)));
        assert!(route.is_profitable());
    }

    #[test]
    fn test_arbitrage_same_unit_markets() {
        // Two markets quoted in comparable units make the percentages readable
        let calc = calculator();
        let buy_a = stats(100.0, 100.0);
        let sell_a = stats(99.0, 99.0);
        let buy_b = stats(101.0, 101.0);
        let sell_b = stats(102.0, 102.0);
        let a = CurrencyView {
            fiat: "AAA",
            remittance_buy: &buy_a,
            remittance_sell: &sell_a,
            full_buy: &buy_a,
            full_sell: &sell_a,
        };
        let b = CurrencyView {
            fiat: "BBB",
            remittance_buy: &buy_b,
            remittance_sell: &sell_b,
            full_buy: &buy_b,
            full_sell: &sell_b,
        };
        let estimate = calc.arbitrage(a, b);
        assert_eq!(estimate.source_to_target.pct, Some(2.0));
        assert_eq!(estimate.target_to_source.pct, Some(-1.98));
        assert_eq!(estimate.recommended, Some(RouteChoice::SourceToTarget));
        assert_eq!(estimate.recommended_route().map(|r| r.to.as_str()), Some("BBB"));
    }

    #[test]
    fn test_arbitrage_prefers_weighted_mean() {
        let route = calculator().arbitrage_route("A", "B", &stats(100.0, 50.0), &stats(100.0, 100.0));
        assert_eq!(route.pct, Some(100.0));
    }

    #[test]
    fn test_recommendation_rules() {
        let route = |pct: Option<f64>| ArbitrageRoute {
            from: "A".to_string(),
            to: "B".to_string(),
            pct,
        };
        assert_eq!(recommend(&route(Some(1.0)), &route(Some(0.5))), Some(RouteChoice::SourceToTarget));
        assert_eq!(recommend(&route(Some(0.5)), &route(Some(1.0))), Some(RouteChoice::TargetToSource));
        assert_eq!(recommend(&route(Some(-1.0)), &route(Some(-0.5))), None);
        assert_eq!(recommend(&route(Some(1.0)), &route(Some(1.0))), None);
        assert_eq!(recommend(&route(Some(0.0)), &route(Some(-3.0))), None);
        assert_eq!(recommend(&route(None), &route(Some(2.0))), Some(RouteChoice::TargetToSource));
        assert_eq!(recommend(&route(None), &route(None)), None);
    }

    #[test]
    fn test_partial_results_when_one_side_missing() {
        let calc = calculator();
        let buy_cop = stats(4000.0, 4000.0);
        let sell_cop = stats(3950.0, 3950.0);
        let buy_ves = MarketAnalysis::InsufficientData;
        let sell_ves = stats(40.0, 40.0);
        let source = CurrencyView {
            fiat: "COP",
            remittance_buy: &buy_cop,
            remittance_sell: &sell_cop,
            full_buy: &buy_cop,
            full_sell: &sell_cop,
        };
        let target = CurrencyView {
            fiat: "VES",
            remittance_buy: &buy_ves,
            remittance_sell: &sell_ves,
            full_buy: &buy_ves,
            full_sell: &sell_ves,
        };
        let sheet = calc.calculate(source, target);
        assert!(sheet.forward.iter().all(|r| r.value.is_some()));
        assert!(sheet.reverse.iter().all(|r| r.value.is_none()));
        assert!(sheet.arbitrage.source_to_target.pct.is_some());
        assert!(sheet.arbitrage.target_to_source.pct.is_none());
        assert_eq!(sheet.all_rates().count(), 6);
    }
}
