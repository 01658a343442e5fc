use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Inputs to a slippage quote: the candle/mark price, order side and size, the coin and bar
/// timestamp the quote is for (keys the `Historical` lookup), and (for the volume-based
/// model) the coin's daily traded volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlippageInput {
    pub coin_id: u32,
    pub price: Decimal,
    pub quantity: Decimal,
    pub is_buy: bool,
    pub daily_volume: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Result of a slippage quote: the price the order actually executes at, and the bps of
/// slippage that price represents relative to the input price.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SlippageQuote {
    pub execution_price: Decimal,
    pub slippage_bps: Decimal,
}

/// Configuration for a [`SlippageModel`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SlippageConfig {
    pub fixed_bps: Decimal,
    pub base_slippage_bps: Decimal,
    pub volume_impact_factor: Decimal,
    pub max_slippage_bps: Decimal,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            fixed_bps: dec!(10),
            base_slippage_bps: dec!(5),
            volume_impact_factor: dec!(1),
            max_slippage_bps: dec!(500),
        }
    }
}

/// Turns `(base price, quantity, side, volume)` into an execution price and bps figure.
///
/// `Historical` carries a caller-supplied empirical-distribution lookup; no concrete loader
/// ships in this crate (that data source is an external collaborator), but the contract
/// exists so a caller can plug one in without changing the executor.
#[derive(Clone, Serialize, Deserialize)]
pub enum SlippageModel {
    None,
    Fixed(SlippageConfig),
    VolumeBased(SlippageConfig),
    #[serde(skip)]
    Historical(std::sync::Arc<dyn Fn(u32, chrono::DateTime<chrono::Utc>) -> Decimal + Send + Sync>),
}

impl std::fmt::Debug for SlippageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "SlippageModel::None"),
            Self::Fixed(c) => f.debug_tuple("SlippageModel::Fixed").field(c).finish(),
            Self::VolumeBased(c) => f.debug_tuple("SlippageModel::VolumeBased").field(c).finish(),
            Self::Historical(_) => write!(f, "SlippageModel::Historical(..)"),
        }
    }
}

const EPSILON: Decimal = dec!(0.00000001);

impl SlippageModel {
    pub fn quote(&self, input: SlippageInput) -> SlippageQuote {
        match self {
            SlippageModel::None => SlippageQuote {
                execution_price: input.price,
                slippage_bps: Decimal::ZERO,
            },
            SlippageModel::Fixed(config) => {
                let bps = config.fixed_bps.min(config.max_slippage_bps);
                apply(input, bps)
            }
            SlippageModel::VolumeBased(config) => {
                let notional = input.price * input.quantity;
                let volume = input.daily_volume.unwrap_or(Decimal::ZERO).max(EPSILON);
                let bps = (config.base_slippage_bps + config.volume_impact_factor * (notional / volume))
                    .min(config.max_slippage_bps);
                apply(input, bps)
            }
            SlippageModel::Historical(lookup) => {
                let bps = lookup(input.coin_id, input.timestamp);
                apply(input, bps)
            }
        }
    }
}

fn apply(input: SlippageInput, bps: Decimal) -> SlippageQuote {
    let sign = if input.is_buy { Decimal::ONE } else { -Decimal::ONE };
    let execution_price = input.price * (Decimal::ONE + sign * bps / dec!(10000));
    SlippageQuote {
        execution_price,
        slippage_bps: bps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(overrides: impl FnOnce(SlippageInput) -> SlippageInput) -> SlippageInput {
        overrides(SlippageInput {
            coin_id: 1,
            price: dec!(100),
            quantity: dec!(1),
            is_buy: true,
            daily_volume: None,
            timestamp: DateTime::<Utc>::MIN_UTC,
        })
    }

    #[test]
    fn none_passes_through() {
        let quote = SlippageModel::None.quote(input(|i| i));
        assert_eq!(quote.execution_price, dec!(100));
        assert_eq!(quote.slippage_bps, Decimal::ZERO);
    }

    #[test]
    fn fixed_buy_pays_more_sell_receives_less() {
        let config = SlippageConfig {
            fixed_bps: dec!(100),
            ..SlippageConfig::default()
        };
        let buy = SlippageModel::Fixed(config).quote(input(|i| i));
        assert_eq!(buy.execution_price, dec!(101));

        let sell = SlippageModel::Fixed(config).quote(input(|i| SlippageInput { is_buy: false, ..i }));
        assert_eq!(sell.execution_price, dec!(99));
    }

    #[test]
    fn fixed_is_capped_at_max_slippage() {
        let config = SlippageConfig {
            fixed_bps: dec!(1000),
            max_slippage_bps: dec!(50),
            ..SlippageConfig::default()
        };
        let quote = SlippageModel::Fixed(config).quote(input(|i| i));
        assert_eq!(quote.slippage_bps, dec!(50));
    }

    #[test]
    fn volume_based_is_monotonic_in_volume() {
        let config = SlippageConfig::default();
        let high_volume = SlippageModel::VolumeBased(config).quote(input(|i| SlippageInput {
            quantity: dec!(10),
            daily_volume: Some(dec!(1_000_000)),
            ..i
        }));
        let low_volume = SlippageModel::VolumeBased(config).quote(input(|i| SlippageInput {
            quantity: dec!(10),
            daily_volume: Some(dec!(1_000)),
            ..i
        }));
        assert!(low_volume.slippage_bps >= high_volume.slippage_bps);
    }

    #[test]
    fn volume_based_is_monotonic_in_quantity() {
        let config = SlippageConfig::default();
        let small = SlippageModel::VolumeBased(config).quote(input(|i| SlippageInput {
            quantity: dec!(1),
            daily_volume: Some(dec!(10_000)),
            ..i
        }));
        let large = SlippageModel::VolumeBased(config).quote(input(|i| SlippageInput {
            quantity: dec!(100),
            daily_volume: Some(dec!(10_000)),
            ..i
        }));
        assert!(large.slippage_bps >= small.slippage_bps);
    }

    #[test]
    fn historical_looks_up_by_coin_and_timestamp() {
        let lookup = std::sync::Arc::new(|coin_id: u32, timestamp: DateTime<Utc>| {
            if coin_id == 7 && timestamp == DateTime::<Utc>::MIN_UTC + chrono::TimeDelta::days(3) {
                dec!(25)
            } else {
                dec!(0)
            }
        });

        let matching = SlippageModel::Historical(lookup.clone()).quote(input(|i| SlippageInput {
            coin_id: 7,
            timestamp: DateTime::<Utc>::MIN_UTC + chrono::TimeDelta::days(3),
            ..i
        }));
        assert_eq!(matching.slippage_bps, dec!(25));

        let non_matching = SlippageModel::Historical(lookup).quote(input(|i| i));
        assert_eq!(non_matching.slippage_bps, dec!(0));
    }
}
