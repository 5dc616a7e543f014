//! Portfolio state and rebalancing.
//!
//! Each selected symbol receives a fixed nominal quantity. Holdings that
//! dropped out of the selection are liquidated or retained according to the
//! `LiquidationPolicy`. Weights are quantity / total quantity; a zero total
//! yields an empty portfolio.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::error::MeanrevError;
use super::selector::SelectionSet;

pub const DEFAULT_NOMINAL_POSITION_SIZE: u64 = 100;
pub const MAX_NOMINAL_POSITION_SIZE: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiquidationPolicy {
    /// Sell every holding that is not in the new selection.
    #[default]
    Liquidate,
    /// Carry non-selected holdings at their previous quantity.
    Retain,
}

impl FromStr for LiquidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liquidate" => Ok(LiquidationPolicy::Liquidate),
            "retain" => Ok(LiquidationPolicy::Retain),
            other => Err(format!(
                "unknown liquidation policy '{other}' (expected liquidate or retain)"
            )),
        }
    }
}

impl fmt::Display for LiquidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidationPolicy::Liquidate => f.write_str("liquidate"),
            LiquidationPolicy::Retain => f.write_str("retain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holding {
    pub quantity: u64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    holdings: IndexMap<String, Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Portfolio::default()
    }

    /// Builds a portfolio from nominal quantities, normalizing weights.
    ///
    /// Zero quantities are dropped.
    pub fn from_quantities<I, S>(quantities: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let quantities: Vec<(String, u64)> = quantities
            .into_iter()
            .filter(|(_, q)| *q > 0)
            .map(|(s, q)| (s.into(), q))
            .collect();

        // summed as f64: retained quantities are unbounded
        let total: f64 = quantities.iter().map(|(_, q)| *q as f64).sum();
        if total == 0.0 {
            return Portfolio::new();
        }

        let holdings = quantities
            .into_iter()
            .map(|(symbol, quantity)| {
                let weight = quantity as f64 / total;
                (symbol, Holding { quantity, weight })
            })
            .collect();
        Portfolio { holdings }
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.holdings.contains_key(symbol)
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&str, &Holding)> {
        self.holdings.iter().map(|(s, h)| (s.as_str(), h))
    }

    pub fn weight(&self, symbol: &str) -> f64 {
        self.holdings.get(symbol).map_or(0.0, |h| h.weight)
    }

    pub fn total_weight(&self) -> f64 {
        self.holdings.values().map(|h| h.weight).sum()
    }
}

fn validate_selection(selection: &SelectionSet) -> Result<(), MeanrevError> {
    let mut seen = HashSet::with_capacity(selection.len());
    for symbol in &selection.symbols {
        if symbol.trim().is_empty() {
            return Err(MeanrevError::InvalidSelection {
                timestamp: Some(selection.timestamp),
                symbol: symbol.clone(),
                reason: "empty symbol".into(),
            });
        }
        if !seen.insert(symbol.as_str()) {
            return Err(MeanrevError::InvalidSelection {
                timestamp: Some(selection.timestamp),
                symbol: symbol.clone(),
                reason: format!("duplicate symbol {symbol}"),
            });
        }
    }
    Ok(())
}

/// Produces the next portfolio from the current holdings and a selection.
///
/// `current` is never modified; on error the caller keeps it as is.
pub fn rebalance(
    current: &Portfolio,
    selection: &SelectionSet,
    nominal_position_size: u64,
    policy: LiquidationPolicy,
) -> Result<Portfolio, MeanrevError> {
    validate_selection(selection)?;

    let mut quantities: Vec<(&str, u64)> = selection
        .symbols
        .iter()
        .map(|s| (s.as_str(), nominal_position_size))
        .collect();

    if policy == LiquidationPolicy::Retain {
        quantities.extend(
            current
                .holdings()
                .filter(|(symbol, _)| !selection.contains(symbol))
                .map(|(symbol, holding)| (symbol, holding.quantity)),
        );
    }

    Ok(Portfolio::from_quantities(quantities))
}
