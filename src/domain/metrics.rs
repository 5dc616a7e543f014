//! Summary statistics over a backtest's return series.
//!
//! Risk-adjusted ratios use a zero risk-free rate and annualize with
//! `periods_per_year` (252 for daily bars).

use super::backtest::BacktestResult;

pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub periods: usize,
    pub avg_basket_size: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, periods_per_year: f64) -> Self {
        let returns = result.returns.period_returns();
        let total_return = result.returns.cumulative_return();
        let periods = returns.len();

        let years = periods as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite()
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let growth: Vec<f64> = result
            .returns
            .points()
            .iter()
            .map(|p| 1.0 + p.cumulative_return)
            .collect();
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&growth);

        // the first period return is 0 by construction and carries no information
        let realized = returns.get(1..).unwrap_or(&[]);
        let (annualized_volatility, sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(realized, periods_per_year);

        let avg_basket_size = if result.steps.is_empty() {
            0.0
        } else {
            result.steps.iter().map(|s| s.portfolio.len()).sum::<usize>() as f64
                / result.steps.len() as f64
        };

        Metrics {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            periods,
            avg_basket_size,
        }
    }
}

fn compute_drawdown(growth: &[f64]) -> (f64, usize) {
    let Some(&first) = growth.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &value in growth {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

/// (annualized volatility, Sharpe, Sortino)
fn compute_risk_adjusted(returns: &[f64], periods_per_year: f64) -> (f64, f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let annualizer = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        (mean / stddev) * annualizer
    } else {
        0.0
    };

    let downside_variance: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        (mean / downside_stddev) * annualizer
    } else {
        0.0
    };

    (stddev * annualizer, sharpe, sortino)
}
