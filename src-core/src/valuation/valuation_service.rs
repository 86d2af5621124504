use std::sync::RwLock;

use chrono::Utc;
use log::warn;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use crate::ledger::BalanceSheet;
use crate::pnl::UnrealizedPnl;
use crate::valuation::valuation_model::{HealthGrade, PortfolioSnapshot};

/// Combines positions, cash and liabilities into equity snapshots.
///
/// Peak equity is tracked across snapshots behind an interior lock so the
/// valuator can be shared by read-side callers.
#[derive(Debug)]
pub struct PortfolioValuator {
    initial_equity: Decimal,
    peak_equity: RwLock<Decimal>,
}

impl PortfolioValuator {
    pub fn new(initial_equity: Decimal) -> Self {
        PortfolioValuator {
            initial_equity,
            peak_equity: RwLock::new(Decimal::ZERO),
        }
    }

    /// Restores the tracked peak after reloading persisted books.
    pub fn restore_peak(&self, peak: Decimal) {
        match self.peak_equity.write() {
            Ok(mut guard) => *guard = peak,
            Err(e) => warn!("Peak equity lock poisoned on restore: {}", e),
        }
    }

    pub fn peak_equity(&self) -> Decimal {
        self.peak_equity
            .read()
            .map(|guard| *guard)
            .unwrap_or(Decimal::ZERO)
    }

    /// Builds a snapshot from the ledger's balance sheet, cash and holdings
    /// balances, supplied unrealized P&L and the realized win rate.
    pub fn snapshot(
        &self,
        sheet: &BalanceSheet,
        cash: Decimal,
        holdings_cost: Decimal,
        unrealized: &UnrealizedPnl,
        win_rate: Option<Decimal>,
    ) -> PortfolioSnapshot {
        // Ledger carries holdings at cost; marking to market adds the
        // unrealized component on top.
        let equity = sheet.total_assets - sheet.total_liabilities + unrealized.total;

        let peak = {
            match self.peak_equity.write() {
                Ok(mut guard) => {
                    if equity > *guard {
                        *guard = equity;
                    }
                    *guard
                }
                Err(e) => {
                    warn!("Peak equity lock poisoned: {}. Using current equity.", e);
                    equity
                }
            }
        };

        let drawdown = if peak > Decimal::ZERO && equity < peak {
            (peak - equity) / peak
        } else {
            Decimal::ZERO
        };

        let score = self.health_score(equity, drawdown, win_rate, unrealized.total);

        PortfolioSnapshot {
            generated_at: Utc::now(),
            equity,
            total_assets: sheet.total_assets + unrealized.total,
            total_liabilities: sheet.total_liabilities,
            cash,
            position_value: holdings_cost + unrealized.total,
            unrealized_pnl: unrealized.total,
            peak_equity: peak,
            drawdown,
            health_score: score,
            health_grade: HealthGrade::from_score(score),
        }
    }

    /// Weighted health score in [0, 1]: growth vs initial equity (0.3),
    /// drawdown from peak (-0.4), win rate vs a 50% baseline (0.2) and the
    /// unrealized-to-equity ratio (0.1), around a 0.5 baseline.
    fn health_score(
        &self,
        equity: Decimal,
        drawdown: Decimal,
        win_rate: Option<Decimal>,
        unrealized: Decimal,
    ) -> f64 {
        let growth = if self.initial_equity > Decimal::ZERO {
            to_f64((equity - self.initial_equity) / self.initial_equity).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let drawdown = to_f64(drawdown).clamp(0.0, 1.0);
        let win_signal = win_rate
            .map(|rate| ((to_f64(rate) - 0.5) * 2.0).clamp(-1.0, 1.0))
            .unwrap_or(0.0);
        let unrealized_signal = if equity > Decimal::ZERO {
            to_f64(unrealized / equity).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let score = 0.5 + 0.3 * growth - 0.4 * drawdown + 0.2 * win_signal + 0.1 * unrealized_signal;
        score.clamp(0.0, 1.0)
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sheet(assets: Decimal, liabilities: Decimal) -> BalanceSheet {
        BalanceSheet {
            total_assets: assets,
            total_liabilities: liabilities,
            total_equity: assets - liabilities,
            net_income: Decimal::ZERO,
            equation_holds: true,
        }
    }

    fn no_unrealized() -> UnrealizedPnl {
        UnrealizedPnl {
            positions: Vec::new(),
            total: Decimal::ZERO,
            unpriced: Vec::new(),
        }
    }

    #[test]
    fn fresh_book_scores_in_the_middle_band() {
        let valuator = PortfolioValuator::new(dec!(1000));
        let snapshot = valuator.snapshot(
            &sheet(dec!(1000), dec!(0)),
            dec!(1000),
            dec!(0),
            &no_unrealized(),
            None,
        );
        assert!((snapshot.health_score - 0.5).abs() < 1e-9);
        assert_eq!(snapshot.health_grade, HealthGrade::Caution);
    }

    #[test]
    fn peak_equity_tracks_highwater_and_drawdown() {
        let valuator = PortfolioValuator::new(dec!(1000));
        valuator.snapshot(
            &sheet(dec!(2000), dec!(0)),
            dec!(2000),
            dec!(0),
            &no_unrealized(),
            None,
        );
        let snapshot = valuator.snapshot(
            &sheet(dec!(1500), dec!(0)),
            dec!(1500),
            dec!(0),
            &no_unrealized(),
            None,
        );
        assert_eq!(snapshot.peak_equity, dec!(2000));
        assert_eq!(snapshot.drawdown, dec!(0.25));
    }

    #[test]
    fn strong_growth_and_wins_grade_excellent() {
        let valuator = PortfolioValuator::new(dec!(1000));
        let snapshot = valuator.snapshot(
            &sheet(dec!(2500), dec!(0)),
            dec!(2500),
            dec!(0),
            &no_unrealized(),
            Some(dec!(0.9)),
        );
        // 0.5 + 0.3*1.0 + 0.2*0.8 = 0.96
        assert!(snapshot.health_score > 0.85);
        assert_eq!(snapshot.health_grade, HealthGrade::Excellent);
    }

    #[test]
    fn deep_drawdown_grades_critical() {
        let valuator = PortfolioValuator::new(dec!(1000));
        valuator.snapshot(
            &sheet(dec!(2000), dec!(0)),
            dec!(2000),
            dec!(0),
            &no_unrealized(),
            None,
        );
        let snapshot = valuator.snapshot(
            &sheet(dec!(600), dec!(0)),
            dec!(600),
            dec!(0),
            &no_unrealized(),
            Some(dec!(0.2)),
        );
        assert_eq!(snapshot.health_grade, HealthGrade::Critical);
    }

    #[test]
    fn unrealized_marks_equity_to_market() {
        let valuator = PortfolioValuator::new(dec!(1000));
        let unrealized = UnrealizedPnl {
            positions: Vec::new(),
            total: dec!(50),
            unpriced: Vec::new(),
        };
        let snapshot = valuator.snapshot(
            &sheet(dec!(1000), dec!(0)),
            dec!(500),
            dec!(500),
            &unrealized,
            None,
        );
        assert_eq!(snapshot.equity, dec!(1050));
        assert_eq!(snapshot.position_value, dec!(550));
    }
}
