use std::collections::HashMap;

use log::{info, warn};
use rust_decimal::Decimal;

use crate::audit::audit_model::{AlertCategory, AlertSeverity, AuditAlert};
use crate::costbasis::costbasis_model::is_quantity_significant;
use crate::settings::TreasurySettings;
use crate::transactions::Transaction;

/// Cross-checks the books against the outside world and flags suspicious
/// inputs. The auditor is strictly read-only with respect to the books:
/// it raises alerts, it never corrects.
#[derive(Debug)]
pub struct Auditor {
    settings: TreasurySettings,
    alerts: Vec<AuditAlert>,
}

impl Auditor {
    pub fn new(settings: TreasurySettings) -> Self {
        Auditor {
            settings,
            alerts: Vec::new(),
        }
    }

    /// Compares live exchange balances against the quantities the cost-basis
    /// engine believes are held on that exchange. Returns the alerts raised
    /// by this pass (also retained internally).
    pub fn reconcile(
        &mut self,
        exchange: &str,
        live_balances: &HashMap<String, Decimal>,
        tracked_balances: &HashMap<String, Decimal>,
    ) -> Vec<AuditAlert> {
        let mut raised = Vec::new();

        for (asset, tracked) in tracked_balances {
            let live = live_balances.get(asset).copied().unwrap_or(Decimal::ZERO);
            let diff = (live - *tracked).abs();
            let relative = if tracked.is_zero() {
                diff
            } else {
                diff / tracked.abs()
            };
            if relative > self.settings.reconcile_tolerance {
                let alert = AuditAlert::new(
                    AlertSeverity::Warning,
                    AlertCategory::Reconciliation,
                    format!(
                        "Balance drift on {} {}: tracked {} vs live {} ({}% off)",
                        exchange,
                        asset,
                        tracked,
                        live,
                        (relative * Decimal::ONE_HUNDRED).round_dp(2)
                    ),
                );
                warn!("{}", alert.message);
                raised.push(alert);
            }
        }

        // Assets the exchange reports but the books have never seen.
        for (asset, live) in live_balances {
            if tracked_balances.contains_key(asset) {
                continue;
            }
            if !is_quantity_significant(live) {
                continue;
            }
            let alert = AuditAlert::new(
                AlertSeverity::Info,
                AlertCategory::Reconciliation,
                format!("Untracked balance on {}: {} {}", exchange, live, asset),
            );
            info!("{}", alert.message);
            raised.push(alert);
        }

        self.alerts.extend(raised.iter().cloned());
        raised
    }

    /// Flags a trade whose fee is far above the expected taker rate for its
    /// exchange. Fat-fingered fee currencies and VIP-tier misconfigurations
    /// both show up here.
    pub fn check_fee_anomaly(&mut self, transaction: &Transaction) -> Option<AuditAlert> {
        let gross = transaction.gross_value();
        if gross.is_zero() {
            return None;
        }
        let expected = gross * self.settings.taker_fee(&transaction.exchange);
        let threshold = expected * self.settings.fee_anomaly_multiplier;
        let fee = transaction.fee_valuation.value();
        if fee <= threshold {
            return None;
        }
        let alert = AuditAlert::new(
            AlertSeverity::Warning,
            AlertCategory::FeeAnomaly,
            format!(
                "Fee {} on {} {} trade is above {}x the expected taker fee {}",
                fee,
                transaction.exchange,
                transaction.symbol,
                self.settings.fee_anomaly_multiplier,
                expected.round_dp(8)
            ),
        );
        warn!("{}", alert.message);
        self.alerts.push(alert.clone());
        Some(alert)
    }

    /// Records a sell that arrived with no acquisition history behind it.
    pub fn flag_missing_basis(&mut self, transaction: &Transaction) -> AuditAlert {
        let alert = AuditAlert::new(
            AlertSeverity::Warning,
            AlertCategory::MissingCostBasis,
            format!(
                "Sell of {} {} on {} has no matching acquisition lots",
                transaction.quantity, transaction.base_asset, transaction.exchange
            ),
        );
        warn!("{}", alert.message);
        self.alerts.push(alert.clone());
        alert
    }

    pub fn alerts(&self) -> &[AuditAlert] {
        &self.alerts
    }

    pub fn unresolved(&self) -> Vec<&AuditAlert> {
        self.alerts.iter().filter(|a| !a.resolved).collect()
    }

    pub fn resolve(&mut self, alert_id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.resolved = true;
                true
            }
            None => false,
        }
    }

    pub fn restore_alerts(&mut self, alerts: Vec<AuditAlert>) {
        self.alerts = alerts;
    }
}
