use chrono::{Datelike, NaiveDate, Utc};
use log::warn;
use rust_decimal::Decimal;

use crate::constants::LONG_TERM_HOLD_DAYS;
use crate::costbasis::RealizedGain;
use crate::settings::TaxSettings;
use crate::tax::tax_model::{TaxEstimate, TaxReport, TermBreakdown};

/// Estimates fiscal-year capital-gains tax from realized gains.
#[derive(Debug, Clone)]
pub struct TaxCalculator {
    settings: TaxSettings,
}

impl TaxCalculator {
    pub fn new(settings: TaxSettings) -> Self {
        TaxCalculator { settings }
    }

    /// First day of the fiscal year labelled `year`.
    fn fiscal_start(&self, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(
            year,
            self.settings.fiscal_start_month,
            self.settings.fiscal_start_day,
        )
        .unwrap_or_else(|| {
            warn!(
                "Invalid fiscal year start {}-{}. Falling back to Jan 1.",
                self.settings.fiscal_start_month, self.settings.fiscal_start_day
            );
            NaiveDate::from_ymd_opt(year, 1, 1).expect("Jan 1 is always valid")
        })
    }

    /// Fiscal year containing today, used when no year is requested.
    fn current_fiscal_year(&self) -> i32 {
        let today = Utc::now().date_naive();
        let start_this_year = self.fiscal_start(today.year());
        if today >= start_this_year {
            today.year()
        } else {
            today.year() - 1
        }
    }

    pub fn report(&self, gains: &[RealizedGain], year: Option<i32>) -> TaxReport {
        let fiscal_year = year.unwrap_or_else(|| self.current_fiscal_year());
        let window_start = self.fiscal_start(fiscal_year);
        let window_end = self.fiscal_start(fiscal_year + 1);

        let mut short_term = TermBreakdown::empty();
        let mut long_term = TermBreakdown::empty();

        let long_term_days = Decimal::try_from(LONG_TERM_HOLD_DAYS).unwrap_or(Decimal::from(365));
        for gain in gains {
            let sold_on = gain.sold_at.date_naive();
            if sold_on < window_start || sold_on >= window_end {
                continue;
            }
            let bucket = if gain.hold_days < long_term_days {
                &mut short_term
            } else {
                &mut long_term
            };
            bucket.disposals += 1;
            if gain.net_gain.is_sign_negative() {
                bucket.losses += -gain.net_gain;
            } else {
                bucket.gains += gain.net_gain;
            }
            bucket.net += gain.net_gain;
        }

        // Gains net against losses across both terms before the exemption.
        let net_total = short_term.net + long_term.net;
        let taxable_amount = (net_total - self.settings.annual_exemption).max(Decimal::ZERO);

        TaxReport {
            fiscal_year,
            window_start,
            window_end,
            short_term,
            long_term,
            net_total,
            exemption: self.settings.annual_exemption,
            taxable_amount,
            estimate_low: TaxEstimate {
                rate: self.settings.rate_low,
                tax: taxable_amount * self.settings.rate_low,
            },
            estimate_high: TaxEstimate {
                rate: self.settings.rate_high,
                tax: taxable_amount * self.settings.rate_high,
            },
        }
    }
}
