//! Payment matching
//!
//! Resolves who paid, filters the payer's outstanding rows down to plausible
//! candidates and picks one deterministically. A tie between rows of
//! different contracts is reported instead of guessed.

use once_cell::sync::Lazy;
use regex::Regex;
use rentledger_config::MatchingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::error::{CoreError, CoreResult};
use super::models::{Payment, RowRef, ScheduleRow, Tenant};

static TENANT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTENANT-[A-Z0-9]+\b").expect("tenant id pattern"));

/// Find the tenant a payer reference points at.
///
/// Tried in order: tenant id, customer reference, a `TENANT-...` id inside the
/// text, email, phone digits, then name containment. First hit wins.
pub fn resolve_payer<'a>(payer: &str, tenants: &'a [Tenant]) -> Option<&'a Tenant> {
    let payer = payer.trim();
    if payer.is_empty() {
        return None;
    }
    let lowered = payer.to_lowercase();

    if let Some(t) = tenants.iter().find(|t| t.id == payer) {
        return Some(t);
    }

    if let Some(t) = tenants
        .iter()
        .find(|t| t.customer.as_deref() == Some(payer))
    {
        return Some(t);
    }

    for m in TENANT_ID_PATTERN.find_iter(payer) {
        if let Some(t) = tenants.iter().find(|t| t.id.eq_ignore_ascii_case(m.as_str())) {
            return Some(t);
        }
    }

    if let Some(t) = tenants
        .iter()
        .find(|t| t.email.as_deref().map_or(false, |e| e.eq_ignore_ascii_case(payer)))
    {
        return Some(t);
    }

    let payer_digits = rentledger_utils::digits_only(payer);
    if payer_digits.len() >= 10 {
        if let Some(t) = tenants.iter().find(|t| {
            t.phone
                .as_deref()
                .map_or(false, |p| rentledger_utils::digits_only(p) == payer_digits)
        }) {
            return Some(t);
        }
    }

    tenants.iter().find(|t| {
        let name = t.display_name().to_lowercase();
        name.len() >= 3 && lowered.contains(&name)
    })
}

/// A row offered to the matcher, with the contract it belongs to
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub contract_id: &'a str,
    pub row: &'a ScheduleRow,
}

/// Why a single row cannot take a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NotOutstanding,
    LinkedToOtherPayment,
    ExceedsOutstanding,
    OutsideDateWindow,
    NotRentLike,
}

/// Why a payment was left unmatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    /// Payer could not be tied to a tenant
    UnknownPayer,
    /// Payer has no outstanding rows on active contracts
    NoOutstandingRows,
    /// Every row was rejected
    NoAcceptableRow,
}

impl std::fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoMatchReason::UnknownPayer => write!(f, "payer does not resolve to a tenant"),
            NoMatchReason::NoOutstandingRows => write!(f, "no outstanding rows on active contracts"),
            NoMatchReason::NoAcceptableRow => write!(f, "no row accepted the payment"),
        }
    }
}

/// Result of matching one payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched { row: RowRef },
    NoMatch { reason: NoMatchReason },
    /// Equally good rows on different contracts
    Ambiguous { rows: Vec<RowRef> },
}

/// Scores outstanding rows against incoming payments
#[derive(Debug, Clone)]
pub struct PaymentMatcher {
    config: MatchingConfig,
    keywords: Option<Regex>,
}

impl PaymentMatcher {
    pub fn new(config: MatchingConfig) -> CoreResult<Self> {
        let keywords = if config.keywords.is_empty() {
            None
        } else {
            let alternatives: Vec<String> =
                config.keywords.iter().map(|k| regex::escape(k.trim())).collect();
            let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| CoreError::InvalidFormat {
                message: format!("Invalid memo keywords: {}", e),
            })?)
        };
        Ok(Self { config, keywords })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Memo mentions rent as a whole word
    pub fn memo_mentions_rent(&self, memo: &str) -> bool {
        self.keywords.as_ref().map_or(false, |re| re.is_match(memo))
    }

    /// Hard rules a row must pass regardless of memo or amount closeness
    pub fn rejection(&self, payment: &Payment, row: &ScheduleRow) -> Option<Rejection> {
        if !row.is_outstanding() {
            return Some(Rejection::NotOutstanding);
        }
        if row
            .payment_id
            .as_deref()
            .map_or(false, |id| id != payment.id)
        {
            return Some(Rejection::LinkedToOtherPayment);
        }
        if payment.amount > row.outstanding + self.config.amount_tolerance {
            return Some(Rejection::ExceedsOutstanding);
        }
        if (payment.date - row.due_date).num_days().abs() > self.config.date_window_days {
            return Some(Rejection::OutsideDateWindow);
        }
        None
    }

    /// Whether a row that passed the hard rules should take the payment
    pub fn accepts(&self, payment: &Payment, row: &ScheduleRow) -> bool {
        if self.memo_mentions_rent(&payment.memo) {
            return true;
        }
        if row.outstanding <= Decimal::ZERO {
            return false;
        }
        let ratio = payment.amount / row.outstanding;
        ratio >= Decimal::ONE - self.config.amount_match_ratio
            && ratio <= Decimal::ONE + self.config.amount_match_ratio
    }

    /// Check one row, for manual linking and diagnostics
    pub fn evaluate(&self, payment: &Payment, row: &ScheduleRow) -> Result<(), Rejection> {
        if let Some(rejection) = self.rejection(payment, row) {
            return Err(rejection);
        }
        if !self.accepts(payment, row) {
            return Err(Rejection::NotRentLike);
        }
        Ok(())
    }

    /// Pick the best row for a payment.
    ///
    /// Ranking: closest outstanding amount, then earliest due date, then
    /// contract id, then row id.
    pub fn find_match(&self, payment: &Payment, candidates: &[MatchCandidate<'_>]) -> MatchOutcome {
        if !candidates.iter().any(|c| c.row.is_outstanding()) {
            return MatchOutcome::NoMatch {
                reason: NoMatchReason::NoOutstandingRows,
            };
        }

        let mut accepted: Vec<&MatchCandidate<'_>> = candidates
            .iter()
            .filter(|c| match self.evaluate(payment, c.row) {
                Ok(()) => true,
                Err(rejection) => {
                    log::trace!("Row {} rejected for {}: {:?}", c.row.id, payment.id, rejection);
                    false
                }
            })
            .collect();

        accepted.sort_by(|a, b| self.rank(payment, a, b));

        match accepted.as_slice() {
            [] => MatchOutcome::NoMatch {
                reason: NoMatchReason::NoAcceptableRow,
            },
            [best, second, ..]
                if best.contract_id != second.contract_id
                    && self.proximity(payment, best.row) == self.proximity(payment, second.row)
                    && best.row.due_date == second.row.due_date =>
            {
                let rows = accepted
                    .iter()
                    .take_while(|c| {
                        self.proximity(payment, c.row) == self.proximity(payment, best.row)
                            && c.row.due_date == best.row.due_date
                    })
                    .map(|c| to_ref(c))
                    .collect();
                MatchOutcome::Ambiguous { rows }
            }
            [best, ..] => MatchOutcome::Matched { row: to_ref(best) },
        }
    }

    fn proximity(&self, payment: &Payment, row: &ScheduleRow) -> Decimal {
        (payment.amount - row.outstanding).abs()
    }

    fn rank(&self, payment: &Payment, a: &MatchCandidate<'_>, b: &MatchCandidate<'_>) -> Ordering {
        self.proximity(payment, a.row)
            .cmp(&self.proximity(payment, b.row))
            .then(a.row.due_date.cmp(&b.row.due_date))
            .then(a.contract_id.cmp(b.contract_id))
            .then(a.row.id.cmp(&b.row.id))
    }
}

fn to_ref(candidate: &MatchCandidate<'_>) -> RowRef {
    RowRef {
        contract_id: candidate.contract_id.to_string(),
        row_id: candidate.row.id.clone(),
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentAllocation;
    use crate::types::{PaymentStatus, RowStatus};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn matcher() -> PaymentMatcher {
        PaymentMatcher::new(MatchingConfig::default()).unwrap()
    }

    fn row(contract: &str, n: u32, due: NaiveDate, amount: i64) -> ScheduleRow {
        ScheduleRow::new(format!("{}-{:03}", contract, n), contract.to_string(), due, Decimal::new(amount, 0))
    }

    fn payment(amount: Decimal, date: NaiveDate, memo: &str) -> Payment {
        Payment {
            id: "PAY-00001".to_string(),
            payer: "TENANT-00001".to_string(),
            amount,
            date,
            memo: memo.to_string(),
            reference_no: None,
            mode: None,
            status: PaymentStatus::Received,
            matched: None,
        }
    }

    fn tenants() -> Vec<Tenant> {
        vec![
            Tenant {
                id: "TENANT-00001".into(),
                name: "Jane Doe".into(),
                email: Some("jane@example.com".into()),
                phone: Some("+1 555 010 2030".into()),
                customer: Some("CUST-JANE".into()),
                ..Default::default()
            },
            Tenant {
                id: "TENANT-00002".into(),
                name: "Bob Stone".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_resolve_payer_order() {
        let tenants = tenants();
        assert_eq!(resolve_payer("TENANT-00002", &tenants).unwrap().id, "TENANT-00002");
        assert_eq!(resolve_payer("CUST-JANE", &tenants).unwrap().id, "TENANT-00001");
        assert_eq!(
            resolve_payer("transfer from tenant-00002 march", &tenants).unwrap().id,
            "TENANT-00002"
        );
        assert_eq!(resolve_payer("JANE@EXAMPLE.COM", &tenants).unwrap().id, "TENANT-00001");
        assert_eq!(resolve_payer("15550102030", &tenants).unwrap().id, "TENANT-00001");
        assert_eq!(resolve_payer("Mr Bob Stone", &tenants).unwrap().id, "TENANT-00002");
        assert!(resolve_payer("Unknown Corp", &tenants).is_none());
        assert!(resolve_payer("  ", &tenants).is_none());
    }

    #[test]
    fn test_keyword_requires_whole_word() {
        let m = matcher();
        assert!(m.memo_mentions_rent("March RENT payment"));
        assert!(m.memo_mentions_rent("rental for unit 4"));
        assert!(!m.memo_mentions_rent("parent transfer"));
        assert!(!m.memo_mentions_rent("currently unpaid"));
    }

    #[test]
    fn test_exact_amount_matches() {
        let r = row("RC-00001", 1, date(2025, 3, 5), 1000);
        let candidates = [MatchCandidate { contract_id: "RC-00001", row: &r }];
        let p = payment(Decimal::new(1000, 0), date(2025, 3, 6), "");

        assert_eq!(
            matcher().find_match(&p, &candidates),
            MatchOutcome::Matched {
                row: RowRef {
                    contract_id: "RC-00001".into(),
                    row_id: "RC-00001-001".into()
                }
            }
        );
    }

    #[test]
    fn test_exceeding_outstanding_never_matches() {
        let r = row("RC-00001", 1, date(2025, 3, 5), 1000);
        let candidates = [MatchCandidate { contract_id: "RC-00001", row: &r }];
        let p = payment(Decimal::new(100002, 2), date(2025, 3, 5), "rent");

        assert_eq!(m_reject(&p, &r), Some(Rejection::ExceedsOutstanding));
        assert_eq!(
            matcher().find_match(&p, &candidates),
            MatchOutcome::NoMatch {
                reason: NoMatchReason::NoAcceptableRow
            }
        );

        let within = payment(Decimal::new(100001, 2), date(2025, 3, 5), "");
        assert!(matches!(matcher().find_match(&within, &candidates), MatchOutcome::Matched { .. }));
    }

    fn m_reject(p: &Payment, r: &ScheduleRow) -> Option<Rejection> {
        matcher().rejection(p, r)
    }

    #[test]
    fn test_date_window_and_links() {
        let mut r = row("RC-00001", 1, date(2025, 3, 5), 1000);
        let p = payment(Decimal::new(1000, 0), date(2025, 4, 5), "rent");
        assert_eq!(m_reject(&p, &r), Some(Rejection::OutsideDateWindow));

        let p = payment(Decimal::new(500, 0), date(2025, 3, 5), "rent");
        r.allocate(PaymentAllocation {
            payment_id: Some("PAY-00099".into()),
            amount: Decimal::new(500, 0),
            date: date(2025, 3, 1),
            reference: None,
            mode: None,
        });
        assert_eq!(r.status, RowStatus::PartiallyPaid);
        assert_eq!(m_reject(&p, &r), Some(Rejection::LinkedToOtherPayment));
    }

    #[test]
    fn test_partial_needs_keyword() {
        let r = row("RC-00001", 1, date(2025, 3, 5), 1000);
        let candidates = [MatchCandidate { contract_id: "RC-00001", row: &r }];

        let plain = payment(Decimal::new(500, 0), date(2025, 3, 5), "transfer");
        assert!(matches!(matcher().find_match(&plain, &candidates), MatchOutcome::NoMatch { .. }));

        let near = payment(Decimal::new(960, 0), date(2025, 3, 5), "transfer");
        assert!(matches!(matcher().find_match(&near, &candidates), MatchOutcome::Matched { .. }));

        let keyword = payment(Decimal::new(500, 0), date(2025, 3, 5), "part of March rent");
        assert!(matches!(matcher().find_match(&keyword, &candidates), MatchOutcome::Matched { .. }));
    }

    #[test]
    fn test_ranking_prefers_closest_then_earliest() {
        let a = row("RC-00001", 1, date(2025, 3, 1), 1000);
        let b = row("RC-00002", 1, date(2025, 3, 10), 900);
        let c = row("RC-00002", 2, date(2025, 2, 20), 900);
        let candidates = [
            MatchCandidate { contract_id: "RC-00001", row: &a },
            MatchCandidate { contract_id: "RC-00002", row: &b },
            MatchCandidate { contract_id: "RC-00002", row: &c },
        ];
        let p = payment(Decimal::new(900, 0), date(2025, 3, 5), "rent");

        match matcher().find_match(&p, &candidates) {
            MatchOutcome::Matched { row } => assert_eq!(row.row_id, "RC-00002-002"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_cross_contract_tie_is_ambiguous() {
        let a = row("RC-00001", 1, date(2025, 3, 5), 1000);
        let b = row("RC-00002", 1, date(2025, 3, 5), 1000);
        let candidates = [
            MatchCandidate { contract_id: "RC-00002", row: &b },
            MatchCandidate { contract_id: "RC-00001", row: &a },
        ];
        let p = payment(Decimal::new(1000, 0), date(2025, 3, 5), "rent");

        match matcher().find_match(&p, &candidates) {
            MatchOutcome::Ambiguous { rows } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].contract_id, "RC-00001");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_no_outstanding_rows() {
        let mut r = row("RC-00001", 1, date(2025, 3, 5), 1000);
        r.status = RowStatus::Cancelled;
        let candidates = [MatchCandidate { contract_id: "RC-00001", row: &r }];
        let p = payment(Decimal::new(1000, 0), date(2025, 3, 5), "rent");
        assert_eq!(
            matcher().find_match(&p, &candidates),
            MatchOutcome::NoMatch {
                reason: NoMatchReason::NoOutstandingRows
            }
        );
    }
}
