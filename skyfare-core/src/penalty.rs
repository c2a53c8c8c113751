use chrono::NaiveDate;
use serde::Serialize;

/// Penalty charged when cancelling 1 to 3 days before departure.
pub const SHORT_NOTICE_PENALTY: i64 = 250_000;
/// Penalty charged when cancelling 4 to 14 days before departure.
pub const MID_NOTICE_PENALTY: i64 = 180_000;
/// Penalty charged when cancelling 15 or more days before departure.
pub const EARLY_NOTICE_PENALTY: i64 = 150_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBreakdown {
    pub penalty: i64,
    pub refund: i64,
}

/// Maps a payment amount and the day gap between today and departure to a
/// (penalty, refund) pair. Same-day cancellation forfeits the full payment.
///
/// Both dates are date-only; callers must truncate time-of-day before the
/// comparison and must reject departures already in the past, so
/// `departure_date >= today` holds here.
pub fn compute_refund(
    payment_amount: i64,
    departure_date: NaiveDate,
    today: NaiveDate,
) -> RefundBreakdown {
    let days_until_departure = (departure_date - today).num_days();
    debug_assert!(days_until_departure >= 0, "departed flights are rejected upstream");

    let penalty = match days_until_departure {
        0 => payment_amount,
        1..=3 => SHORT_NOTICE_PENALTY,
        4..=14 => MID_NOTICE_PENALTY,
        _ => EARLY_NOTICE_PENALTY,
    };

    RefundBreakdown {
        penalty,
        refund: (payment_amount - penalty).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    const PAYMENT: i64 = 300_000;

    fn refund_at(days_ahead: u64) -> RefundBreakdown {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let departure = today.checked_add_days(Days::new(days_ahead)).unwrap();
        compute_refund(PAYMENT, departure, today)
    }

    #[test]
    fn same_day_cancellation_forfeits_full_payment() {
        let r = refund_at(0);
        assert_eq!(r.penalty, PAYMENT);
        assert_eq!(r.refund, 0);
    }

    #[test]
    fn short_notice_band_covers_days_one_through_three() {
        assert_eq!(refund_at(1).penalty, SHORT_NOTICE_PENALTY);
        assert_eq!(refund_at(3).penalty, SHORT_NOTICE_PENALTY);
        assert_eq!(refund_at(3).refund, 50_000);
    }

    #[test]
    fn mid_notice_band_covers_days_four_through_fourteen() {
        assert_eq!(refund_at(4).penalty, MID_NOTICE_PENALTY);
        assert_eq!(refund_at(14).penalty, MID_NOTICE_PENALTY);
        assert_eq!(refund_at(14).refund, 120_000);
    }

    #[test]
    fn early_notice_band_starts_at_day_fifteen() {
        let r = refund_at(15);
        assert_eq!(r.penalty, EARLY_NOTICE_PENALTY);
        assert_eq!(r.refund, 150_000);
    }

    #[test]
    fn refund_never_goes_negative() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let departure = today.checked_add_days(Days::new(2)).unwrap();
        let r = compute_refund(100_000, departure, today);
        assert_eq!(r.penalty, SHORT_NOTICE_PENALTY);
        assert_eq!(r.refund, 0);
    }
}
