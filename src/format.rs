use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};

/// Short Turkish month names, January first.
pub const TR_MONTHS_SHORT: [&str; 12] = [
    "Oca", "Şub", "Mar", "Nis", "May", "Haz", "Tem", "Ağu", "Eyl", "Eki", "Kas", "Ara",
];

fn group_int_digits(int_part: &str) -> String {
    // tr-TR groups thousands with '.'.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push('.');
        }
    }
    out
}

/// Format an amount the way Turkish locales display money.
///
/// Rounded half away from zero to cents, trailing zeros stripped, `.` as the
/// thousands separator and `,` as the decimal mark: `₺1.234,5`.
pub fn format_currency(value: Decimal, symbol: &str) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let plain = rounded.abs().normalize().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(symbol);
    out.push_str(&group_int_digits(int_part));
    if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// One fractional digit and a percent sign: `92.0%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// `dd.mm.yyyy HH:MM:SS` in the display zone.
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn currency_uses_turkish_separators() {
        assert_eq!(format_currency(dec("1234567.5"), "₺"), "₺1.234.567,5");
        assert_eq!(format_currency(dec("100"), "₺"), "₺100");
        assert_eq!(format_currency(dec("0"), "₺"), "₺0");
        assert_eq!(format_currency(dec("999.999"), "₺"), "₺1.000");
    }

    #[test]
    fn currency_sign_precedes_symbol() {
        assert_eq!(format_currency(dec("-1500.25"), "₺"), "-₺1.500,25");
        assert_eq!(format_currency(dec("-0.001"), "₺"), "₺0");
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(format_percent(92.0), "92.0%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn timestamp_is_local_to_display_zone() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 22, 30, 0).unwrap();
        assert_eq!(
            format_timestamp(at, chrono_tz::Europe::Istanbul),
            "01.01.2025 01:30:00"
        );
    }
}
