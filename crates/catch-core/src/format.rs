//! Currency formatting
//!
//! Prices are plain `f64` amounts; formatting rounds to the nearest cent
//! and applies the locale's symbol, grouping and decimal separator.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Rendered in place of an amount that is not a finite number
pub const NOT_A_PRICE: &str = "—";

/// Locales with a known currency rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// US dollars: `$1,234.56`
    #[default]
    EnUs,
    /// Pounds sterling: `£1,234.56`
    EnGb,
    /// Euros, German style: `1.234,56 €`
    DeDe,
    /// Euros, French style: `1 234,56 €`
    FrFr,
}

struct CurrencyRule {
    symbol: &'static str,
    symbol_first: bool,
    group: char,
    decimal: char,
}

impl Locale {
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
        }
    }

    fn rule(&self) -> CurrencyRule {
        match self {
            Locale::EnUs => CurrencyRule {
                symbol: "$",
                symbol_first: true,
                group: ',',
                decimal: '.',
            },
            Locale::EnGb => CurrencyRule {
                symbol: "£",
                symbol_first: true,
                group: ',',
                decimal: '.',
            },
            Locale::DeDe => CurrencyRule {
                symbol: "€",
                symbol_first: false,
                group: '.',
                decimal: ',',
            },
            Locale::FrFr => CurrencyRule {
                symbol: "€",
                symbol_first: false,
                group: ' ',
                decimal: ',',
            },
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en-us" | "en" | "us" => Ok(Locale::EnUs),
            "en-gb" | "gb" | "uk" => Ok(Locale::EnGb),
            "de-de" | "de" => Ok(Locale::DeDe),
            "fr-fr" | "fr" => Ok(Locale::FrFr),
            _ => Err(ValidationError::UnknownLocale { tag: s.to_string() }),
        }
    }
}

/// Format an amount as a currency string with two decimals
///
/// Rounds half away from zero to the nearest cent. Non-finite amounts
/// render as [`NOT_A_PRICE`].
pub fn format_price(amount: f64, locale: Locale) -> String {
    if !amount.is_finite() {
        return NOT_A_PRICE.to_string();
    }

    let cents = (amount * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.unsigned_abs();
    let rule = locale.rule();

    let number = format!(
        "{}{}{:02}",
        group_digits(cents / 100, rule.group),
        rule.decimal,
        cents % 100
    );
    let sign = if negative { "-" } else { "" };

    if rule.symbol_first {
        format!("{}{}{}", sign, rule.symbol, number)
    } else {
        format!("{}{} {}", sign, number, rule.symbol)
    }
}

/// Insert a separator between every group of three digits
fn group_digits(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_nearest_cent() {
        assert_eq!(format_price(9.999, Locale::EnUs), "$10.00");
        assert_eq!(format_price(9.994, Locale::EnUs), "$9.99");
        assert_eq!(format_price(2.0 * 9.99, Locale::EnUs), "$19.98");
    }

    #[test]
    fn test_zero_is_a_price() {
        assert_eq!(format_price(0.0, Locale::EnUs), "$0.00");
        assert_eq!(format_price(-0.0, Locale::EnUs), "$0.00");
    }

    #[test]
    fn test_grouping_and_locales() {
        assert_eq!(format_price(1234567.891, Locale::EnUs), "$1,234,567.89");
        assert_eq!(format_price(1234.5, Locale::EnGb), "£1,234.50");
        assert_eq!(format_price(1234.5, Locale::DeDe), "1.234,50 €");
        assert_eq!(format_price(1234.5, Locale::FrFr), "1 234,50 €");
        assert_eq!(format_price(999.0, Locale::EnUs), "$999.00");
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(format_price(-5.5, Locale::EnUs), "-$5.50");
        assert_eq!(format_price(-5.5, Locale::DeDe), "-5,50 €");
    }

    #[test]
    fn test_non_finite_amounts() {
        assert_eq!(format_price(f64::NAN, Locale::EnUs), NOT_A_PRICE);
        assert_eq!(format_price(f64::INFINITY, Locale::EnUs), NOT_A_PRICE);
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en_US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("de".parse::<Locale>().unwrap(), Locale::DeDe);
        assert_eq!(Locale::FrFr.to_string(), "fr-FR");
        assert!("xx-YY".parse::<Locale>().is_err());
    }
}
