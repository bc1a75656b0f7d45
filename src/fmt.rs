/// Format a float with thousands separators and a currency code: 1,234.56 USD
pub fn money(val: f64, currency: &str) -> String {
    let amount = amount(val);
    format!("{amount} {currency}")
}

/// Format a float with thousands separators, no currency: 1,234.56
pub fn amount(val: f64) -> String {
    if !val.is_finite() {
        return val.to_string();
    }
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Percent with one decimal and an explicit sign for positive values.
pub fn pct(val: f64) -> String {
    if val > 0.0 {
        format!("+{val:.1}%")
    } else {
        format!("{val:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56, "USD"), "1,234.56 USD");
        assert_eq!(money(-500.00, "EUR"), "-500.00 EUR");
        assert_eq!(money(0.0, "INR"), "0.00 INR");
        assert_eq!(money(1000000.99, "USD"), "1,000,000.99 USD");
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(42.1), "42.10");
        assert_eq!(amount(-1234.5), "-1,234.50");
    }

    #[test]
    fn test_amount_non_finite_does_not_panic() {
        assert_eq!(amount(f64::NAN), "NaN");
        assert_eq!(amount(f64::INFINITY), "inf");
        assert_eq!(amount(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_pct_formatting() {
        assert_eq!(pct(12.34), "+12.3%");
        assert_eq!(pct(-7.0), "-7.0%");
        assert_eq!(pct(0.0), "0.0%");
    }
}
