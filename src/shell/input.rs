// Copyright 2023 Remi Bernotavicius

use std::fmt;

#[derive(Debug, PartialEq)]
pub enum InputError {
    NotANumber(String),
    Negative(String),
    Missing(&'static str),
    TooLong { minutes: u32 },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(s) => write!(f, "{s} is not a valid number."),
            Self::Negative(s) => write!(f, "{s} is less than zero."),
            Self::Missing(what) => write!(f, "a {what} is required."),
            Self::TooLong { minutes } => {
                write!(f, "{minutes} minutes is more than a day.")
            }
        }
    }
}

impl std::error::Error for InputError {}

pub type Result<T> = std::result::Result<T, InputError>;

pub fn parse_int<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse().map_err(|_| InputError::NotANumber(s.into()))
}

/// Amounts are kept to two decimal places.
pub fn parse_amount(s: &str) -> Result<f64> {
    let amount: f64 = s.parse().map_err(|_| InputError::NotANumber(s.into()))?;
    let amount = (amount * 100.0).round() / 100.0;
    if !amount.is_finite() {
        return Err(InputError::NotANumber(s.into()));
    }
    if amount < 0.0 {
        return Err(InputError::Negative(s.into()));
    }
    // -0.0 rounds in from tiny negative amounts.
    Ok(amount.abs())
}

pub fn required<T>(value: Option<T>, what: &'static str) -> Result<T> {
    value.ok_or(InputError::Missing(what))
}

#[test]
fn parse_numbers() {
    assert_eq!(parse_int::<i32>("42"), Ok(42));
    assert_eq!(
        parse_int::<i32>("forty"),
        Err(InputError::NotANumber("forty".into()))
    );
    assert_eq!(
        parse_int::<u32>("-5"),
        Err(InputError::NotANumber("-5".into()))
    );

    assert_eq!(parse_amount(".25"), Ok(0.25));
    assert_eq!(parse_amount("0.3333"), Ok(0.33));
    assert_eq!(parse_amount("NaN"), Err(InputError::NotANumber("NaN".into())));
    assert_eq!(parse_amount("-0.001"), Ok(0.0));
    assert_eq!(
        parse_amount("1e307"),
        Err(InputError::NotANumber("1e307".into()))
    );
    assert_eq!(
        parse_amount("-0.5").unwrap_err().to_string(),
        "-0.5 is less than zero."
    );
    assert_eq!(
        parse_amount("a lot").unwrap_err().to_string(),
        "a lot is not a valid number."
    );
}

#[test]
fn required_values() {
    assert_eq!(required(Some(1), "name"), Ok(1));
    assert_eq!(
        required::<String>(None, "name").unwrap_err().to_string(),
        "a name is required."
    );
}
