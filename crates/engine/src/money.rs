use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::EngineError;

/// Balance, price or order amount in integer euro cents.
///
/// Negative values are debts or debits. Arithmetic that may overflow goes
/// through the `checked_*` helpers.
///
/// ```rust
/// use engine::MoneyCents;
///
/// let beer = MoneyCents::new(2_50);
/// assert_eq!(beer.checked_mul(3), Some(MoneyCents::new(7_50)));
/// assert_eq!("-2,50".parse::<MoneyCents>().unwrap(), -beer);
/// assert_eq!(beer.to_string(), "2.50€");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Checked multiplication by a quantity (returns `None` on overflow).
    #[must_use]
    pub fn checked_mul(self, quantity: i64) -> Option<MoneyCents> {
        self.0.checked_mul(quantity).map(MoneyCents)
    }

    /// Applies a factor expressed in thousandths (`1000` = ×1), rounding
    /// half away from zero to the cent.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    ///
    /// assert_eq!(MoneyCents::new(100).scale_permille(1_105), Some(MoneyCents::new(111)));
    /// assert_eq!(MoneyCents::new(333).scale_permille(1_500), Some(MoneyCents::new(500)));
    /// ```
    #[must_use]
    pub fn scale_permille(self, factor_permille: i64) -> Option<MoneyCents> {
        let raw = i128::from(self.0) * i128::from(factor_permille);
        let half = if raw < 0 { -500 } else { 500 };
        let rounded = (raw + half) / 1000;
        i64::try_from(rounded).ok().map(MoneyCents)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let euros = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{euros}.{cents:02}€")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, |acc, value| acc + value)
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses an amount typed by an operator, such as `12`, `-3,5` or
    /// `+0.05`. At most two decimals are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidAmount(format!("{reason}: {s:?}"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            Some(_) => (false, trimmed),
            None => return Err(invalid("empty amount")),
        };
        let (units, fraction) = digits
            .split_once(['.', ','])
            .unwrap_or((digits, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) {
            return Err(invalid("invalid amount"));
        }
        if fraction.len() > 2 {
            return Err(invalid("too many decimals"));
        }
        // "5" means 50 cents.
        let fraction_cents = format!("{fraction:0<2}")
            .parse::<i64>()
            .map_err(|_| invalid("invalid amount"))?;

        let cents = units
            .parse::<i64>()
            .ok()
            .and_then(|units| units.checked_mul(100))
            .and_then(|cents| cents.checked_add(fraction_cents))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(MoneyCents(if negative { -cents } else { cents }))
    }
}
