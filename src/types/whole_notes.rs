use anyhow::Result;
use anyhow::anyhow;
use num_rational::Ratio;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Exact duration or position expressed in whole notes (a quarter note is `1/4`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WholeNotes {
    repr: Ratio<u64>,
}

impl WholeNotes {
    pub fn zero() -> Self {
        Self {
            repr: Ratio::from_integer(0),
        }
    }

    /// Panics if `denominator` is zero; use `FromStr` for untrusted input.
    pub fn new(numerator: u64, denominator: u64) -> Self {
        assert!(denominator != 0, "WholeNotes denominator must be non-zero");
        Self {
            repr: Ratio::new(numerator, denominator),
        }
    }

    pub fn whole(count: u64) -> Self {
        Self {
            repr: Ratio::from_integer(count),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self.repr.numer() == 0
    }

    pub fn numerator(&self) -> u64 {
        *self.repr.numer()
    }

    pub fn denominator(&self) -> u64 {
        *self.repr.denom()
    }

    /// Scales by `numerator / denominator`, as needed for tuplets.
    pub fn scaled(&self, numerator: u64, denominator: u64) -> Self {
        assert!(denominator != 0, "scale denominator must be non-zero");
        Self {
            repr: self.repr * Ratio::new(numerator, denominator),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator() as f64 / self.denominator() as f64
    }
}

impl Default for WholeNotes {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for WholeNotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator() == 1 {
            f.pad(&format!("{}", self.numerator()))
        } else {
            f.pad(&format!("{}/{}", self.numerator(), self.denominator()))
        }
    }
}

impl fmt::Debug for WholeNotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WholeNotes({})", self)
    }
}

impl Add for WholeNotes {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            repr: self.repr + other.repr,
        }
    }
}

impl Sub for WholeNotes {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        if other.repr >= self.repr {
            Self::zero()
        } else {
            Self {
                repr: self.repr - other.repr,
            }
        }
    }
}

impl FromStr for WholeNotes {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        let mut parts = s.splitn(2, '/');
        let numerator_str = parts.next().ok_or_else(|| anyhow!("Invalid duration: {}", s))?;
        let denominator_str = parts.next().unwrap_or("1");

        let is_number = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !is_number(numerator_str) || !is_number(denominator_str) {
            return Err(anyhow!("Invalid duration: {}", s));
        }

        let numerator: u64 = numerator_str
            .parse()
            .map_err(|_e| anyhow!("Invalid duration: {}", s))?;
        let denominator: u64 = denominator_str
            .parse()
            .map_err(|_e| anyhow!("Invalid duration: {}", s))?;

        if denominator == 0 {
            return Err(anyhow!("Invalid duration: {} (zero denominator)", s));
        }

        Ok(Self::new(numerator, denominator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing() {
        let d: WholeNotes = "3/4".parse().unwrap();
        assert_eq!(d.numerator(), 3);
        assert_eq!(d.denominator(), 4);
        assert_eq!(d.to_string(), "3/4");

        assert_eq!("1".parse::<WholeNotes>().unwrap().to_string(), "1");
        assert_eq!("0".parse::<WholeNotes>().unwrap().to_string(), "0");
        assert_eq!("2/8".parse::<WholeNotes>().unwrap().to_string(), "1/4");
        assert_eq!(" 6/4 ".parse::<WholeNotes>().unwrap().to_string(), "3/2");
        assert_eq!("4/4".parse::<WholeNotes>().unwrap().to_string(), "1");
    }

    #[test]
    fn test_parse_error() {
        assert!("".parse::<WholeNotes>().is_err());
        assert!("-1/4".parse::<WholeNotes>().is_err());
        assert!("1/0".parse::<WholeNotes>().is_err());
        assert!("1/".parse::<WholeNotes>().is_err());
        assert!("/4".parse::<WholeNotes>().is_err());
        assert!("0.25".parse::<WholeNotes>().is_err());
        assert!("1/4/2".parse::<WholeNotes>().is_err());
        assert!("a".parse::<WholeNotes>().is_err());
    }

    #[test]
    fn test_op() {
        let quarter = WholeNotes::new(1, 4);
        let eighth = WholeNotes::new(1, 8);
        assert_eq!((quarter + eighth).to_string(), "3/8");
        assert_eq!((quarter - eighth).to_string(), "1/8");

        // saturates instead of underflowing
        assert_eq!(eighth - quarter, WholeNotes::zero());

        assert!(eighth < quarter);
        assert_eq!(quarter + quarter + quarter + quarter, WholeNotes::whole(1));
    }

    #[test]
    fn test_scaled() {
        let triplet_eighth = WholeNotes::new(1, 8).scaled(2, 3);
        assert_eq!(triplet_eighth.to_string(), "1/12");
        assert_eq!(
            triplet_eighth + triplet_eighth + triplet_eighth,
            WholeNotes::new(1, 4)
        );
    }
}
