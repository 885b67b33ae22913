//! Duration value type (RFC 5545 §3.3.6).

/// A nominal duration.
///
/// Weeks are exclusive with the day/time components per the RFC grammar,
/// but the struct does not enforce that; the parser never produces both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    pub negative: bool,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Duration {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Builds a duration from signed whole minutes.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "sub-u32 after division")]
    pub const fn from_minutes(minutes: i64) -> Self {
        let negative = minutes < 0;
        let abs = minutes.unsigned_abs();
        Self {
            negative,
            weeks: 0,
            days: 0,
            hours: (abs / 60) as u32,
            minutes: (abs % 60) as u32,
            seconds: 0,
        }
    }

    /// Total signed length in seconds.
    #[must_use]
    pub const fn total_seconds(&self) -> i64 {
        let unsigned = self.weeks as i64 * 7 * 86_400
            + self.days as i64 * 86_400
            + self.hours as i64 * 3_600
            + self.minutes as i64 * 60
            + self.seconds as i64;
        if self.negative { -unsigned } else { unsigned }
    }

    /// Total signed length in whole minutes, truncating seconds.
    #[must_use]
    pub const fn total_minutes(&self) -> i64 {
        self.total_seconds() / 60
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.weeks == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;

        if self.weeks > 0 {
            return write!(f, "{}W", self.weeks);
        }

        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }

        let has_time = self.hours > 0 || self.minutes > 0 || self.seconds > 0;
        if has_time || self.days == 0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 || (self.hours == 0 && self.seconds == 0) {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_weeks() {
        let d = Duration {
            weeks: 2,
            ..Duration::zero()
        };
        assert_eq!(d.to_string(), "P2W");
    }

    #[test]
    fn display_negative_minutes() {
        assert_eq!(Duration::from_minutes(-15).to_string(), "-PT15M");
    }

    #[test]
    fn display_day_time() {
        let d = Duration {
            days: 1,
            hours: 2,
            minutes: 30,
            ..Duration::zero()
        };
        assert_eq!(d.to_string(), "P1DT2H30M");
    }

    #[test]
    fn total_minutes_signed() {
        assert_eq!(Duration::from_minutes(-90).total_minutes(), -90);
        assert_eq!(Duration::from_minutes(90).total_seconds(), 5_400);
    }

    #[test]
    fn zero_displays_as_pt0m() {
        assert_eq!(Duration::zero().to_string(), "PT0M");
    }
}
