//! Human readable ticket numbers, `TK<YYMMDD><NNNN>`.
//!
//! The sequence restarts every calendar day and stops at [`MAX_SEQUENCE`].
//! Allocation itself happens in the insert statement, see
//! [`crate::ticket::TicketRepository::insert`].
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

pub const PREFIX: &str = "TK";
const DATE_FORMAT: &str = "%y%m%d";
const DATE_LENGTH: usize = 6;
const SEQUENCE_WIDTH: usize = 4;

/// Last number of a day that fits the four digit suffix.
pub const MAX_SEQUENCE: u32 = 9999;

/// Parsed ticket number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TicketNumber {
    pub day: NaiveDate,
    pub sequence: u32,
}

impl TicketNumber {
    /// `TK<YYMMDD>` shared by every ticket of `day`.
    pub fn day_prefix(day: NaiveDate) -> String {
        format!("{PREFIX}{}", day.format(DATE_FORMAT))
    }

    /// Today's prefix, local time.
    pub fn today_prefix() -> String {
        Self::day_prefix(chrono::Local::now().date_naive())
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            Self::day_prefix(self.day),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl FromStr for TicketNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("`{s}` is not a ticket number");

        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if rest.len() != DATE_LENGTH + SEQUENCE_WIDTH || !rest.is_ascii() {
            return Err(invalid());
        }

        let (date, sequence) = rest.split_at(DATE_LENGTH);
        if !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let day = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid())?;
        let sequence = sequence.parse().map_err(|_| invalid())?;

        Ok(Self { day, sequence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let number = TicketNumber {
            day: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            sequence: 7,
        };
        assert_eq!(number.to_string(), "TK2501010007");
        assert_eq!("TK2501010007".parse(), Ok(number));
    }

    #[test]
    fn test_parse_invalid() {
        for raw in ["", "TK", "TK250101", "XX2501010001", "TK2513010001", "TK250101abcd",
            "TK25010110000", "TK250101+001"] {
            assert!(raw.parse::<TicketNumber>().is_err(), "{raw}");
        }
    }

    #[test]
    fn test_ordering_within_day() {
        let first: TicketNumber = "TK2501010009".parse().unwrap();
        let second: TicketNumber = "TK2501010010".parse().unwrap();
        assert!(first < second);
    }
}
