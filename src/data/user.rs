//! User records: validation rules, wire date parsing and the birthday
//! countdown.

use chrono::{Datelike, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::validator::{USERNAME_RX, Validator, matches};

/// Wire format for dates of birth.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A stored user, keyed by `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub date_of_birth: NaiveDate,
}

impl User {
    /// Greeting for today's date in the server's local time zone.
    pub fn birthday_message(&self) -> String {
        self.birthday_message_on(Local::now().date_naive())
    }

    pub fn birthday_message_on(&self, today: NaiveDate) -> String {
        match days_until_birthday(self.date_of_birth, today) {
            0 => format!("Hello, {}! Happy birthday!", self.username),
            days => format!("Hello, {}! Your birthday is in {days} day(s)", self.username),
        }
    }
}

/// Checks a user against the persistence rules, as of the current UTC date.
pub fn validate_user(v: &mut Validator, user: &User) {
    validate_user_on(v, user, Utc::now().date_naive());
}

/// A date of birth is accepted up to and including `today`: its midnight has
/// already passed.
pub fn validate_user_on(v: &mut Validator, user: &User, today: NaiveDate) {
    v.check(matches(&user.username, &USERNAME_RX), "username", "must contain only letters");
    v.check(Some(user.date_of_birth) != NaiveDate::from_ymd_opt(1, 1, 1), "dateOfBirth", "must be provided");
    v.check(user.date_of_birth <= today, "dateOfBirth", "must be in the past");
}

/// Parses a strict `YYYY-MM-DD` date; no signs, no missing zero padding.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok()
}

/// Whole days from `today` until the next anniversary of `date_of_birth`;
/// zero on the day itself.
///
/// Feb 29 birthdays fall on Feb 28 in non-leap years.
pub fn days_until_birthday(date_of_birth: NaiveDate, today: NaiveDate) -> i64 {
    let mut next = anniversary(date_of_birth, today.year());
    if next < today {
        next = anniversary(date_of_birth, today.year() + 1);
    }
    (next - today).num_days()
}

fn anniversary(date_of_birth: NaiveDate, year: i32) -> NaiveDate {
    let (month, day) = (date_of_birth.month(), date_of_birth.day());
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, day - 1))
        // only outside chrono's supported years
        .unwrap_or(NaiveDate::MAX)
}
