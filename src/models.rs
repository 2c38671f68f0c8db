//! Data models shared by the report and crawler flows.
//!
//! - [`Company`]: a monitored company as read from the config file
//! - [`Report`]: a single ESPI/EBI disclosure row inside the date window
//! - [`ArticleListing`]: a news summary discovered while paginating
//! - [`Article`]: a listing together with its fetched body
//! - [`DateWindow`]: inclusive `[start, end]` range used for filtering

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// A monitored company.
///
/// The name is the identity: it is the display key in the report and, lower-cased,
/// the path segment of the stockwatch.pl listing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub name: String,
    pub ticker: String,
}

/// A disclosure found in a company's ESPI/EBI listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Configured company name this report was collected for.
    pub company: String,
    /// Publication date (serialized as `YYYY-MM-DD`).
    pub date: NaiveDate,
    pub title: String,
    /// Absolute link to the disclosure.
    pub link: String,
}

/// A news item seen on a listing page, before its body is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListing {
    pub company: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub link: String,
}

/// A news article ready to be appended to the CSV store.
///
/// `body` holds either the extracted text or one of the sentinel strings from
/// [`crate::scrapers::article`] when extraction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub company: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub link: String,
    pub body: String,
}

impl Article {
    pub fn from_listing(listing: ArticleListing, body: String) -> Self {
        Self {
            company: listing.company,
            title: listing.title,
            date: listing.date,
            link: listing.link,
            body,
        }
    }
}

/// Error returned when a window would end before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertedWindow;

impl fmt::Display for InvertedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "date window start is after its end")
    }
}

impl std::error::Error for InvertedWindow {}

/// Error returned when a trailing window reaches past the calendar chrono supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOutOfRange {
    pub days: u32,
}

impl fmt::Display for WindowOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {}-day window reaches before the earliest supported date", self.days)
    }
}

impl std::error::Error for WindowOutOfRange {}

/// Inclusive `[start, end]` range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow<T> {
    start: T,
    end: T,
}

impl<T: PartialOrd + Copy> DateWindow<T> {
    pub fn new(start: T, end: T) -> Result<Self, InvertedWindow> {
        if start > end {
            return Err(InvertedWindow);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> T {
        self.start
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn contains(&self, value: T) -> bool {
        self.start <= value && value <= self.end
    }
}

impl DateWindow<NaiveDate> {
    /// `[today - days, today]`.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Result<Self, WindowOutOfRange> {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or(WindowOutOfRange { days })?;
        Ok(Self { start, end: today })
    }
}
