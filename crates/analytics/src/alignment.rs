//! Pairing of return series before they are compared.
//!
//! The engine never compares raw series directly; it asks a `SeriesAlignment` to line them
//! up first. `PositionalAlignment` pairs observations by index, which silently compares
//! different calendar days when histories have different lengths. A date-keyed
//! implementation can be dropped in through the same trait.

use crate::returns::ReturnSeries;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt::Debug;

/// Several series lined up to a common length, plus the dates of the common rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries<'a> {
    pub columns: Vec<Cow<'a, [f64]>>,
    pub dates: Vec<NaiveDate>,
}

impl AlignedSeries<'_> {
    /// Number of aligned rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Two series lined up to a common length.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair<'a> {
    pub left: Cow<'a, [f64]>,
    pub right: Cow<'a, [f64]>,
}

impl AlignedPair<'_> {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

pub trait SeriesAlignment: Debug + Send + Sync {
    /// Lines up every series in `series`; all returned columns have the same length.
    fn align_all<'a>(&self, series: &[&'a ReturnSeries]) -> AlignedSeries<'a>;

    fn align_pair<'a>(&self, left: &'a ReturnSeries, right: &'a ReturnSeries) -> AlignedPair<'a> {
        let mut columns = self.align_all(&[left, right]).columns.into_iter();
        match (columns.next(), columns.next()) {
            (Some(left), Some(right)) => AlignedPair { left, right },
            _ => AlignedPair {
                left: Cow::Borrowed(&[]),
                right: Cow::Borrowed(&[]),
            },
        }
    }
}

/// Truncates every series to the shortest one and pairs rows by index.
///
/// The dates of the common rows are taken from the first series.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalAlignment;

impl SeriesAlignment for PositionalAlignment {
    fn align_all<'a>(&self, series: &[&'a ReturnSeries]) -> AlignedSeries<'a> {
        let n = series.iter().map(|s| s.len()).min().unwrap_or(0);
        AlignedSeries {
            columns: series
                .iter()
                .map(|s| Cow::Borrowed(&s.values()[..n]))
                .collect(),
            dates: series
                .first()
                .map(|s| s.dates()[..n].to_vec())
                .unwrap_or_default(),
        }
    }
}
