use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use thiserror::Error;

pub const DEFAULT_START_YEAR: u32 = 2020;
pub const DEFAULT_END_YEAR: u32 = 2050;

/// An immutable, inclusive span of calendar years.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub struct YearRange {
    #[serde(rename(deserialize = "start"))]
    start: u32,
    #[serde(rename(deserialize = "end"))]
    end: u32,
}

#[derive(Debug, Error, PartialEq)]
#[error("A year range must not end ({end}) before it starts ({start})")]
pub struct InvalidYearRangeError {
    start: u32,
    end: u32,
}

impl YearRange {
    pub fn new(start: u32, end: u32) -> Result<Self, InvalidYearRangeError> {
        if end < start {
            return Err(InvalidYearRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, year: u32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Position of `year` within the range, if it falls inside it.
    pub fn index_of(&self, year: u32) -> Option<usize> {
        self.contains(year).then(|| (year - self.start) as usize)
    }

    /// Year found at position `idx`, counted from the start year.
    pub fn get(&self, idx: usize) -> Option<u32> {
        (idx < self.len()).then(|| self.start + idx as u32)
    }

    /// The part of this range that also lies within `[start, end]`.
    pub fn subset(&self, start: u32, end: u32) -> Option<YearRange> {
        let start = start.max(self.start);
        let end = end.min(self.end);
        (start <= end).then_some(YearRange { start, end })
    }

    /// Years strictly before `year`.
    pub fn before(&self, year: u32) -> Option<YearRange> {
        year.checked_sub(1).and_then(|end| self.subset(self.start, end))
    }

    /// Years from `year` onwards.
    pub fn from_year(&self, year: u32) -> Option<YearRange> {
        self.subset(year, self.end)
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: DEFAULT_END_YEAR,
        }
    }
}

impl IntoIterator for YearRange {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.start..=self.end
    }
}

impl IntoIterator for &YearRange {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for YearRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
