//! Page-number pagination shared by every feed.
//!
//! Requests never fail: anything outside `1..=num_pages` lands on the last
//! page, and an empty listing still has a single (empty) page 1.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

/// Fixed number of posts per feed page.
pub const PAGE_SIZE: u64 = 10;

/// The page a caller asked for, before it is resolved against a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest(i64);

impl PageRequest {
    pub fn new(number: i64) -> Self {
        Self(number)
    }

    /// Parses a raw `?page=` value. Missing or non-numeric input means page 1.
    /// Integers too large to represent are still integers, so they saturate
    /// and clamp like any other out-of-range page.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::default();
        };
        match value.parse::<i64>() {
            Ok(number) => Self(number),
            Err(err) => match err.kind() {
                IntErrorKind::PosOverflow => Self(i64::MAX),
                IntErrorKind::NegOverflow => Self(i64::MIN),
                _ => Self::default(),
            },
        }
    }

    pub fn number(self) -> i64 {
        self.0
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self(1)
    }
}

/// Resolves page requests against a known item count.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self { total, per_page: per_page.max(1) }
    }

    pub fn num_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn resolve(&self, request: PageRequest) -> u64 {
        let last = self.num_pages();
        match u64::try_from(request.number()) {
            Ok(number) if (1..=last).contains(&number) => number,
            _ => last,
        }
    }

    /// `(limit, offset)` for the resolved page number.
    pub fn window(&self, number: u64) -> (u64, u64) {
        (self.per_page, (number - 1) * self.per_page)
    }

    pub fn page<T>(&self, number: u64, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            total: self.total,
            per_page: self.per_page,
        }
    }
}

/// One slice of a feed plus what a pager needs to render around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}
