//! Document kinds and the human-readable document number format.
//!
//! Format: `{PREFIX}-{YYYY}-{MM}-{NNNN}`, e.g. `INV-2024-01-0001`. The sequence
//! restarts every calendar month and is counted per tenant and per kind.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Highest sequence that fits the 4-digit suffix.
pub const MAX_MONTHLY_SEQUENCE: u32 = 9_999;

/// Kind of numbered document. Each kind has its own prefix and its own
/// monthly sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Quotation,
    StandardInvoice,
    AdvanceInvoice,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Quotation => "QTN",
            DocumentKind::StandardInvoice => "INV",
            DocumentKind::AdvanceInvoice => "ADV",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "QTN" => Some(DocumentKind::Quotation),
            "INV" => Some(DocumentKind::StandardInvoice),
            "ADV" => Some(DocumentKind::AdvanceInvoice),
            _ => None,
        }
    }
}

/// Year and month a document number is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NumberingPeriod {
    pub year: i32,
    pub month: u32,
}

impl NumberingPeriod {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Prefix shared by every number of `kind` in this period, including the
    /// trailing dash (e.g. `"ADV-2024-03-"`).
    pub fn prefix_for(&self, kind: DocumentKind) -> String {
        format!("{}-{:04}-{:02}-", kind.prefix(), self.year, self.month)
    }
}

/// A formatted, tenant-scoped document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    /// Format the `sequence`-th (1-based) number of `kind` in `period`.
    pub fn format(kind: DocumentKind, period: NumberingPeriod, sequence: u32) -> DomainResult<Self> {
        if sequence == 0 {
            return Err(DomainError::validation("document sequence is 1-based"));
        }
        if sequence > MAX_MONTHLY_SEQUENCE {
            return Err(DomainError::validation(format!(
                "{} sequence exhausted for {:04}-{:02}",
                kind.prefix(),
                period.year,
                period.month
            )));
        }
        Ok(Self(format!("{}{:04}", period.prefix_for(kind), sequence)))
    }

    /// Parse and validate a number of the form `PFX-YYYY-MM-NNNN`.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let invalid = || DomainError::invalid_id(format!("document number: {raw}"));

        let mut parts = raw.split('-');
        let (Some(prefix), Some(year), Some(month), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
        if DocumentKind::from_prefix(prefix).is_none()
            || !digits(year, 4)
            || !digits(month, 2)
            || !digits(seq, 4)
        {
            return Err(invalid());
        }
        let month_no: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month_no) {
            return Err(invalid());
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.0.split('-').next().and_then(DocumentKind::from_prefix)
    }

    /// The 1-based monthly sequence encoded in the suffix.
    pub fn sequence(&self) -> Option<u32> {
        self.0.rsplit('-').next().and_then(|s| s.parse().ok())
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
