//! Preparation statuses and the case-status rule.

use catalog_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Preparation state of a single slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidePreparationStatus {
    /// Registered, nothing done yet.
    NotStarted,
    /// Preparation in progress.
    Processing,
    /// Preparation finished.
    Done,
    /// Preparation failed.
    Error,
}

/// Preparation state of a case, derived from its slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePreparationStatus {
    /// No preparation started. Never produced by
    /// [`case_preparation_status`]; kept for the stored code range.
    NotStarted,
    /// At least one slide is not finished.
    Processing,
    /// Every slide is done.
    Done,
    /// At least one slide failed.
    Error,
}

/// Derives a case's status from the statuses of all of its slides.
///
/// Error wins over everything; otherwise any slide that is not started or
/// still processing makes the case Processing; otherwise (including a case
/// with no slides) the case is Done. This is the only place the rule lives:
/// it stamps event payloads and therefore everything projected from them.
pub fn case_preparation_status<I>(slides: I) -> CasePreparationStatus
where
    I: IntoIterator<Item = SlidePreparationStatus>,
{
    let mut any_unfinished = false;

    for status in slides {
        match status {
            SlidePreparationStatus::Error => return CasePreparationStatus::Error,
            SlidePreparationStatus::NotStarted | SlidePreparationStatus::Processing => {
                any_unfinished = true;
            }
            SlidePreparationStatus::Done => {}
        }
    }

    if any_unfinished {
        CasePreparationStatus::Processing
    } else {
        CasePreparationStatus::Done
    }
}

impl SlidePreparationStatus {
    /// Stored small-integer code.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::NotStarted => 1,
            Self::Processing => 2,
            Self::Done => 3,
            SlidePreparationStatus::Error => 4,
        }
    }
}

impl TryFrom<i16> for SlidePreparationStatus {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(Self::NotStarted),
            2 => Ok(Self::Processing),
            3 => Ok(Self::Done),
            4 => Ok(SlidePreparationStatus::Error),
            other => Err(DomainError::storage(
                "decode slide status",
                format!("unknown code {other}"),
            )),
        }
    }
}

impl CasePreparationStatus {
    /// Stored small-integer code.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::NotStarted => 1,
            Self::Processing => 2,
            Self::Done => 3,
            CasePreparationStatus::Error => 4,
        }
    }
}

impl TryFrom<i16> for CasePreparationStatus {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(Self::NotStarted),
            2 => Ok(Self::Processing),
            3 => Ok(Self::Done),
            4 => Ok(CasePreparationStatus::Error),
            other => Err(DomainError::storage(
                "decode case status",
                format!("unknown code {other}"),
            )),
        }
    }
}
