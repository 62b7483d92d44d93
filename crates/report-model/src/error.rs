use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid source id: {0:?}")]
    InvalidSourceId(String),
    #[error("unknown source kind: {0}")]
    UnknownSourceKind(String),
    #[error("unknown transformation kind: {0}")]
    UnknownTransformKind(String),
    #[error("unknown period selector: {0}")]
    UnknownPeriod(String),
    #[error("unsupported aggregation function: {0}")]
    UnsupportedAggregation(String),
    #[error("unsupported join type: {0}")]
    UnsupportedJoinType(String),
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),
    #[error("date_from {date_from} is after date_to {date_to}")]
    InvertedRange {
        date_from: NaiveDate,
        date_to: NaiveDate,
    },
    #[error("{field} {date} is in the future (today is {today})")]
    FutureDate {
        field: &'static str,
        date: NaiveDate,
        today: NaiveDate,
    },
    #[error("date arithmetic out of range relative to {0}")]
    DateOutOfRange(NaiveDate),
}

pub type Result<T> = std::result::Result<T, ModelError>;
