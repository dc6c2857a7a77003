use thiserror::Error;

/// Reading an uploaded file into a [`Table`](super::model::Table) failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not decode file: {0}. Save it as UTF-8 or Latin-1 and upload it again")]
    Encoding(String),
    #[error("could not read table: {0}")]
    Format(String),
    #[error("I/O error while reading file")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("no numeric columns found; check the file contents")]
    NoMeasurements,
}

/// A time-of-day filter or highlight request was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("column '{0}' contains no readable timestamps; choose a different column")]
    UnparseableColumn(String),
    #[error("start time must be before end time; adjust the time window")]
    InvalidWindow,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("select at least one column for the y-axis")]
    NoSeriesSelected,
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("column '{0}' is not a time column")]
    NotTemporal(String),
    #[error("no rows left after removing missing values; choose different columns or widen the filter")]
    EmptyAfterClean,
}
