use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("cannot open the dataset target")]
    Storage,
    #[display("cannot set up DICOM conversion")]
    Convert,
    /// The run finished, but some files were not placed.
    #[display("{_0} file(s) could not be processed")]
    Incomplete(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Incomplete(_))
    }
}
