use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Why a run couldn't start.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration is missing, unreadable or unusable.
    #[display("invalid configuration")]
    Config,
    /// Storage or the HTTP client couldn't be prepared.
    #[display("could not prepare the run")]
    Setup,
}
