use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use formats::FormatErr;
use machine_learning::{MlErr, initialization::RandErr};

pub type Result<T> = std::result::Result<T, FixtureErr>;

/// Failures while generating the fixtures.
#[derive(Debug)]
pub enum FixtureErr {
    /// Building or running one of the models failed.
    Ml(MlErr),
    /// Exporting or writing a fixture file failed.
    Format(FormatErr),
    Io(io::Error),
}

impl Display for FixtureErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureErr::Ml(e) => write!(f, "model error: {e}"),
            FixtureErr::Format(e) => write!(f, "export error: {e}"),
            FixtureErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for FixtureErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FixtureErr::Ml(e) => Some(e),
            FixtureErr::Format(e) => Some(e),
            FixtureErr::Io(e) => Some(e),
        }
    }
}

impl From<MlErr> for FixtureErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<RandErr> for FixtureErr {
    fn from(value: RandErr) -> Self {
        Self::Ml(value.into())
    }
}

impl From<FormatErr> for FixtureErr {
    fn from(value: FormatErr) -> Self {
        Self::Format(value)
    }
}

impl From<io::Error> for FixtureErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
