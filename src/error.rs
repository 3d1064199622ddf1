//! Error types

use std::fmt;

/// Error returned when loading a font into the engine
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LoadError {
    /// The discovery collaborator found no variant for the requested
    /// family name.
    FontNotFound(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::FontNotFound(family) => {
                write!(f, "no variants found for font family '{}'", family)
            }
        }
    }
}

impl std::error::Error for LoadError {}
