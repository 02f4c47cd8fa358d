use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TaxonomyError {
    /// The embedded reference data is missing a required piece or fails to
    /// parse. Fatal at startup: the taxonomy cannot serve queries without it.
    #[error("invalid standard-clause reference data: {0}")]
    Configuration(String),

    /// A priority string outside {critical, important, optional}. This is a
    /// programmer error, not missing data — absent profiles and clauses
    /// yield empty results instead.
    #[error("unknown clause priority: {0:?}")]
    InvalidPriority(String),
}
