use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("record is missing identity key field '{0}'")]
    MissingKeyField(String),

    #[error("identity key field '{0}' is null")]
    NullKeyField(String),

    #[error("identity key must name at least one field")]
    EmptyKey,
}
