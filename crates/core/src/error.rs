use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TallyError {
    #[error("Config error: {0}")]
    Config(String),
}
