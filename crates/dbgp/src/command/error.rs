/// Malformed front-end input. Reported back to whoever typed it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("the \"{0}\" command does not take any argument")]
    NoArguments(&'static str),

    #[error("expecting {what}, {value:?} given")]
    InvalidNumber { what: &'static str, value: String },
}
