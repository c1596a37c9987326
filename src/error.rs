use std::fmt::Write;

/// Logs the error of a `Result` that is not propagated any further.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error, including its source chain, and converts into an `Option`.
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{}", error_chain(&err));
                None
            }
        }
    }
}

/// Formats `err` followed by each of its sources that is not already part of
/// the message.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !out.contains(&message) {
            let _ = write!(out, ": {message}");
        }
        source = cause.source();
    }
    out
}
