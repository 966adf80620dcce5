use std::fmt;

pub trait LogError<T> {
    fn log_error(self) -> Option<T>;
}

impl<T, E: fmt::Display> LogError<T> for Result<T, E> {
    fn log_error(self) -> Option<T> {
        match self {
            Ok(data) => Some(data),
            Err(e) => {
                log::error!("{:#}", e);
                None
            }
        }
    }
}
