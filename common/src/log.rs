use std::{panic, path::Path, thread};

use ::log::LevelFilter;
use anyhow::{Context, Result};
use backtrace::Backtrace;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

pub const LOG_INFO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/log/info.yml");
pub const LOG_DEBUG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/log/debug.yml");
pub const LOG_TRACE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/log/trace.yml");
pub const LOG_TESTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/log/tests.yml");

const FALLBACK_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Initialize `log4rs` from a YAML config file.
///
/// The default config paths point into the source tree. When the binary runs
/// somewhere the file does not exist, a stderr logger at `info` is installed
/// instead of failing.
pub fn init_log(log_config: &Path) -> Result<()> {
    set_panic_log_hook();

    if !log_config.is_file() && is_default_config(log_config) {
        init_stderr_log(LevelFilter::Info)?;
        ::log::debug!(
            "log config {:?} not found, using stderr logger",
            log_config
        );
        return Ok(());
    }

    log4rs::init_file(log_config, Default::default()).with_context(|| {
        format!(
            "Failed to initialize logger with config from {:?}",
            &log_config
        )
    })
}

pub fn init_stderr_log(level: LevelFilter) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(FALLBACK_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .context("Failed to build stderr log config")?;

    log4rs::init_config(config)
        .map(|_| ())
        .context("Failed to initialize stderr logger")
}

fn is_default_config(log_config: &Path) -> bool {
    [LOG_INFO, LOG_DEBUG, LOG_TRACE, LOG_TESTS]
        .iter()
        .any(|default| Path::new(default) == log_config)
}

fn set_panic_log_hook() {
    panic::set_hook(Box::new(move |info| {
        let thread = thread::current();
        let thread = thread.name().unwrap_or("<unnamed>");

        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &**s,
                None => "Box<Any>",
            },
        };

        match info.location() {
            Some(location) => {
                ::log::error!(
                    target: "panic", "thread '{}' panicked at '{}': {}:{}",
                    thread,
                    msg,
                    location.file(),
                    location.line()
                );
            }
            None => ::log::error!(
                target: "panic",
                "thread '{}' panicked at '{}'",
                thread,
                msg
            ),
        }

        ::log::error!(target: "panic::debug_info", "{:?}", Backtrace::default());
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_recognized() {
        assert!(is_default_config(Path::new(LOG_INFO)));
        assert!(is_default_config(Path::new(LOG_TRACE)));
        assert!(!is_default_config(Path::new("/tmp/custom-log.yml")));
    }

    #[test]
    fn shipped_configs_exist() {
        for config in [LOG_INFO, LOG_DEBUG, LOG_TRACE, LOG_TESTS] {
            assert!(Path::new(config).is_file(), "missing {config}");
        }
    }
}
