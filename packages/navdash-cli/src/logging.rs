/// Logger setup for the navdash binary.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug and the
/// default is info. Output goes to stderr so command output on stdout stays
/// clean for piping.
use env_logger::{Builder, Env, Target};
use log::SetLoggerError;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

pub fn init(verbose: bool) -> Result<(), SetLoggerError> {
    Builder::from_env(Env::default().default_filter_or(default_filter(verbose)))
        .target(Target::Stderr)
        .format_timestamp_millis()
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }
}
