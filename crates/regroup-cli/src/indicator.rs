use std::io::{self, Write};

use regroup_core::Indicator;

/// Prints indicator messages to stderr so stdout stays parseable.
///
/// `quiet` drops loading and success messages; errors always print.
pub struct StderrIndicator {
    quiet: bool,
}

impl StderrIndicator {
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn write(&self, prefix: &str, message: &str, always: bool) {
        if self.quiet && !always {
            return;
        }
        // a closed stderr is not worth failing the command over
        let _ = writeln!(io::stderr().lock(), "{prefix} {message}");
    }
}

impl Indicator for StderrIndicator {
    fn add_loading_message(&self, message: &str) {
        self.write("…", message, false);
    }

    fn add_success_message(&self, message: &str) {
        self.write("✓", message, false);
    }

    fn add_error_message(&self, message: &str) {
        self.write("✗", message, true);
    }
}
