//! Toast-style status messages shown while merge and unmerge run.

/// Global indicator service supplied by the host.
pub trait Indicator {
    fn add_loading_message(&self, message: &str);
    fn add_success_message(&self, message: &str);
    fn add_error_message(&self, message: &str);
}
