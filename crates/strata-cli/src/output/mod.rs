//! Terminal output formatting

pub mod colors;
pub mod errors;

/// Output handler for consistent terminal formatting.
///
/// Results go to stdout so they can be piped; everything else goes to
/// stderr.
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print a result line
    pub fn result(&self, message: &str) {
        println!("{}", message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        eprintln!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
