/// Terminal output
///
/// Everything the user reads on stdout is formatted here; diagnostics go
/// through `tracing` to stderr.
pub mod report;
