/// Path resolution module
///
/// This module handles:
/// - Translating catalog paths through ordered prefix rules (resolver.rs)
/// - Finding the file on disk and reading its modification time (probe.rs)
/// - Reporting how well the rules cover the catalog (analysis.rs)
pub mod analysis;
pub mod probe;
pub mod resolver;
