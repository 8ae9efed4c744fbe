/// Reconciliation module
///
/// - `engine.rs` joins catalog records with probed files and derives updates
/// - `validity.rs` bounds which corrected timestamps may be written
pub mod engine;
pub mod validity;
