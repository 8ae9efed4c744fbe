/// Snapshot module
///
/// - `codec.rs` writes a reconciliation pass to CSV and replays it as updates
/// - `analysis.rs` summarizes an existing snapshot file
pub mod analysis;
pub mod codec;
