/// Writer module
///
/// - `copy.rs` duplicates the source catalog (backup tool, then raw copy)
/// - `apply.rs` writes corrected timestamps into that duplicate
pub mod apply;
pub mod copy;
