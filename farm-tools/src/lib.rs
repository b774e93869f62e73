//! Tool-kind plugins for the farmtools batch engine
//!
//! One module per supported external tool. Each module implements the
//! engine's [`ToolKind`] capability bundle: configuration field order,
//! command lines, expected per-shard outputs, merge strategy and
//! artifact tags. The registry maps job-kind names to plugins so the
//! pipeline engine can resolve a kind by the name it tracks.
//!
//! [`ToolKind`]: farm_batch::ToolKind

pub mod augustus;
pub mod blast;
pub mod exonerate;
pub mod hmmscan;
pub mod repeatmasker;
pub mod trnascan;

pub use augustus::Augustus;
pub use blast::Blast;
pub use exonerate::Exonerate;
pub use hmmscan::Hmmscan;
pub use repeatmasker::RepeatMasker;
pub use trnascan::TrnaScan;

use hashbrown::HashMap;

use farm_batch::ToolKind;

/// all supported job kinds, keyed by name
pub fn registry() -> HashMap<&'static str, Box<dyn ToolKind>> {
    let kinds: Vec<Box<dyn ToolKind>> = vec![
        Box::new(RepeatMasker),
        Box::new(Blast),
        Box::new(Augustus),
        Box::new(TrnaScan),
        Box::new(Exonerate),
        Box::new(Hmmscan),
    ];

    kinds.into_iter().map(|kind| (kind.name(), kind)).collect()
}

/// resolve one job kind by name
pub fn get_kind(name: &str) -> Option<Box<dyn ToolKind>> {
    registry().remove(name)
}
