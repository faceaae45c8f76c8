//! Static registry of the block kinds available in the palette.

use stagecraft_types::{BlockConfig, BlockKind};

/// Display metadata for one block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: BlockKind,
    pub name: &'static str,
    /// Accent color as a CSS hex string.
    pub color: &'static str,
    /// Icon identifier (lucide icon name).
    pub icon: &'static str,
}

impl CatalogEntry {
    /// Fresh copy of the default configuration for this kind.
    pub fn default_config(&self) -> BlockConfig {
        BlockConfig::default_for(self.kind)
    }
}

const CATALOG: [CatalogEntry; 6] = [
    CatalogEntry {
        kind: BlockKind::Source,
        name: "Source Control",
        color: "#3B82F6",
        icon: "git-branch",
    },
    CatalogEntry {
        kind: BlockKind::Build,
        name: "Build",
        color: "#10B981",
        icon: "settings",
    },
    CatalogEntry {
        kind: BlockKind::Test,
        name: "Test",
        color: "#F59E0B",
        icon: "check-circle",
    },
    CatalogEntry {
        kind: BlockKind::Deploy,
        name: "Deploy",
        color: "#8B5CF6",
        icon: "cloud",
    },
    CatalogEntry {
        kind: BlockKind::Database,
        name: "Database Migration",
        color: "#6366F1",
        icon: "database",
    },
    CatalogEntry {
        kind: BlockKind::Monitoring,
        name: "Monitoring",
        color: "#EF4444",
        icon: "monitor",
    },
];

/// All catalog entries in palette order.
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Look up the entry for a kind. Total over [`BlockKind`].
pub fn entry(kind: BlockKind) -> &'static CatalogEntry {
    match kind {
        BlockKind::Source => &CATALOG[0],
        BlockKind::Build => &CATALOG[1],
        BlockKind::Test => &CATALOG[2],
        BlockKind::Deploy => &CATALOG[3],
        BlockKind::Database => &CATALOG[4],
        BlockKind::Monitoring => &CATALOG[5],
    }
}
