//! # Brewsync Engine
//!
//! Normalizes BeerSmith recipe exports into flat documents and keeps a
//! document store in step with the application's change archive.
//!
//! ## Design Principles
//!
//! - **No IO**: files arrive through [`ExportSource`], documents leave
//!   through [`DocumentStore`], progress is kept by [`CursorStore`]
//! - **Keep going**: unreadable files, prose notes and unknown codes
//!   degrade to empty or partial results and are logged
//! - **Sequential**: one pass, one writer, entries in file order
//!
//! ## Core Concepts
//!
//! ### Normalization
//!
//! An export is parsed into an untyped tree ([`xml`]), its single-vs-many
//! sibling ambiguity is resolved by [`Siblings`], and each recipe is turned
//! into a [`Recipe`] document: section prefixes stripped, ingredients
//! classified and ordered, scalars promoted to numbers and structured notes
//! merged on top. Folders nest; [`Folder`] flattens them depth first.
//!
//! ### Replay
//!
//! The archive is a log of [`ArchiveEntry`] changes. [`Replayer`] applies
//! the ones inside a [`ReplayWindow`] and advances the cursor after each.
//! Renames and pastes cannot be replayed safely; they stop replay and ask
//! for a rebuild instead.
//!
//! ### Sync
//!
//! [`Synchronizer::pull`] replays the archive from the cursor,
//! [`Synchronizer::rebuild`] reloads everything from the full export, and
//! [`Synchronizer::sync`] picks between them.
//!
//! ## Quick Start
//!
//! ```rust
//! use brewsync_engine::{
//!     MemoryCursor, MemorySource, MemoryStore, SyncOptions, Synchronizer,
//! };
//! use chrono::Utc;
//!
//! let export = "<Selections><Name>Recipes</Name><Data>\
//!     <Recipe><F_R_NAME>Red Ale</F_R_NAME><F_R_BOIL_TIME>60.0</F_R_BOIL_TIME></Recipe>\
//!     </Data></Selections>";
//! let source = MemorySource::new().with_file("Recipe.bsmx", export);
//!
//! let mut sync = Synchronizer::new(
//!     MemoryStore::new(),
//!     MemoryCursor::new(),
//!     source,
//!     SyncOptions::default(),
//! );
//! let report = sync.rebuild(Utc::now()).unwrap();
//! assert_eq!(report.stored, 1);
//!
//! let stored = sync.store().get("Red Ale").unwrap();
//! assert_eq!(stored["boil_time"], 60);
//! assert_eq!(stored["folder_name"], "/Recipes/");
//! ```
//!
//! ## Persistence
//!
//! Use [`MemoryStore::export_state`] and [`MemoryStore::import_state`] with
//! [`StoreSnapshot`] to persist documents. Snapshots serialize to JSON in a
//! deterministic order.

pub mod archive;
pub mod coerce;
pub mod error;
pub mod export;
pub mod folder;
pub mod ingredient;
pub mod node;
pub mod notes;
pub mod prefix;
pub mod recipe;
pub mod replay;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod xml;

// Re-export main types at crate root
pub use archive::{parse_timestamp, ArchiveAction, ArchiveEntry};
pub use error::Error;
pub use export::{parse_export, Export, ExportKind, ExportReader, ExportSource, MemorySource};
pub use folder::{ExportNode, Folder};
pub use ingredient::{display_amount, Ingredient, IngredientType, Ingredients};
pub use node::Siblings;
pub use notes::Notes;
pub use recipe::Recipe;
pub use replay::{RebuildReason, ReplayOutcome, ReplayStatus, ReplayWindow, Replayer};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{CursorStore, Document, DocumentStore, MemoryCursor, MemoryStore, SyncCursor};
pub use sync::{
    PullReport, RebuildFlagPolicy, RebuildReport, SyncOptions, SyncReport, Synchronizer,
    WindowOverrides,
};

/// Type aliases for clarity
pub type RecipeId = String;
pub type Timestamp = chrono::DateTime<chrono::Utc>;
