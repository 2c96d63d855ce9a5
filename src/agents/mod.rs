//! Planning Pipeline
//!
//! Turns a batch of uploads into a migration plan for one session:
//!
//! ```text
//! Uploaded files
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Extractor  │  → Normalized text per file (failures stay per-item)
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Prompts   │  → Combined payload + context + target clouds
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Completion  │  → Plan text, recorded in the session
//! └─────────────┘
//!      │
//!      ▼
//!  PDF export
//! ```

pub mod planning;
pub mod prompts;

pub use planning::{Capabilities, Generation, MigrationPlanner, PlanInput};
