/// Data layer: core types, loading, and label normalisation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  split fields, trim, null tokens, drop blank rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  label    │  find the label column → `class`, values → pos / neg
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  ordered records, class distribution → export (CSV upload)
///   └──────────┘
/// ```

pub mod export;
pub mod ingest;
pub mod label;
pub mod loader;
pub mod model;
