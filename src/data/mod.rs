/// Data layer: vector records, parsing, loading and writing.
///
/// Architecture:
/// ```text
///  .txt / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read file, parse lines on the session pool
///   └──────────┘
///        │  parser: "1 2.5 3" → Record { features }
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Arrow batch, one `features` List<Float64> column
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  text / parquet output
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod parser;
pub mod writer;
