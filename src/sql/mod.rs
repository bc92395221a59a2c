//! SQL dialects, type mapping and DDL export.

mod dialect;
mod exporter;
mod types;

pub use dialect::Dialect;
pub use exporter::{export_schema, format_default, SqlExporter};
pub(crate) use exporter::{is_expression_default, parse_bool, strip_quotes};
pub use types::{AbstractType, TypeMapper, TypeMapping, ValueKind};
