//! Shopping list aggregation for recipes a user has placed in their cart.
//!
//! The crate owns no storage. Callers hand an [`Aggregator`] something that
//! implements [`CartSource`] and get back the merged list, which an
//! [`ExportFormat`] turns into a plain-text download.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod line;
pub mod source;

pub use aggregate::{merge_lines, Aggregator, DEFAULT_EMPTY_CART_NOTICE};
pub use error::ShoppingListError;
pub use export::{ExportFormat, Separator, ShoppingListExport, DEFAULT_FILENAME};
pub use line::{AggregatedLine, IngredientKey, IngredientLine, ShoppingListLine};
pub use source::{CartSource, SourceError};
