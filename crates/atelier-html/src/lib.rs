//! HTML model and page normalizer for the Atelier editor.
//!
//! Raw markup coming back from a generator (or from the sandbox) is parsed
//! with `scraper`, rearranged on an owned `ego_tree` document and written
//! back in a canonical form. The canonical form is a fixed point:
//! normalizing a normalized page returns it unchanged.

pub mod defaults;
pub mod dom;
pub mod isolate;
pub mod normalize;

pub use dom::{Document, DomNode, ElementData};
pub use ego_tree::NodeId;
pub use isolate::isolate_markup;
pub use normalize::{
    Fallback, NormalizeOptions, Normalized, Normalizer, normalize_page, page_display_name,
    page_title,
};
