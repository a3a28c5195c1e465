//! SVG rendering of decision trees with an optional highlighted decision path.

mod error;
mod highlight;
mod layout;
mod svg;

use base64::Engine;

pub use error::RenderError;
pub use highlight::{Highlight, LEAF_FILL, PATH_FILL};
pub use svg::{RenderOptions, TreeRenderer};

/// Prefix of every data URI produced by [`to_data_uri`].
pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Wrap an SVG document as a base64 `data:` URI.
#[must_use]
pub fn to_data_uri(svg: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    format!("{SVG_DATA_URI_PREFIX}{encoded}")
}
