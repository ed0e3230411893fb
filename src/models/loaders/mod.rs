pub mod scheme_loader;

pub use scheme_loader::{load_scheme, parse_scheme, SchemeFormat};
