//! Output sinks.
//!
//! - [`html`]: the ESPI/EBI report, overwritten every run
//! - [`json`]: optional JSON copy of the same report data
//! - [`csv_store`]: append-only article archive for the crawler
//!
//! ```text
//! raport_gieldowy.html   # `report`, also mailed
//! index.html             # `page`
//! artykuly.csv           # `crawl`, grows every run
//! ```

pub mod csv_store;
pub mod html;
pub mod json;
