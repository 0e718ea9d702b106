//! Configuration section definitions.
//!
//! Each module corresponds to a section in `assetline.toml`:
//!
//! | Module     | TOML Section         | Purpose                                |
//! |------------|----------------------|----------------------------------------|
//! | `site`     | `[site]`             | Host paths and entry filtering         |
//! | `pipeline` | `[asset_pipeline]`   | Asset paths, cache, converters         |

mod pipeline;
mod site;

pub(crate) use pipeline::EXAMPLE;
pub use pipeline::{ConverterEntry, ErrorLogConfig, MinifyConfig, PipelineSectionConfig};
pub use site::SiteSectionConfig;
