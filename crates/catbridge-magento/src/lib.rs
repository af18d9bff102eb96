pub mod client;
pub mod error;
pub mod export_file;
pub mod page;
pub mod retry;
pub mod types;

pub use client::MagentoClient;
pub use error::SourceError;
pub use export_file::read_export_file;
pub use page::PageBody;
pub use types::{
    AttributeOption, CategoryLink, CustomAttribute, MagentoAttribute, MagentoCategory,
    MagentoProduct, ProductExtension,
};

/// Hard ceiling on pages pulled from one paginated listing.
pub const MAX_PAGES: u32 = 10_000;
