//! Catalog and image storage for Razai Tools.
//!
//! Two traits define the storage boundary:
//!
//! - [`CatalogStore`]: tissues, colors, patterns, both link kinds, settings.
//! - [`ImageStore`]: content-addressed image blobs referenced by links.
//!
//! In-memory backends serve tests and embedding. [`JsonFileCatalogStore`]
//! and [`DirImageStore`] persist to the filesystem.

pub mod error;
pub mod file;
pub mod image;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileCatalogStore;
pub use image::{
    decode_data_url, encode_data_url, DirImageStore, ImageBlob, InMemoryImageStore, StoredImage,
    PATH_PREFIX,
};
pub use memory::{CatalogState, InMemoryCatalogStore};
pub use traits::{CatalogStore, ImageStore};
