//! Preview image selection and download.

pub mod downloader;
pub mod selector;

pub use downloader::{image_file_name, ImageDownloader};
pub use selector::{probe_size, select_images};
