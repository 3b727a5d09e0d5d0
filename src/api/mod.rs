pub mod client;
pub mod transport;
pub mod types;

pub use client::{CatalogApi, RebrickableClient};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use types::{ApiSet, ApiTheme, Page, SetQuery, ThemeQuery};
