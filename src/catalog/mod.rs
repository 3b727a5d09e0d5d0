//! Repositories that keep the local catalog in sync with the remote service.

#[cfg(test)]
mod fake;
mod observe;
mod sets;
mod themes;
mod types;

pub use sets::SetRepository;
pub use themes::ThemeRepository;
pub use types::{SetEntity, ThemeEntity};
