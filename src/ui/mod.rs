//! UI components

mod console;
mod gallery;

pub use console::ConsoleUi;
pub use gallery::render as render_gallery;

#[cfg(test)]
pub(crate) use console::testing;
