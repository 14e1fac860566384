//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides:
//! - Dashboard with asset and explainer status
//! - Customer/context profile form
//! - Decision view with ranked attributions

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::CouponTheme;
