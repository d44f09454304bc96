pub mod env;
pub mod panel;

pub use env::EnvConfig;
pub use panel::PanelConfig;
