//! Plugins shipped with the framework.
//!
//! Enabled with the `builtin` feature. Register them like any other plugin:
//!
//! ```rust
//! use tanuki_framework::PluginRegistry;
//! use tanuki_framework::builtin::PingPlugin;
//!
//! let mut registry = PluginRegistry::new();
//! registry.register(PingPlugin::new());
//! assert!(registry.resolve("p").is_some());
//! ```

mod ping;

pub use ping::PingPlugin;
