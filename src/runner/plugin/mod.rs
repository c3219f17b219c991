//! Built-in registry, method hooks and analysis configuration.
//!
//! Everything in this module is set up once, before any analysis run, and is
//! read-only afterwards:
//!
//! ```text
//! BuiltInRegistry
//! ├── preexisting objects   (natives, `Math`, `String`, ...; ids 0..n in every run)
//! ├── global symbols        (name → value, seeded into the global scope)
//! ├── method-hook chain     (receiver category + name → native)
//! └── operator handlers     (unary, binary, update; first answer wins)
//! ```
//!
//! ### Key Components
//!
//! - **[`MethodHookResolver`]**: Trait supplying built-in methods for a receiver category
//! - **[`MethodHookChain`]**: Ordered resolvers with a lookup cache
//! - **[`CoreMethodHook`]**: Table-driven resolver used by the core built-ins
//! - **[`EvalContext`](types::EvalContext)**: State of one analysis run, passed to every built-in
//!
//! ### Method Hooks
//!
//! A property read that misses on the receiver asks the chain. The first
//! resolver that knows the name for the receiver's category returns the
//! shared native, so `a.push === b.push` holds for any two arrays.
//!
//! ## Example: Custom Hook
//!
//! ```
//! use jsai::runner::plugin::resolver::{MethodHookResolver, ReceiverCategory};
//! use jsai::runner::ds::value::ObjectId;
//!
//! struct ReverseHook(ObjectId);
//!
//! impl MethodHookResolver for ReverseHook {
//!     fn categories(&self) -> &[ReceiverCategory] {
//!         &[ReceiverCategory::String]
//!     }
//!
//!     fn has_method(&self, name: &str) -> bool {
//!         name == "reverse"
//!     }
//!
//!     fn resolve(&self, _name: &str) -> Option<ObjectId> {
//!         Some(self.0)
//!     }
//!
//!     fn name(&self) -> &str { "reverse_hook" }
//! }
//! ```

pub mod config;
pub mod core_resolver;
pub mod registry;
pub mod resolver;
pub mod super_global;
pub mod types;

pub use config::AnalysisConfig;
pub use core_resolver::CoreMethodHook;
pub use registry::BuiltInRegistry;
pub use resolver::{MethodHookResolver, ReceiverCategory};
pub use super_global::MethodHookChain;
pub use types::{BuiltInFn, BuiltInObject, CallSite, EvalContext, NativeFn, Runtime};
