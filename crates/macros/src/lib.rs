//! Macro rendering of outfit state into arbitrary text.
//!
//! A macro token is `{{<type>_<slot>}}`. The type is `char`/`bot` (the
//! active persona), `user`, or any character name known to the host:
//!
//! ```text
//! "{{char}} wears {{char_topwear}}"        → "{{char}} wears linen shirt"
//! "{{Captain_Jack_headwear}}"              → value for character "Captain Jack"
//! ```
//!
//! Tokens with no slot suffix (`{{char}}`) belong to the host and are left
//! alone. Resolved values are cached for a few minutes; any store mutation
//! clears the cache once the resolver is [attached](MacroResolver::attach).

pub mod cache;
pub mod resolver;

pub use cache::TtlCache;
pub use resolver::{MacroResolver, DEFAULT_CACHE_TTL};
