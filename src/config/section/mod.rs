//! Configuration section definitions.
//!
//! Each module corresponds to a section in `quire.toml`:
//!
//! | Module    | TOML Section | Purpose                             |
//! |-----------|--------------|-------------------------------------|
//! | `watch`   | `[watch]`    | Recompile-on-edit and its debounce  |
//! | `fonts`   | `[fonts]`    | Extra font directories              |
//! | `preview` | `[preview]`  | Cached thumbnail settings           |

mod fonts;
mod preview;
mod watch;

pub use fonts::FontsConfig;
pub use preview::PreviewConfig;
pub use watch::WatchConfig;
