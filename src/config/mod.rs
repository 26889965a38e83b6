//! Layered configuration binding.
//!
//! A load runs these stages in order:
//! 1. **Environment** - explicit name, `CONFIGBIND_ENV`, test-run detection, or `development`
//! 2. **Files** - each requested file, then its `<stem>.<environment>.<ext>` override
//! 3. **Decode** - YAML (`.yaml`, `.yml`) or JSON (`.json`) into a [`ValueTree`]
//! 4. **Merge** - deep merge, later files win per leaf, mappings are unioned
//! 5. **Bind** - walk the target [`Shape`] resolving each field from
//!    environment variable > file value > default > zero value
//!
//! ## Environment Variables
//! - `CONFIGBIND_ENV` - Active environment name
//! - `CONFIGBIND_ENV_PREFIX` - Prefix for per-field overrides (default: `CONFIGBIND`, `-` disables)
//! - `CONFIGBIND_DEBUG_MODE` - Log loaded files and the final configuration
//! - `CONFIGBIND_VERBOSE_MODE` - Also log where every field came from
//! - `<PREFIX>_<PATH>_<FIELD>` - Per-field override, e.g. `CONFIGBIND_DB_PORT`

mod binder;
mod environment;
mod files;
mod format;
mod loader;
mod merge;
mod persist;
mod shape;
mod value;
mod vars;

pub use binder::{BindContext, Bound, EnvPrefix, Origin, bind, bind_into, env_var_name};
pub use environment::{Environment, classify_environment, is_test_harness};
pub use files::{EXAMPLE_QUALIFIER, FileResolver, FileSource, ResolvedFile, qualified_path, resolve_files};
pub use format::{Format, decode, decode_file};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX, Loaded, LoaderOptions, MergedSources};
pub use merge::{deep_merge, merge};
pub use persist::{persist, save};
pub use shape::{Configurable, Field, FieldKind, ScalarKind, Shape};
pub use value::{Scalar, ValueTree};
pub use vars::{DEBUG_MODE_VAR, ENV_PREFIX_VAR, ENV_VAR, EnvSnapshot, VERBOSE_MODE_VAR};
