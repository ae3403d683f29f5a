mod atomic_io;
mod compiler;
mod database;
mod hashing;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use compiler::{
    compile_thing_defs, compile_thing_defs_file, DefCompileError, DefErrorCode, SourceLocation,
};
pub use database::{DefDatabase, ThingDef, ThingDefId, ThingDefKind};
pub use hashing::{sha256_hex, sha256_hex_parts};
