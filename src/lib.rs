//! # amlparse
//!
//! Parser and namespace builder for ACPI Machine Language (AML) bytecode as
//! found in firmware DSDT/SSDT tables.
//!
//! The parser decodes a table's byte stream into a tree of entities (scopes,
//! devices, methods, operation regions, fields, ...) rooted in a shared
//! [`Namespace`]. Names may be used before they are defined; a second pass
//! binds those references once the whole stream has been decoded. Multiple
//! tables can be parsed into the same namespace, each one adding to or
//! re-entering the scopes of the previous ones.
//!
//! ```no_run
//! use amlparse::{parse_aml_table, Namespace, Sdt};
//!
//! # fn load_dsdt() -> std::sync::Arc<[u8]> { unimplemented!() }
//! let dsdt = Sdt::new(load_dsdt()).expect("invalid DSDT");
//! let mut namespace = Namespace::new();
//! let mut diagnostics = Vec::new();
//! parse_aml_table(&mut namespace, &mut diagnostics, &dsdt)?;
//! # Ok::<(), amlparse::AmlError>(())
//! ```

use std::io::Write;

use thiserror::Error;

pub mod entity;
pub mod namespace;
pub mod opcode;
pub mod parser;
pub mod sdt;
pub mod stream;

pub use crate::entity::{Arg, ConstValue, Entity, EntityId, EntityKind};
pub use crate::namespace::Namespace;
pub use crate::opcode::Opcode;
pub use crate::parser::Parser;
pub use crate::sdt::{InvalidSdtError, Sdt, SdtHeader};

/// The two failure categories of the parser. The specific causes are
/// reported to the diagnostic sink before either of these is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmlError {
    /// Malformed bytecode: unknown opcode, undefined scope target, argument
    /// count mismatch, PkgLength/offset disagreement, and the like.
    #[error("could not parse AML bytecode")]
    Parse,

    /// The decoded tree contains names or references that do not bind.
    #[error("AML bytecode contains unresolvable entities")]
    Resolve,
}

/// Parses the AML bytecode of `table` into `namespace`. Diagnostics for any
/// failure go to `sink`; on error the namespace should be discarded, as it
/// may hold a partially built tree.
pub fn parse_aml_table(
    namespace: &mut Namespace,
    sink: &mut dyn Write,
    table: &Sdt,
) -> Result<(), AmlError> {
    let name = table.name();
    let parser = Parser::new(namespace, sink, &name, table.as_slice());
    match parser.parse() {
        Ok(()) => {
            log::debug!("table {} parsed successfully", name);
            Ok(())
        }
        Err(error) => {
            log::error!("table {}: {}", name, error);
            Err(error)
        }
    }
}
