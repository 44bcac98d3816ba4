//! Static AML opcode descriptors.
//!
//! Single-byte opcodes occupy `0x00..=0xff`; two-byte opcodes start with the
//! `0x5b` extension prefix and are folded into the same 16-bit space as
//! `0x5b00 | second_byte`. Each known opcode carries the flag set, the
//! positional argument descriptors and the object-type class that drive the
//! recursive-descent parser.

use std::fmt;

use bitflags::bitflags;

/// Prefix byte introducing a two-byte opcode.
pub const EXT_OP_PREFIX: u8 = 0x5b;

/// A (possibly extended) AML opcode in the folded 16-bit space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Opcode(pub u16);

impl Opcode {
    pub const ZERO: Opcode = Opcode(0x00);
    pub const ONE: Opcode = Opcode(0x01);
    pub const ALIAS: Opcode = Opcode(0x06);
    pub const NAME: Opcode = Opcode(0x08);
    pub const BYTE_PREFIX: Opcode = Opcode(0x0a);
    pub const WORD_PREFIX: Opcode = Opcode(0x0b);
    pub const DWORD_PREFIX: Opcode = Opcode(0x0c);
    pub const STRING_PREFIX: Opcode = Opcode(0x0d);
    pub const QWORD_PREFIX: Opcode = Opcode(0x0e);
    pub const SCOPE: Opcode = Opcode(0x10);
    pub const BUFFER: Opcode = Opcode(0x11);
    pub const PACKAGE: Opcode = Opcode(0x12);
    pub const VAR_PACKAGE: Opcode = Opcode(0x13);
    pub const METHOD: Opcode = Opcode(0x14);
    pub const EXTERNAL: Opcode = Opcode(0x15);
    pub const LOCAL0: Opcode = Opcode(0x60);
    pub const LOCAL1: Opcode = Opcode(0x61);
    pub const LOCAL2: Opcode = Opcode(0x62);
    pub const LOCAL3: Opcode = Opcode(0x63);
    pub const LOCAL4: Opcode = Opcode(0x64);
    pub const LOCAL5: Opcode = Opcode(0x65);
    pub const LOCAL6: Opcode = Opcode(0x66);
    pub const LOCAL7: Opcode = Opcode(0x67);
    pub const ARG0: Opcode = Opcode(0x68);
    pub const ARG1: Opcode = Opcode(0x69);
    pub const ARG2: Opcode = Opcode(0x6a);
    pub const ARG3: Opcode = Opcode(0x6b);
    pub const ARG4: Opcode = Opcode(0x6c);
    pub const ARG5: Opcode = Opcode(0x6d);
    pub const ARG6: Opcode = Opcode(0x6e);
    pub const STORE: Opcode = Opcode(0x70);
    pub const REF_OF: Opcode = Opcode(0x71);
    pub const ADD: Opcode = Opcode(0x72);
    pub const CONCAT: Opcode = Opcode(0x73);
    pub const SUBTRACT: Opcode = Opcode(0x74);
    pub const INCREMENT: Opcode = Opcode(0x75);
    pub const DECREMENT: Opcode = Opcode(0x76);
    pub const MULTIPLY: Opcode = Opcode(0x77);
    pub const DIVIDE: Opcode = Opcode(0x78);
    pub const SHIFT_LEFT: Opcode = Opcode(0x79);
    pub const SHIFT_RIGHT: Opcode = Opcode(0x7a);
    pub const AND: Opcode = Opcode(0x7b);
    pub const NAND: Opcode = Opcode(0x7c);
    pub const OR: Opcode = Opcode(0x7d);
    pub const NOR: Opcode = Opcode(0x7e);
    pub const XOR: Opcode = Opcode(0x7f);
    pub const NOT: Opcode = Opcode(0x80);
    pub const FIND_SET_LEFT_BIT: Opcode = Opcode(0x81);
    pub const FIND_SET_RIGHT_BIT: Opcode = Opcode(0x82);
    pub const DEREF_OF: Opcode = Opcode(0x83);
    pub const CONCAT_RES: Opcode = Opcode(0x84);
    pub const MOD: Opcode = Opcode(0x85);
    pub const NOTIFY: Opcode = Opcode(0x86);
    pub const SIZE_OF: Opcode = Opcode(0x87);
    pub const INDEX: Opcode = Opcode(0x88);
    pub const MATCH: Opcode = Opcode(0x89);
    pub const CREATE_DWORD_FIELD: Opcode = Opcode(0x8a);
    pub const CREATE_WORD_FIELD: Opcode = Opcode(0x8b);
    pub const CREATE_BYTE_FIELD: Opcode = Opcode(0x8c);
    pub const CREATE_BIT_FIELD: Opcode = Opcode(0x8d);
    pub const OBJECT_TYPE: Opcode = Opcode(0x8e);
    pub const CREATE_QWORD_FIELD: Opcode = Opcode(0x8f);
    pub const LAND: Opcode = Opcode(0x90);
    pub const LOR: Opcode = Opcode(0x91);
    pub const LNOT: Opcode = Opcode(0x92);
    pub const LEQUAL: Opcode = Opcode(0x93);
    pub const LGREATER: Opcode = Opcode(0x94);
    pub const LLESS: Opcode = Opcode(0x95);
    pub const TO_BUFFER: Opcode = Opcode(0x96);
    pub const TO_DECIMAL_STRING: Opcode = Opcode(0x97);
    pub const TO_HEX_STRING: Opcode = Opcode(0x98);
    pub const TO_INTEGER: Opcode = Opcode(0x99);
    pub const TO_STRING: Opcode = Opcode(0x9c);
    pub const COPY_OBJECT: Opcode = Opcode(0x9d);
    pub const MID: Opcode = Opcode(0x9e);
    pub const CONTINUE: Opcode = Opcode(0x9f);
    pub const IF: Opcode = Opcode(0xa0);
    pub const ELSE: Opcode = Opcode(0xa1);
    pub const WHILE: Opcode = Opcode(0xa2);
    pub const NOOP: Opcode = Opcode(0xa3);
    pub const RETURN: Opcode = Opcode(0xa4);
    pub const BREAK: Opcode = Opcode(0xa5);
    pub const BREAK_POINT: Opcode = Opcode(0xcc);
    pub const ONES: Opcode = Opcode(0xff);

    pub const MUTEX: Opcode = Opcode::extended(0x01);
    pub const EVENT: Opcode = Opcode::extended(0x02);
    pub const COND_REF_OF: Opcode = Opcode::extended(0x12);
    pub const CREATE_FIELD: Opcode = Opcode::extended(0x13);
    pub const LOAD_TABLE: Opcode = Opcode::extended(0x1f);
    pub const LOAD: Opcode = Opcode::extended(0x20);
    pub const STALL: Opcode = Opcode::extended(0x21);
    pub const SLEEP: Opcode = Opcode::extended(0x22);
    pub const ACQUIRE: Opcode = Opcode::extended(0x23);
    pub const SIGNAL: Opcode = Opcode::extended(0x24);
    pub const WAIT: Opcode = Opcode::extended(0x25);
    pub const RESET: Opcode = Opcode::extended(0x26);
    pub const RELEASE: Opcode = Opcode::extended(0x27);
    pub const FROM_BCD: Opcode = Opcode::extended(0x28);
    pub const TO_BCD: Opcode = Opcode::extended(0x29);
    pub const UNLOAD: Opcode = Opcode::extended(0x2a);
    pub const REVISION: Opcode = Opcode::extended(0x30);
    pub const DEBUG: Opcode = Opcode::extended(0x31);
    pub const FATAL: Opcode = Opcode::extended(0x32);
    pub const TIMER: Opcode = Opcode::extended(0x33);
    pub const OP_REGION: Opcode = Opcode::extended(0x80);
    pub const FIELD: Opcode = Opcode::extended(0x81);
    pub const DEVICE: Opcode = Opcode::extended(0x82);
    pub const PROCESSOR: Opcode = Opcode::extended(0x83);
    pub const POWER_RES: Opcode = Opcode::extended(0x84);
    pub const THERMAL_ZONE: Opcode = Opcode::extended(0x85);
    pub const INDEX_FIELD: Opcode = Opcode::extended(0x86);
    pub const BANK_FIELD: Opcode = Opcode::extended(0x87);
    pub const DATA_REGION: Opcode = Opcode::extended(0x88);

    /// Folds the second byte of a `0x5b`-prefixed opcode into opcode space.
    pub const fn extended(second: u8) -> Opcode {
        Opcode((EXT_OP_PREFIX as u16) << 8 | second as u16)
    }

    /// `Local0..Local7`.
    pub fn is_local_arg(self) -> bool {
        self >= Opcode::LOCAL0 && self <= Opcode::LOCAL7
    }

    /// `Arg0..Arg6`.
    pub fn is_arg(self) -> bool {
        self >= Opcode::ARG0 && self <= Opcode::ARG6
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Opcode::ADD
                | Opcode::SUBTRACT
                | Opcode::MULTIPLY
                | Opcode::DIVIDE
                | Opcode::MOD
                | Opcode::INCREMENT
                | Opcode::DECREMENT
                | Opcode::SHIFT_LEFT
                | Opcode::SHIFT_RIGHT
                | Opcode::AND
                | Opcode::OR
                | Opcode::NAND
                | Opcode::NOR
                | Opcode::XOR
                | Opcode::NOT
                | Opcode::FIND_SET_LEFT_BIT
                | Opcode::FIND_SET_RIGHT_BIT
        )
    }

    pub fn is_logic(self) -> bool {
        matches!(
            self,
            Opcode::LAND
                | Opcode::LOR
                | Opcode::LNOT
                | Opcode::LEQUAL
                | Opcode::LGREATER
                | Opcode::LLESS
        )
    }

    /// ComputationalData, DefPackage or DefVarPackage per the AML grammar.
    pub fn is_data_object(self) -> bool {
        matches!(
            self,
            Opcode::ZERO
                | Opcode::ONE
                | Opcode::ONES
                | Opcode::REVISION
                | Opcode::BYTE_PREFIX
                | Opcode::WORD_PREFIX
                | Opcode::DWORD_PREFIX
                | Opcode::QWORD_PREFIX
                | Opcode::STRING_PREFIX
                | Opcode::BUFFER
                | Opcode::PACKAGE
                | Opcode::VAR_PACKAGE
        )
    }

    /// Type2Opcode: an expression opcode that evaluates to a value.
    pub fn is_type2(self) -> bool {
        matches!(
            self,
            Opcode::ACQUIRE
                | Opcode::ADD
                | Opcode::AND
                | Opcode::BUFFER
                | Opcode::CONCAT
                | Opcode::CONCAT_RES
                | Opcode::COND_REF_OF
                | Opcode::COPY_OBJECT
                | Opcode::DECREMENT
                | Opcode::DEREF_OF
                | Opcode::DIVIDE
                | Opcode::FIND_SET_LEFT_BIT
                | Opcode::FIND_SET_RIGHT_BIT
                | Opcode::FROM_BCD
                | Opcode::INCREMENT
                | Opcode::INDEX
                | Opcode::LAND
                | Opcode::LEQUAL
                | Opcode::LGREATER
                | Opcode::LLESS
                | Opcode::LNOT
                | Opcode::LOAD_TABLE
                | Opcode::LOR
                | Opcode::MATCH
                | Opcode::MID
                | Opcode::MOD
                | Opcode::MULTIPLY
                | Opcode::NAND
                | Opcode::NOR
                | Opcode::NOT
                | Opcode::OBJECT_TYPE
                | Opcode::OR
                | Opcode::PACKAGE
                | Opcode::VAR_PACKAGE
                | Opcode::REF_OF
                | Opcode::SHIFT_LEFT
                | Opcode::SHIFT_RIGHT
                | Opcode::SIZE_OF
                | Opcode::STORE
                | Opcode::SUBTRACT
                | Opcode::TIMER
                | Opcode::TO_BCD
                | Opcode::TO_BUFFER
                | Opcode::TO_DECIMAL_STRING
                | Opcode::TO_HEX_STRING
                | Opcode::TO_INTEGER
                | Opcode::TO_STRING
                | Opcode::WAIT
                | Opcode::XOR
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match lookup(*self) {
            Some(info) => f.write_str(info.name),
            None => f.write_str("unknown"),
        }
    }
}

bitflags! {
    /// Parser-relevant opcode properties.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct OpFlags: u16 {
        /// The opcode body is bounded by a PkgLength prefix.
        const HAS_PKGLEN = 1 << 0;
        /// Creates a named entity; arg 0 is the name.
        const NAMED = 1 << 1;
        /// Evaluates to a constant value.
        const CONSTANT = 1 << 2;
        /// Produces an object reference.
        const REFERENCE = 1 << 3;
        const ARITHMETIC = 1 << 4;
        const LOGIC = 1 << 5;
        /// Carves a new field out of an existing buffer.
        const CREATE = 1 << 6;
        /// Opens a scope that owns the entities parsed inside it.
        const SCOPED = 1 << 7;
    }
}

/// Positional argument kinds an opcode can declare.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgKind {
    TermList,
    TermObj,
    ByteList,
    Package,
    String,
    ByteData,
    Word,
    Dword,
    Qword,
    NameString,
    SuperName,
    SimpleName,
    DataRefObj,
    Target,
    FieldList,
}

/// Object-type class of the entity an opcode produces.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjType {
    Any,
    LocalScope,
    BufferField,
}

pub struct OpcodeInfo {
    pub op: Opcode,
    pub name: &'static str,
    pub flags: OpFlags,
    pub args: &'static [ArgKind],
    pub obj_type: ObjType,
}

impl OpcodeInfo {
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<ArgKind> {
        self.args.get(index).copied()
    }

    /// CreateField and the fixed-width CreateXxxField opcodes.
    pub fn is_buffer_field(&self) -> bool {
        self.obj_type == ObjType::BufferField
    }

    pub fn is_type2(&self) -> bool {
        self.op.is_type2()
    }
}

const fn info(
    op: Opcode,
    name: &'static str,
    flags: OpFlags,
    args: &'static [ArgKind],
    obj_type: ObjType,
) -> OpcodeInfo {
    OpcodeInfo {
        op,
        name,
        flags,
        args,
        obj_type,
    }
}

const NONE: OpFlags = OpFlags::empty();
const SCOPED_PKG: OpFlags = OpFlags::SCOPED.union(OpFlags::HAS_PKGLEN);
const NAMED_SCOPE: OpFlags = SCOPED_PKG.union(OpFlags::NAMED);
const CREATE_NAMED: OpFlags = OpFlags::CREATE.union(OpFlags::NAMED);

use self::ArgKind::{
    ByteData, ByteList, DataRefObj, Dword, FieldList, NameString, Qword, SimpleName, String,
    SuperName, Target, TermList, TermObj, Word,
};
use self::ObjType::{Any, BufferField, LocalScope};

/// Descriptor table, sorted by opcode value for binary search.
pub static OPCODE_TABLE: &[OpcodeInfo] = &[
    info(Opcode::ZERO, "Zero", OpFlags::CONSTANT, &[], Any),
    info(Opcode::ONE, "One", OpFlags::CONSTANT, &[], Any),
    info(Opcode::ALIAS, "Alias", OpFlags::NAMED, &[NameString, NameString], Any),
    info(Opcode::NAME, "Name", OpFlags::NAMED, &[NameString, DataRefObj], Any),
    info(Opcode::BYTE_PREFIX, "Byte", OpFlags::CONSTANT, &[ByteData], Any),
    info(Opcode::WORD_PREFIX, "Word", OpFlags::CONSTANT, &[Word], Any),
    info(Opcode::DWORD_PREFIX, "Dword", OpFlags::CONSTANT, &[Dword], Any),
    info(Opcode::STRING_PREFIX, "String", OpFlags::CONSTANT, &[String], Any),
    info(Opcode::QWORD_PREFIX, "Qword", OpFlags::CONSTANT, &[Qword], Any),
    info(Opcode::SCOPE, "Scope", SCOPED_PKG, &[NameString, TermList], LocalScope),
    info(Opcode::BUFFER, "Buffer", OpFlags::HAS_PKGLEN, &[TermObj, ByteList], Any),
    info(Opcode::PACKAGE, "Package", OpFlags::HAS_PKGLEN, &[ByteData, TermList], Any),
    info(Opcode::VAR_PACKAGE, "VarPackage", OpFlags::HAS_PKGLEN, &[TermObj, TermList], Any),
    info(Opcode::METHOD, "Method", NAMED_SCOPE, &[NameString, ByteData, TermList], LocalScope),
    info(Opcode::EXTERNAL, "External", OpFlags::NAMED, &[NameString, ByteData, ByteData], Any),
    info(Opcode::LOCAL0, "Local0", NONE, &[], Any),
    info(Opcode::LOCAL1, "Local1", NONE, &[], Any),
    info(Opcode::LOCAL2, "Local2", NONE, &[], Any),
    info(Opcode::LOCAL3, "Local3", NONE, &[], Any),
    info(Opcode::LOCAL4, "Local4", NONE, &[], Any),
    info(Opcode::LOCAL5, "Local5", NONE, &[], Any),
    info(Opcode::LOCAL6, "Local6", NONE, &[], Any),
    info(Opcode::LOCAL7, "Local7", NONE, &[], Any),
    info(Opcode::ARG0, "Arg0", NONE, &[], Any),
    info(Opcode::ARG1, "Arg1", NONE, &[], Any),
    info(Opcode::ARG2, "Arg2", NONE, &[], Any),
    info(Opcode::ARG3, "Arg3", NONE, &[], Any),
    info(Opcode::ARG4, "Arg4", NONE, &[], Any),
    info(Opcode::ARG5, "Arg5", NONE, &[], Any),
    info(Opcode::ARG6, "Arg6", NONE, &[], Any),
    info(Opcode::STORE, "Store", NONE, &[TermObj, SuperName], Any),
    info(Opcode::REF_OF, "RefOf", OpFlags::REFERENCE, &[SuperName], Any),
    info(Opcode::ADD, "Add", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::CONCAT, "Concat", NONE, &[TermObj, TermObj, Target], Any),
    info(Opcode::SUBTRACT, "Subtract", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::INCREMENT, "Increment", OpFlags::ARITHMETIC, &[SuperName], Any),
    info(Opcode::DECREMENT, "Decrement", OpFlags::ARITHMETIC, &[SuperName], Any),
    info(Opcode::MULTIPLY, "Multiply", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::DIVIDE, "Divide", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target, Target], Any),
    info(Opcode::SHIFT_LEFT, "ShiftLeft", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::SHIFT_RIGHT, "ShiftRight", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::AND, "And", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::NAND, "Nand", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::OR, "Or", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::NOR, "Nor", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::XOR, "Xor", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::NOT, "Not", OpFlags::ARITHMETIC, &[TermObj, Target], Any),
    info(Opcode::FIND_SET_LEFT_BIT, "FindSetLeftBit", OpFlags::ARITHMETIC, &[TermObj, Target], Any),
    info(Opcode::FIND_SET_RIGHT_BIT, "FindSetRightBit", OpFlags::ARITHMETIC, &[TermObj, Target], Any),
    info(Opcode::DEREF_OF, "DerefOf", OpFlags::REFERENCE, &[TermObj], Any),
    info(Opcode::CONCAT_RES, "ConcatRes", NONE, &[TermObj, TermObj, Target], Any),
    info(Opcode::MOD, "Mod", OpFlags::ARITHMETIC, &[TermObj, TermObj, Target], Any),
    info(Opcode::NOTIFY, "Notify", NONE, &[SuperName, TermObj], Any),
    info(Opcode::SIZE_OF, "SizeOf", NONE, &[SuperName], Any),
    info(Opcode::INDEX, "Index", OpFlags::REFERENCE, &[TermObj, TermObj, Target], Any),
    info(
        Opcode::MATCH,
        "Match",
        NONE,
        &[TermObj, ByteData, TermObj, ByteData, TermObj, TermObj],
        Any,
    ),
    info(
        Opcode::CREATE_DWORD_FIELD,
        "CreateDWordField",
        CREATE_NAMED,
        &[TermObj, TermObj, NameString],
        BufferField,
    ),
    info(
        Opcode::CREATE_WORD_FIELD,
        "CreateWordField",
        CREATE_NAMED,
        &[TermObj, TermObj, NameString],
        BufferField,
    ),
    info(
        Opcode::CREATE_BYTE_FIELD,
        "CreateByteField",
        CREATE_NAMED,
        &[TermObj, TermObj, NameString],
        BufferField,
    ),
    info(
        Opcode::CREATE_BIT_FIELD,
        "CreateBitField",
        CREATE_NAMED,
        &[TermObj, TermObj, NameString],
        BufferField,
    ),
    info(Opcode::OBJECT_TYPE, "ObjectType", NONE, &[SuperName], Any),
    info(
        Opcode::CREATE_QWORD_FIELD,
        "CreateQWordField",
        CREATE_NAMED,
        &[TermObj, TermObj, NameString],
        BufferField,
    ),
    info(Opcode::LAND, "Land", OpFlags::LOGIC, &[TermObj, TermObj], Any),
    info(Opcode::LOR, "Lor", OpFlags::LOGIC, &[TermObj, TermObj], Any),
    info(Opcode::LNOT, "Lnot", OpFlags::LOGIC, &[TermObj], Any),
    info(Opcode::LEQUAL, "LEqual", OpFlags::LOGIC, &[TermObj, TermObj], Any),
    info(Opcode::LGREATER, "LGreater", OpFlags::LOGIC, &[TermObj, TermObj], Any),
    info(Opcode::LLESS, "LLess", OpFlags::LOGIC, &[TermObj, TermObj], Any),
    info(Opcode::TO_BUFFER, "ToBuffer", NONE, &[TermObj, Target], Any),
    info(Opcode::TO_DECIMAL_STRING, "ToDecimalString", NONE, &[TermObj, Target], Any),
    info(Opcode::TO_HEX_STRING, "ToHexString", NONE, &[TermObj, Target], Any),
    info(Opcode::TO_INTEGER, "ToInteger", NONE, &[TermObj, Target], Any),
    info(Opcode::TO_STRING, "ToString", NONE, &[TermObj, TermObj, Target], Any),
    info(Opcode::COPY_OBJECT, "CopyObject", NONE, &[TermObj, SimpleName], Any),
    info(Opcode::MID, "Mid", NONE, &[TermObj, TermObj, TermObj, Target], Any),
    info(Opcode::CONTINUE, "Continue", NONE, &[], Any),
    info(Opcode::IF, "If", OpFlags::HAS_PKGLEN, &[TermObj, TermList], Any),
    info(Opcode::ELSE, "Else", OpFlags::HAS_PKGLEN, &[TermList], Any),
    info(Opcode::WHILE, "While", OpFlags::HAS_PKGLEN, &[TermObj, TermList], Any),
    info(Opcode::NOOP, "Noop", NONE, &[], Any),
    info(Opcode::RETURN, "Return", NONE, &[TermObj], Any),
    info(Opcode::BREAK, "Break", NONE, &[], Any),
    info(Opcode::BREAK_POINT, "BreakPoint", NONE, &[], Any),
    info(Opcode::ONES, "Ones", OpFlags::CONSTANT, &[], Any),
    info(Opcode::MUTEX, "Mutex", OpFlags::NAMED, &[NameString, ByteData], Any),
    info(Opcode::EVENT, "Event", OpFlags::NAMED, &[NameString], Any),
    info(Opcode::COND_REF_OF, "CondRefOf", OpFlags::REFERENCE, &[SuperName, Target], Any),
    info(
        Opcode::CREATE_FIELD,
        "CreateField",
        CREATE_NAMED,
        &[TermObj, TermObj, TermObj, NameString],
        BufferField,
    ),
    info(
        Opcode::LOAD_TABLE,
        "LoadTable",
        NONE,
        &[TermObj, TermObj, TermObj, TermObj, TermObj, TermObj],
        Any,
    ),
    info(Opcode::LOAD, "Load", NONE, &[NameString, SuperName], Any),
    info(Opcode::STALL, "Stall", NONE, &[TermObj], Any),
    info(Opcode::SLEEP, "Sleep", NONE, &[TermObj], Any),
    info(Opcode::ACQUIRE, "Acquire", NONE, &[SuperName, Word], Any),
    info(Opcode::SIGNAL, "Signal", NONE, &[SuperName], Any),
    info(Opcode::WAIT, "Wait", NONE, &[SuperName, TermObj], Any),
    info(Opcode::RESET, "Reset", NONE, &[SuperName], Any),
    info(Opcode::RELEASE, "Release", NONE, &[SuperName], Any),
    info(Opcode::FROM_BCD, "FromBCD", OpFlags::ARITHMETIC, &[TermObj, Target], Any),
    info(Opcode::TO_BCD, "ToBCD", OpFlags::ARITHMETIC, &[TermObj, Target], Any),
    info(Opcode::UNLOAD, "Unload", NONE, &[SuperName], Any),
    info(Opcode::REVISION, "Revision", OpFlags::CONSTANT, &[], Any),
    info(Opcode::DEBUG, "Debug", NONE, &[], Any),
    info(Opcode::FATAL, "Fatal", NONE, &[ByteData, Dword, TermObj], Any),
    info(Opcode::TIMER, "Timer", NONE, &[], Any),
    info(
        Opcode::OP_REGION,
        "OpRegion",
        OpFlags::NAMED,
        &[NameString, ByteData, TermObj, TermObj],
        Any,
    ),
    info(Opcode::FIELD, "Field", OpFlags::HAS_PKGLEN, &[NameString, ByteData, FieldList], Any),
    info(Opcode::DEVICE, "Device", NAMED_SCOPE, &[NameString, TermList], LocalScope),
    info(
        Opcode::PROCESSOR,
        "Processor",
        NAMED_SCOPE,
        &[NameString, ByteData, Dword, ByteData, TermList],
        LocalScope,
    ),
    info(
        Opcode::POWER_RES,
        "PowerRes",
        NAMED_SCOPE,
        &[NameString, ByteData, Word, TermList],
        LocalScope,
    ),
    info(Opcode::THERMAL_ZONE, "ThermalZone", NAMED_SCOPE, &[NameString, TermList], LocalScope),
    info(
        Opcode::INDEX_FIELD,
        "IndexField",
        OpFlags::HAS_PKGLEN,
        &[NameString, NameString, ByteData, FieldList],
        Any,
    ),
    info(
        Opcode::BANK_FIELD,
        "BankField",
        OpFlags::HAS_PKGLEN,
        &[NameString, NameString, TermObj, ByteData, FieldList],
        Any,
    ),
    info(
        Opcode::DATA_REGION,
        "DataRegion",
        OpFlags::NAMED,
        &[NameString, TermObj, TermObj, TermObj],
        Any,
    ),
];

/// Looks up the descriptor for a (possibly extended) opcode.
pub fn lookup(op: Opcode) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE
        .binary_search_by_key(&op.0, |entry| entry.op.0)
        .ok()
        .map(|index| &OPCODE_TABLE[index])
}
