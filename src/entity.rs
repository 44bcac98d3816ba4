//! The entity tree that AML bytecode decodes into.
//!
//! Entities live in the [`Namespace`](crate::namespace::Namespace) arena and
//! refer to each other by [`EntityId`]. Child lists own; parent links and
//! resolved targets are plain back-references, so the tree stays acyclic at
//! the ownership level.

use rustc_hash::FxHashMap;

use crate::opcode::Opcode;

/// Arena index of an entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityId(u32);

impl EntityId {
    pub(crate) fn new(index: usize) -> EntityId {
        EntityId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heterogeneous opcode argument.
#[derive(Clone, PartialEq, Debug)]
pub enum Arg {
    Entity(EntityId),
    String(String),
    Int(u64),
    Bytes(Vec<u8>),
}

impl Arg {
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Arg::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Arg::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Memoized value of a constant entity.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstValue {
    Int(u64),
    Str(String),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FieldAccessType {
    Any = 0,
    Byte = 1,
    Word = 2,
    Dword = 3,
    Qword = 4,
    Buffer = 5,
}

impl FieldAccessType {
    pub fn from_bits(bits: u8) -> Option<FieldAccessType> {
        Some(match bits {
            0 => FieldAccessType::Any,
            1 => FieldAccessType::Byte,
            2 => FieldAccessType::Word,
            3 => FieldAccessType::Dword,
            4 => FieldAccessType::Qword,
            5 => FieldAccessType::Buffer,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FieldUpdateRule {
    Preserve = 0,
    WriteAsOnes = 1,
    WriteAsZeros = 2,
}

impl FieldUpdateRule {
    pub fn from_bits(bits: u8) -> Option<FieldUpdateRule> {
        Some(match bits {
            0 => FieldUpdateRule::Preserve,
            1 => FieldUpdateRule::WriteAsOnes,
            2 => FieldUpdateRule::WriteAsZeros,
            _ => return None,
        })
    }
}

/// Access attribute for buffer-style accesses to SMBus/GPIO regions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum FieldAccessAttrib {
    Quick = 0x02,
    SendReceive = 0x04,
    Byte = 0x06,
    Word = 0x08,
    Block = 0x0a,
    /// Byte count carried alongside.
    Bytes = 0x0b,
    ProcessCall = 0x0c,
    BlockProcessCall = 0x0d,
    /// Byte count carried alongside.
    RawBytes = 0x0e,
    /// Byte count carried alongside.
    RawProcessBytes = 0x0f,
}

impl FieldAccessAttrib {
    pub fn from_bits(bits: u8) -> Option<FieldAccessAttrib> {
        Some(match bits {
            0x02 => FieldAccessAttrib::Quick,
            0x04 => FieldAccessAttrib::SendReceive,
            0x06 => FieldAccessAttrib::Byte,
            0x08 => FieldAccessAttrib::Word,
            0x0a => FieldAccessAttrib::Block,
            0x0b => FieldAccessAttrib::Bytes,
            0x0c => FieldAccessAttrib::ProcessCall,
            0x0d => FieldAccessAttrib::BlockProcessCall,
            0x0e => FieldAccessAttrib::RawBytes,
            0x0f => FieldAccessAttrib::RawProcessBytes,
            _ => return None,
        })
    }
}

/// Data shared by regular field units and index fields.
#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub bit_offset: u32,
    pub bit_width: u32,
    pub lock: bool,
    pub update_rule: FieldUpdateRule,
    pub access_type: FieldAccessType,
    pub access_attrib: Option<FieldAccessAttrib>,
    /// Valid when `access_attrib` is `Bytes`, `RawBytes` or
    /// `RawProcessBytes`.
    pub byte_count: u8,
    pub connection_name: Option<String>,
    pub resolved_connection: Option<EntityId>,
}

#[derive(Clone, Debug)]
pub struct FieldUnitData {
    pub field: FieldInfo,
    pub region_name: String,
    pub region: Option<EntityId>,
}

#[derive(Clone, Debug)]
pub struct IndexFieldData {
    pub field: FieldInfo,
    pub index_reg_name: String,
    pub index_reg: Option<EntityId>,
    pub data_reg_name: String,
    pub data_reg: Option<EntityId>,
}

#[derive(Clone, Debug, Default)]
pub struct ScopeData {
    pub children: Vec<EntityId>,
}

#[derive(Clone, Debug, Default)]
pub struct BufferData {
    pub size: Option<Arg>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct MutexData {
    pub sync_level: u8,
    /// Set for the pre-defined global lock (`\_GL`).
    pub is_global: bool,
}

#[derive(Clone, Debug)]
pub struct NamedRefData {
    pub target_name: String,
    pub target: Option<EntityId>,
}

#[derive(Clone, Debug)]
pub struct InvocationData {
    pub method: EntityId,
}

#[derive(Clone, Debug, Default)]
pub struct MethodData {
    pub children: Vec<EntityId>,
    pub arg_count: u8,
    pub serialized: bool,
    pub sync_level: u8,
}

#[derive(Clone, Debug, Default)]
pub struct DeviceData {
    pub children: Vec<EntityId>,
    /// Direct methods exposed by this device, indexed at finalize time.
    pub method_map: FxHashMap<String, EntityId>,
}

/// Variant payload of an entity.
#[derive(Clone, Debug)]
pub enum EntityKind {
    Unnamed,
    Named,
    Const(Option<ConstValue>),
    Scope(ScopeData),
    Buffer(BufferData),
    BufferField,
    Region,
    FieldUnit(FieldUnitData),
    IndexField(IndexFieldData),
    Mutex(MutexData),
    Event,
    NamedReference(NamedRefData),
    MethodInvocation(InvocationData),
    Method(MethodData),
    Device(DeviceData),
}

/// A node of the namespace tree: the common header (opcode, parent, name,
/// args) plus the variant payload.
#[derive(Clone, Debug)]
pub struct Entity {
    op: Opcode,
    parent: Option<EntityId>,
    name: String,
    args: Vec<Arg>,
    kind: EntityKind,
}

impl Entity {
    pub fn new(op: Opcode, kind: EntityKind) -> Entity {
        let mut entity = Entity {
            op,
            parent: None,
            name: String::new(),
            args: Vec::new(),
            kind,
        };
        // Zero, One and Ones carry their value in the opcode itself.
        if let EntityKind::Const(value) = &mut entity.kind {
            match op {
                Opcode::ZERO => *value = Some(ConstValue::Int(0)),
                Opcode::ONE => *value = Some(ConstValue::Int(1)),
                Opcode::ONES => *value = Some(ConstValue::Int(u64::MAX)),
                _ => {}
            }
        }
        entity
    }

    pub fn scope(op: Opcode, name: &str) -> Entity {
        let mut entity = Entity::new(op, EntityKind::Scope(ScopeData::default()));
        entity.name = name.to_owned();
        entity
    }

    pub fn global_mutex(name: &str) -> Entity {
        let mut entity = Entity::new(
            Opcode::MUTEX,
            EntityKind::Mutex(MutexData {
                sync_level: 0,
                is_global: true,
            }),
        );
        entity.name = name.to_owned();
        entity
    }

    pub fn opcode(&self) -> Opcode {
        self.op
    }

    pub fn set_opcode(&mut self, op: Opcode) {
        self.op = op;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            EntityKind::Const(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Whether this entity owns a child list.
    pub fn is_scope(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Scope(_) | EntityKind::Method(_) | EntityKind::Device(_)
        )
    }

    pub fn children(&self) -> Option<&[EntityId]> {
        match &self.kind {
            EntityKind::Scope(scope) => Some(&scope.children),
            EntityKind::Method(method) => Some(&method.children),
            EntityKind::Device(device) => Some(&device.children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<EntityId>> {
        match &mut self.kind {
            EntityKind::Scope(scope) => Some(&mut scope.children),
            EntityKind::Method(method) => Some(&mut method.children),
            EntityKind::Device(device) => Some(&mut device.children),
            _ => None,
        }
    }

    /// Stores a positional argument. The interpretation of `index` is
    /// variant-specific; returns false when the value does not fit the slot.
    pub fn set_arg(&mut self, index: u8, arg: Arg) -> bool {
        match &mut self.kind {
            EntityKind::Unnamed
            | EntityKind::NamedReference(_)
            | EntityKind::MethodInvocation(_)
            | EntityKind::FieldUnit(_)
            | EntityKind::IndexField(_) => {
                self.args.push(arg);
                true
            }
            EntityKind::Named | EntityKind::Region | EntityKind::Event => {
                if index == 0 {
                    return match arg {
                        Arg::String(name) => {
                            self.name = name;
                            true
                        }
                        _ => false,
                    };
                }
                self.args.push(arg);
                true
            }
            EntityKind::Const(value) => {
                *value = match arg {
                    Arg::Int(v) => Some(ConstValue::Int(v)),
                    Arg::String(s) => Some(ConstValue::Str(s)),
                    _ => return false,
                };
                index == 0
            }
            EntityKind::Scope(_) | EntityKind::Method(_) | EntityKind::Device(_) => {
                // Arg 0 *may* be the scope name; anything else is a plain arg.
                if index == 0 {
                    if let Arg::String(name) = arg {
                        self.name = name;
                        return true;
                    }
                }
                self.args.push(arg);
                true
            }
            EntityKind::Buffer(buffer) => match index {
                0 => {
                    buffer.size = Some(arg);
                    true
                }
                1 => match arg {
                    Arg::Bytes(bytes) => {
                        buffer.data = bytes;
                        true
                    }
                    _ => false,
                },
                _ => false,
            },
            EntityKind::BufferField => {
                // CreateField carries the new name at arg 3, the fixed-width
                // CreateXxxField opcodes at arg 2.
                let name_index: u8 = if self.op == Opcode::CREATE_FIELD { 3 } else { 2 };
                if index == name_index {
                    return match arg {
                        Arg::String(name) => {
                            self.name = name;
                            true
                        }
                        _ => false,
                    };
                }
                self.args.push(arg);
                true
            }
            EntityKind::Mutex(mutex) => {
                if index == 0 {
                    return match arg {
                        Arg::String(name) => {
                            self.name = name;
                            true
                        }
                        _ => false,
                    };
                }
                // Sync level lives in the low nibble of the flags byte.
                match arg {
                    Arg::Int(value) => {
                        mutex.sync_level = (value & 0xf) as u8;
                        true
                    }
                    _ => false,
                }
            }
        }
    }
}
