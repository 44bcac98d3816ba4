//! Two-pass AML parser.
//!
//! Pass 1 decodes the byte stream by recursive descent, driven by the opcode
//! descriptors, and builds the entity tree inside the caller's namespace.
//! Pass 2 walks the finished tree and binds every name that was still
//! forward at the point it was parsed. Specific failure causes are written
//! to the diagnostic sink; the returned error only carries the category.

use std::io::Write;

use rustc_hash::FxHashMap;

use crate::entity::{
    Arg, ConstValue, DeviceData, Entity, EntityId, EntityKind, FieldAccessAttrib, FieldAccessType,
    FieldInfo, FieldUnitData, FieldUpdateRule, IndexFieldData, InvocationData, MethodData,
    NamedRefData, ScopeData,
};
use crate::namespace::Namespace;
use crate::opcode::{self, ArgKind, ObjType, OpFlags, Opcode, OpcodeInfo};
use crate::sdt::HEADER_LEN;
use crate::stream::StreamReader;
use crate::AmlError;

pub struct Parser<'a> {
    table_name: String,
    r: StreamReader<'a>,
    sink: &'a mut dyn Write,
    ns: &'a mut Namespace,
    scope_stack: Vec<EntityId>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a whole table (fixed SDT header included); the
    /// header is skipped, the `Length` field bounds the stream.
    pub fn new(
        ns: &'a mut Namespace,
        sink: &'a mut dyn Write,
        table_name: &str,
        table: &'a [u8],
    ) -> Parser<'a> {
        Parser {
            table_name: table_name.to_owned(),
            r: StreamReader::new(table, HEADER_LEN),
            sink,
            ns,
            scope_stack: Vec::new(),
        }
    }

    /// Runs both passes. On failure no entity is removed from the namespace;
    /// the caller is expected to discard it.
    pub fn parse(mut self) -> Result<(), AmlError> {
        // Pass 1: decode bytecode and build entities.
        self.scope_stack.clear();
        self.scope_enter(self.ns.root());
        let decoded = self.parse_obj_list(self.r.len());
        self.scope_exit();

        if decoded.is_err() {
            let last_op = self.r.last_byte().unwrap_or(0);
            let _ = writeln!(
                self.sink,
                "[table: {}, offset: {}] error parsing AML bytecode (last op 0x{:x})",
                self.table_name,
                self.r.offset().saturating_sub(1),
                last_op
            );
            return decoded;
        }

        // Pass 2: resolve forward references. The traversal continues past
        // failures so every unresolved name gets reported in one go.
        let mut pending = Vec::new();
        self.ns.visit(self.ns.root(), &mut |_, id| {
            pending.push(id);
            true
        });

        let mut failed = false;
        for id in pending {
            if !self.resolve_entity(id) {
                failed = true;
            }
        }
        if failed {
            return Err(AmlError::Resolve);
        }
        Ok(())
    }

    fn scope_current(&self) -> EntityId {
        *self
            .scope_stack
            .last()
            .expect("scope stack holds at least the root while parsing")
    }

    fn scope_enter(&mut self, scope: EntityId) {
        self.scope_stack.push(scope);
    }

    fn scope_exit(&mut self) {
        self.scope_stack.pop();
    }

    fn append_to_current(&mut self, obj: EntityId) -> Result<(), AmlError> {
        let scope = self.scope_current();
        if self.ns.append(scope, obj) {
            Ok(())
        } else {
            Err(AmlError::Parse)
        }
    }

    /// Reads objects until EOF or `max_offset` is reached.
    fn parse_obj_list(&mut self, max_offset: usize) -> Result<(), AmlError> {
        while !self.r.eof() && self.r.offset() < max_offset {
            self.parse_obj()?;
        }
        Ok(())
    }

    fn parse_obj(&mut self) -> Result<(), AmlError> {
        // If the next bytes do not decode to an opcode this can only be a
        // method invocation or a name reference.
        let mut cur_offset = self.r.offset();
        let info = match self.next_opcode() {
            Some(info) => info,
            None => {
                self.r.set_offset(cur_offset)?;
                return self.parse_method_invocation_or_name_ref();
            }
        };

        let has_pkg_len = info.flags.contains(OpFlags::HAS_PKGLEN)
            || info.args.contains(&ArgKind::TermList)
            || info.args.contains(&ArgKind::FieldList);

        let mut pkg_len = 0usize;
        if has_pkg_len {
            cur_offset = self.r.offset();
            pkg_len = self.parse_pkg_length()? as usize;
        }
        let sub_end = cur_offset + pkg_len;

        // Scope-opening opcodes resolve their target relative to the
        // namespace rather than creating a fresh entity here.
        match info.op {
            Opcode::SCOPE => return self.parse_scope(sub_end),
            Opcode::DEVICE | Opcode::METHOD => return self.parse_namespaced_obj(info.op, sub_end),
            _ => {}
        }

        let obj = self.ns.alloc(self.make_obj_for_opcode(info));
        self.append_to_current(obj)?;

        for (index, kind) in info.args.iter().enumerate() {
            self.parse_arg(info, obj, index as u8, *kind, sub_end)?;
        }

        self.finalize_obj(info.op, obj)
    }

    fn make_obj_for_opcode(&self, info: &OpcodeInfo) -> Entity {
        let kind = if info.obj_type == ObjType::LocalScope {
            EntityKind::Scope(ScopeData::default())
        } else if info.op == Opcode::OP_REGION {
            EntityKind::Region
        } else if info.op == Opcode::BUFFER {
            EntityKind::Buffer(Default::default())
        } else if info.op == Opcode::MUTEX {
            EntityKind::Mutex(Default::default())
        } else if info.op == Opcode::EVENT {
            EntityKind::Event
        } else if info.is_buffer_field() {
            EntityKind::BufferField
        } else if info.flags.contains(OpFlags::CONSTANT) {
            EntityKind::Const(None)
        } else if info.flags.contains(OpFlags::SCOPED) {
            EntityKind::Scope(ScopeData::default())
        } else if info.flags.contains(OpFlags::NAMED) {
            EntityKind::Named
        } else {
            EntityKind::Unnamed
        };
        Entity::new(info.op, kind)
    }

    /// Post-parse fixups for objects that rearrange the tree.
    fn finalize_obj(&mut self, op: Opcode, obj: EntityId) -> Result<(), AmlError> {
        match op {
            Opcode::ELSE => {
                // The grammar emits Else as a peer; the tree wants it as the
                // third argument of the preceding If.
                let scope = self.scope_current();
                self.ns.remove_last_child(scope);
                let prev = self.ns.last_child(scope);
                let matching_if = match prev {
                    Some(prev) if self.ns.get(prev).opcode() == Opcode::IF => prev,
                    _ => {
                        let _ = writeln!(
                            self.sink,
                            "[table: {}, offset: {}] encountered else block without a matching if block",
                            self.table_name,
                            self.r.offset()
                        );
                        return Err(AmlError::Parse);
                    }
                };
                if !self.ns.get_mut(matching_if).set_arg(2, Arg::Entity(obj)) {
                    return Err(AmlError::Parse);
                }
            }
            Opcode::DEVICE => {
                let mut method_map = FxHashMap::default();
                self.collect_device_methods(obj, &mut method_map);
                if let EntityKind::Device(device) = self.ns.get_mut(obj).kind_mut() {
                    device.method_map = method_map;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Indexes the methods a device exposes: direct methods and methods in
    /// nested plain scopes. Nested devices keep their own index.
    fn collect_device_methods(&self, scope: EntityId, map: &mut FxHashMap<String, EntityId>) {
        let children = match self.ns.get(scope).children() {
            Some(children) => children,
            None => return,
        };
        for &child in children {
            match self.ns.get(child).kind() {
                EntityKind::Method(_) => {
                    map.insert(self.ns.get(child).name().to_owned(), child);
                }
                EntityKind::Device(_) => {}
                EntityKind::Scope(_) => self.collect_device_methods(child, map),
                _ => {}
            }
        }
    }

    /// `Scope(name)` re-enters an existing scope: the root, a pre-defined
    /// scope, a device/processor/thermal-zone/power-resource, or any other
    /// named scope.
    fn parse_scope(&mut self, max_offset: usize) -> Result<(), AmlError> {
        let name = self.parse_name_string()?;

        let target = match self.ns.find(self.scope_current(), &name) {
            Some(target) => target,
            None => {
                let _ = writeln!(
                    self.sink,
                    "[table: {}, offset: {}] undefined scope: {}",
                    self.table_name,
                    self.r.offset(),
                    name
                );
                return Err(AmlError::Parse);
            }
        };

        let entity = self.ns.get(target);
        let enterable = entity.is_scope()
            && (matches!(
                entity.opcode(),
                Opcode::DEVICE | Opcode::PROCESSOR | Opcode::THERMAL_ZONE | Opcode::POWER_RES
            ) || !entity.name().is_empty());
        if !enterable {
            let _ = writeln!(
                self.sink,
                "[table: {}, offset: {}] {} does not refer to a scoped object",
                self.table_name,
                self.r.offset(),
                name
            );
            return Err(AmlError::Parse);
        }

        self.scope_enter(target);
        let result = self.parse_obj_list(max_offset);
        self.scope_exit();
        result
    }

    /// Devices and methods may carry a path expression; the new entity is
    /// attached to the scope the path resolves to, not the current one.
    fn parse_namespaced_obj(&mut self, op: Opcode, max_offset: usize) -> Result<(), AmlError> {
        let scope_expr = self.parse_name_string()?;

        let (parent, name) = match self.ns.resolve_path(self.scope_current(), &scope_expr) {
            Some(resolved) => resolved,
            None => {
                let current = self.ns.get(self.scope_current()).name().to_owned();
                let _ = writeln!(
                    self.sink,
                    "[table: {}, offset: {}] undefined scope target: {} (current scope: {})",
                    self.table_name,
                    self.r.offset(),
                    scope_expr,
                    current
                );
                return Err(AmlError::Parse);
            }
        };

        let entity = match op {
            Opcode::DEVICE => {
                let mut entity = Entity::new(op, EntityKind::Device(DeviceData::default()));
                entity.set_name(&name);
                entity
            }
            Opcode::METHOD => {
                let flags = self.parse_num_constant(1)? as u8;
                let mut entity = Entity::new(
                    op,
                    EntityKind::Method(MethodData {
                        children: Vec::new(),
                        arg_count: flags & 0x7,         // bits[0:2]
                        serialized: flags & 0x8 != 0,   // bit 3
                        sync_level: (flags >> 4) & 0xf, // bits[4:7]
                    }),
                );
                entity.set_name(&name);
                entity
            }
            _ => return Err(AmlError::Parse),
        };

        let obj = self.ns.alloc(entity);
        if !self.ns.append(parent, obj) {
            return Err(AmlError::Parse);
        }

        self.scope_enter(obj);
        let result = self.parse_obj_list(max_offset);
        self.scope_exit();
        result?;

        self.finalize_obj(op, obj)
    }

    fn parse_arg(
        &mut self,
        info: &'static OpcodeInfo,
        obj: EntityId,
        arg_index: u8,
        kind: ArgKind,
        max_offset: usize,
    ) -> Result<(), AmlError> {
        let arg = match kind {
            ArgKind::NameString => Arg::String(self.parse_name_string()?),
            ArgKind::ByteData => Arg::Int(self.parse_num_constant(1)?),
            ArgKind::Word => Arg::Int(self.parse_num_constant(2)?),
            ArgKind::Dword => Arg::Int(self.parse_num_constant(4)?),
            ArgKind::Qword => Arg::Int(self.parse_num_constant(8)?),
            ArgKind::String => Arg::String(self.parse_string()?),
            ArgKind::TermObj | ArgKind::DataRefObj => Arg::Entity(self.parse_arg_obj()?),
            ArgKind::SuperName | ArgKind::SimpleName => Arg::Entity(self.parse_super_name()?),
            ArgKind::Target => self.parse_target()?,
            ArgKind::TermList => {
                // A scoped entity collects the term list as children;
                // anything else gets an anonymous scope as this argument.
                let scope = if self.ns.get(obj).is_scope() {
                    obj
                } else {
                    let mut anon = Entity::new(Opcode::SCOPE, EntityKind::Scope(ScopeData::default()));
                    anon.set_parent(Some(self.scope_current()));
                    let anon = self.ns.alloc(anon);
                    if !self.ns.get_mut(obj).set_arg(arg_index, Arg::Entity(anon)) {
                        return Err(AmlError::Parse);
                    }
                    anon
                };
                self.scope_enter(scope);
                let result = self.parse_obj_list(max_offset);
                self.scope_exit();
                return result;
            }
            ArgKind::FieldList => return self.parse_field_list(info.op, obj, max_offset),
            ArgKind::ByteList => {
                let mut bytes = Vec::new();
                while self.r.offset() < max_offset {
                    bytes.push(self.r.read_byte()?);
                }
                Arg::Bytes(bytes)
            }
            // No opcode in the table declares a Package argument; packages
            // decode through TermList.
            ArgKind::Package => return Err(AmlError::Parse),
        };

        if self.ns.get_mut(obj).set_arg(arg_index, arg) {
            Ok(())
        } else {
            Err(AmlError::Parse)
        }
    }

    /// Parses one object and detaches it from the current scope so it can
    /// be stored as an argument instead.
    fn parse_arg_obj(&mut self) -> Result<EntityId, AmlError> {
        self.parse_obj()?;
        self.ns
            .remove_last_child(self.scope_current())
            .ok_or(AmlError::Parse)
    }

    /// SuperName := SimpleName | DebugObj | Type6Opcode
    /// SimpleName := NameString | ArgObj | LocalObj
    fn parse_super_name(&mut self) -> Result<EntityId, AmlError> {
        let cur_offset = self.r.offset();
        if let Some(info) = self.next_opcode() {
            if info.op.is_local_arg() || info.op.is_arg() {
                return Ok(self.ns.alloc(Entity::new(info.op, EntityKind::Unnamed)));
            }
        }
        self.r.set_offset(cur_offset)?;
        self.parse_arg_obj()
    }

    /// Target := SuperName | NullName
    ///
    /// A lone zero byte is the NullName sentinel, not the Zero constant.
    fn parse_target(&mut self) -> Result<Arg, AmlError> {
        let cur_offset = self.r.offset();
        let decoded = self.next_opcode();
        self.r.set_offset(cur_offset)?;

        if let Some(info) = decoded {
            if info.op == Opcode::ZERO {
                self.r.set_offset(cur_offset + 1)?;
                let sentinel = Entity::new(
                    Opcode::STRING_PREFIX,
                    EntityKind::Const(Some(ConstValue::Str(String::new()))),
                );
                return Ok(Arg::Entity(self.ns.alloc(sentinel)));
            }

            let is_type6 = matches!(
                info.op,
                Opcode::REF_OF | Opcode::DEREF_OF | Opcode::INDEX | Opcode::DEBUG
            );
            if info.op.is_arg() || info.op.is_local_arg() || is_type6 {
                return Ok(Arg::Entity(self.parse_arg_obj()?));
            }
            return Err(AmlError::Parse);
        }

        // Either a method invocation or a bare name string.
        if self.parse_method_invocation_or_name_ref().is_ok() {
            let obj = self
                .ns
                .remove_last_child(self.scope_current())
                .ok_or(AmlError::Parse)?;
            return Ok(Arg::Entity(obj));
        }

        self.r.set_offset(cur_offset)?;
        Ok(Arg::String(self.parse_name_string()?))
    }

    /// MethodInvocation := NameString TermArgList
    ///
    /// The callee's declared arity decides how many term args to parse, so
    /// an invocation can only be recognized once the method is known. An
    /// unknown name becomes a reference that pass 2 must bind.
    fn parse_method_invocation_or_name_ref(&mut self) -> Result<(), AmlError> {
        let invocation_start = self.r.offset();
        let name = self.parse_name_string()?;

        let method = self
            .ns
            .find(self.scope_current(), &name)
            .filter(|&id| matches!(self.ns.get(id).kind(), EntityKind::Method(_)));

        let method = match method {
            Some(method) => method,
            None => {
                // Assume a forward reference and let pass 2 resolve it.
                let reference = Entity::new(
                    Opcode::ZERO,
                    EntityKind::NamedReference(NamedRefData {
                        target_name: name,
                        target: None,
                    }),
                );
                let reference = self.ns.alloc(reference);
                return self.append_to_current(reference);
            }
        };

        let arg_count = match self.ns.get(method).kind() {
            EntityKind::Method(data) => data.arg_count,
            _ => 0,
        };

        let invocation = self.ns.alloc(Entity::new(
            Opcode::ZERO,
            EntityKind::MethodInvocation(InvocationData { method }),
        ));

        let mut arg_index: u8 = 0;
        while arg_index < arg_count && !self.r.eof() {
            let cur_offset = self.r.offset();
            let next = self.next_opcode();
            self.r.set_offset(cur_offset)?;

            let parsed = match next {
                Some(info)
                    if info.op.is_type2()
                        || info.op.is_arg()
                        || info.op.is_local_arg()
                        || info.op.is_data_object() =>
                {
                    self.parse_arg_obj().ok()
                }
                _ => {
                    // Possibly a nested invocation or name reference.
                    if self.parse_method_invocation_or_name_ref().is_ok() {
                        self.ns.remove_last_child(self.scope_current())
                    } else {
                        None
                    }
                }
            };

            match parsed {
                Some(arg) => {
                    if !self.ns.get_mut(invocation).set_arg(arg_index, Arg::Entity(arg)) {
                        return Err(AmlError::Parse);
                    }
                    arg_index += 1;
                }
                None => {
                    // No more term args to parse.
                    self.r.set_offset(cur_offset)?;
                    break;
                }
            }
        }

        if arg_index != arg_count {
            let _ = writeln!(
                self.sink,
                "[table: {}, offset: {}] argument mismatch (exp: {}, got {}) for invocation of method: {}",
                self.table_name, invocation_start, arg_count, arg_index, name
            );
            return Err(AmlError::Parse);
        }

        self.append_to_current(invocation)
    }

    fn next_opcode(&mut self) -> Option<&'static OpcodeInfo> {
        let next = self.r.read_byte().ok()?;
        if next != opcode::EXT_OP_PREFIX {
            return opcode::lookup(Opcode(next as u16));
        }

        let second = self.r.read_byte().ok()?;
        opcode::lookup(Opcode::extended(second))
    }

    /// FieldElement := NamedField | ReservedField | AccessField |
    ///                 ExtendedAccessField | ConnectField
    ///
    /// Field elements become entities of the scope enclosing the
    /// Field/IndexField itself.
    fn parse_field_list(
        &mut self,
        op: Opcode,
        obj: EntityId,
        max_offset: usize,
    ) -> Result<(), AmlError> {
        let args = self.ns.get(obj).args().to_vec();

        let (region_name, index_reg_name, data_reg_name, flags) = match op {
            Opcode::FIELD => {
                if args.len() != 2 {
                    return self.field_list_arg_error(op, args.len());
                }
                let region = args[0].as_str().ok_or(AmlError::Parse)?.to_owned();
                let flags = args[1].as_int().ok_or(AmlError::Parse)?;
                (region, String::new(), String::new(), flags)
            }
            Opcode::INDEX_FIELD => {
                if args.len() != 3 {
                    return self.field_list_arg_error(op, args.len());
                }
                let index_reg = args[0].as_str().ok_or(AmlError::Parse)?.to_owned();
                let data_reg = args[1].as_str().ok_or(AmlError::Parse)?.to_owned();
                let flags = args[2].as_int().ok_or(AmlError::Parse)?;
                (String::new(), index_reg, data_reg, flags)
            }
            _ => return self.field_list_arg_error(op, args.len()),
        };

        let mut access_type = self.decode_access_type(flags as u8)?;
        let lock = flags & 0x10 != 0; // bit 4
        let update_rule = match FieldUpdateRule::from_bits(((flags >> 5) & 0x3) as u8) {
            Some(rule) => rule,
            None => {
                let _ = writeln!(
                    self.sink,
                    "[table: {}, offset: {}] invalid field update rule in flags 0x{:x}",
                    self.table_name,
                    self.r.offset(),
                    flags
                );
                return Err(AmlError::Parse);
            }
        };

        let mut access_attrib: Option<FieldAccessAttrib> = None;
        let mut access_byte_count: u8 = 0;
        let mut cur_bit_offset: u32 = 0;
        let mut connection_name: Option<String> = None;
        let mut resolved_connection: Option<EntityId> = None;

        while self.r.offset() < max_offset && !self.r.eof() {
            let next = self.r.read_byte()?;
            match next {
                // ReservedField, generated by the Offset() macro.
                0x00 => {
                    let skipped = self.parse_pkg_length()?;
                    cur_bit_offset += skipped;
                }
                // AccessField: new access settings for the fields that follow.
                0x01 => {
                    let ty = self.r.read_byte()?;
                    access_type = self.decode_access_type(ty)?;
                    let attrib = self.r.read_byte()?;
                    access_byte_count = 0;
                    access_attrib = self.decode_access_attrib(attrib)?;
                }
                // ConnectField: a name or a buffer the following fields refer to.
                0x02 => {
                    let cur_offset = self.r.offset();
                    match self.parse_name_string() {
                        Ok(name) => {
                            connection_name = Some(name);
                            resolved_connection = None;
                        }
                        Err(_) => {
                            self.r.set_offset(cur_offset)?;
                            resolved_connection = Some(self.parse_arg_obj()?);
                            connection_name = None;
                        }
                    }
                }
                // ExtendedAccessField.
                0x03 => {
                    let ty = self.r.read_byte()?;
                    access_type = self.decode_access_type(ty)?;
                    let ext_attrib = self.r.read_byte()?;
                    access_byte_count = self.r.read_byte()?;
                    match ext_attrib {
                        0x0b => access_attrib = Some(FieldAccessAttrib::Bytes),
                        0x0e => access_attrib = Some(FieldAccessAttrib::RawBytes),
                        0x0f => access_attrib = Some(FieldAccessAttrib::RawProcessBytes),
                        _ => {}
                    }
                }
                // NamedField.
                _ => {
                    self.r.unread_byte()?;
                    let unit_name = self.parse_name_string()?;
                    let bit_width = self.parse_pkg_length()?;

                    let field = FieldInfo {
                        bit_offset: cur_bit_offset,
                        bit_width,
                        lock,
                        update_rule,
                        access_type,
                        access_attrib,
                        byte_count: access_byte_count,
                        connection_name: connection_name.clone(),
                        resolved_connection,
                    };
                    let kind = match op {
                        Opcode::FIELD => EntityKind::FieldUnit(FieldUnitData {
                            field,
                            region_name: region_name.clone(),
                            region: None,
                        }),
                        _ => EntityKind::IndexField(IndexFieldData {
                            field,
                            index_reg_name: index_reg_name.clone(),
                            index_reg: None,
                            data_reg_name: data_reg_name.clone(),
                            data_reg: None,
                        }),
                    };

                    let mut unit = Entity::new(op, kind);
                    unit.set_name(&unit_name);
                    let unit = self.ns.alloc(unit);
                    self.append_to_current(unit)?;

                    cur_bit_offset += bit_width;
                }
            }
        }

        // A well-formed list lands exactly on its PkgLength boundary.
        if self.r.offset() != max_offset {
            return Err(AmlError::Parse);
        }
        Ok(())
    }

    fn field_list_arg_error(&mut self, op: Opcode, arg_count: usize) -> Result<(), AmlError> {
        let _ = writeln!(
            self.sink,
            "[table: {}, offset: {}] unsupported opcode [0x{:02x}] invalid arg count: {}",
            self.table_name,
            self.r.offset(),
            op.0,
            arg_count
        );
        Err(AmlError::Parse)
    }

    fn decode_access_type(&mut self, bits: u8) -> Result<FieldAccessType, AmlError> {
        match FieldAccessType::from_bits(bits & 0xf) {
            Some(access_type) => Ok(access_type),
            None => {
                let _ = writeln!(
                    self.sink,
                    "[table: {}, offset: {}] invalid field access type 0x{:x}",
                    self.table_name,
                    self.r.offset(),
                    bits & 0xf
                );
                Err(AmlError::Parse)
            }
        }
    }

    fn decode_access_attrib(&mut self, byte: u8) -> Result<Option<FieldAccessAttrib>, AmlError> {
        if byte == 0 {
            return Ok(None);
        }
        match FieldAccessAttrib::from_bits(byte) {
            Some(attrib) => Ok(Some(attrib)),
            None => {
                let _ = writeln!(
                    self.sink,
                    "[table: {}, offset: {}] invalid field access attribute 0x{:x}",
                    self.table_name,
                    self.r.offset(),
                    byte
                );
                Err(AmlError::Parse)
            }
        }
    }

    /// PkgLength: the two high bits of the lead byte give the number of
    /// follow bytes; values are little-endian nybble-packed.
    fn parse_pkg_length(&mut self) -> Result<u32, AmlError> {
        let lead = self.r.read_byte()?;
        let follow_bytes = lead >> 6;
        if follow_bytes == 0 {
            return Ok(u32::from(lead & 0x3f));
        }

        let mut pkg_len = u32::from(lead & 0x0f);
        for index in 0..follow_bytes {
            let byte = self.r.read_byte()?;
            pkg_len |= u32::from(byte) << (4 + 8 * u32::from(index));
        }
        Ok(pkg_len)
    }

    /// Little-endian integer of 1, 2, 4 or 8 bytes.
    fn parse_num_constant(&mut self, num_bytes: u8) -> Result<u64, AmlError> {
        let mut value = 0u64;
        for index in 0..num_bytes {
            let byte = self.r.read_byte()?;
            value |= u64::from(byte) << (8 * u32::from(index));
        }
        Ok(value)
    }

    /// 7-bit ASCII bytes terminated by a null.
    fn parse_string(&mut self) -> Result<String, AmlError> {
        let mut out = String::new();
        loop {
            let next = self.r.read_byte()?;
            if next == 0x00 {
                break;
            }
            if !(0x01..=0x7f).contains(&next) {
                return Err(AmlError::Parse);
            }
            out.push(next as char);
        }
        Ok(out)
    }

    /// NameString := RootChar NamePath | PrefixPath NamePath
    /// NamePath := NameSeg | DualNamePath | MultiNamePath | NullName
    ///
    /// Segments are joined with `.` so namespace lookups can split them
    /// again; the leading `\` or `^` prefix is preserved as parsed.
    fn parse_name_string(&mut self) -> Result<String, AmlError> {
        let mut out = String::new();

        match self.r.peek_byte()? {
            b'\\' => {
                out.push('\\');
                self.r.read_byte()?;
            }
            b'^' => {
                while self.r.peek_byte()? == b'^' {
                    out.push('^');
                    self.r.read_byte()?;
                }
            }
            _ => {}
        }

        let next = self.r.read_byte()?;
        let mut read_count = match next {
            0x00 => 0, // NullName
            0x2e => 8, // DualNamePath
            0x2f => {
                // MultiNamePath
                let seg_count = self.r.read_byte()?;
                if seg_count == 0 {
                    return Err(AmlError::Parse);
                }
                usize::from(seg_count) * 4
            }
            _ => {
                // NameSeg := LeadNameChar NameChar{3}
                if !next.is_ascii_uppercase() && next != b'_' {
                    return Err(AmlError::Parse);
                }
                out.push(next as char);
                3
            }
        };

        let mut index = 0usize;
        while read_count > 0 {
            let byte = self.r.read_byte()?;
            if index > 0 && index % 4 == 0 {
                out.push('.');
            }
            out.push(byte as char);
            index += 1;
            read_count -= 1;
        }

        Ok(out)
    }

    fn resolve_entity(&mut self, id: EntityId) -> bool {
        match self.ns.get(id).kind() {
            EntityKind::NamedReference(_) => self.resolve_named_reference(id),
            EntityKind::FieldUnit(_) => self.resolve_field_unit(id),
            EntityKind::IndexField(_) => self.resolve_index_field(id),
            _ => true,
        }
    }

    fn resolve_named_reference(&mut self, id: EntityId) -> bool {
        let parent = self.ns.get(id).parent().unwrap_or(self.ns.root());
        let target_name = match self.ns.get(id).kind() {
            EntityKind::NamedReference(data) => data.target_name.clone(),
            _ => return true,
        };

        match self.ns.find(parent, &target_name) {
            Some(target) => {
                if let EntityKind::NamedReference(data) = self.ns.get_mut(id).kind_mut() {
                    data.target = Some(target);
                }
                true
            }
            None => {
                let parent_name = self.ns.get(parent).name().to_owned();
                let _ = writeln!(
                    self.sink,
                    "could not resolve referenced symbol: {} (parent: {})",
                    target_name, parent_name
                );
                false
            }
        }
    }

    fn resolve_connection(&mut self, id: EntityId) -> bool {
        let parent = self.ns.get(id).parent().unwrap_or(self.ns.root());
        let (connection_name, already_resolved) = match self.ns.get(id).kind() {
            EntityKind::FieldUnit(data) => (
                data.field.connection_name.clone(),
                data.field.resolved_connection.is_some(),
            ),
            EntityKind::IndexField(data) => (
                data.field.connection_name.clone(),
                data.field.resolved_connection.is_some(),
            ),
            _ => return true,
        };

        let connection_name = match connection_name {
            Some(name) if !already_resolved => name,
            _ => return true,
        };

        match self.ns.find(parent, &connection_name) {
            Some(target) => {
                match self.ns.get_mut(id).kind_mut() {
                    EntityKind::FieldUnit(data) => {
                        data.field.resolved_connection = Some(target);
                    }
                    EntityKind::IndexField(data) => {
                        data.field.resolved_connection = Some(target);
                    }
                    _ => {}
                }
                true
            }
            None => {
                let unit_name = self.ns.get(id).name().to_owned();
                let _ = writeln!(
                    self.sink,
                    "[field {}] could not resolve connection reference: {}",
                    unit_name, connection_name
                );
                false
            }
        }
    }

    fn resolve_field_unit(&mut self, id: EntityId) -> bool {
        if !self.resolve_connection(id) {
            return false;
        }

        let parent = self.ns.get(id).parent().unwrap_or(self.ns.root());
        let (region_name, already_resolved) = match self.ns.get(id).kind() {
            EntityKind::FieldUnit(data) => (data.region_name.clone(), data.region.is_some()),
            _ => return true,
        };
        if already_resolved {
            return true;
        }

        let region = self
            .ns
            .find(parent, &region_name)
            .filter(|&target| matches!(self.ns.get(target).kind(), EntityKind::Region));

        match region {
            Some(region) => {
                if let EntityKind::FieldUnit(data) = self.ns.get_mut(id).kind_mut() {
                    data.region = Some(region);
                }
                true
            }
            None => {
                let unit_name = self.ns.get(id).name().to_owned();
                let _ = writeln!(
                    self.sink,
                    "[field {}] could not resolve referenced region: {}",
                    unit_name, region_name
                );
                false
            }
        }
    }

    fn resolve_index_field(&mut self, id: EntityId) -> bool {
        if !self.resolve_connection(id) {
            return false;
        }

        let parent = self.ns.get(id).parent().unwrap_or(self.ns.root());
        let (index_reg_name, index_done, data_reg_name, data_done) = match self.ns.get(id).kind() {
            EntityKind::IndexField(data) => (
                data.index_reg_name.clone(),
                data.index_reg.is_some(),
                data.data_reg_name.clone(),
                data.data_reg.is_some(),
            ),
            _ => return true,
        };

        let mut ok = true;

        if !index_done {
            let target = self
                .ns
                .find(parent, &index_reg_name)
                .filter(|&target| matches!(self.ns.get(target).kind(), EntityKind::FieldUnit(_)));
            match target {
                Some(target) => {
                    if let EntityKind::IndexField(data) = self.ns.get_mut(id).kind_mut() {
                        data.index_reg = Some(target);
                    }
                }
                None => {
                    let unit_name = self.ns.get(id).name().to_owned();
                    let _ = writeln!(
                        self.sink,
                        "[indexField {}] could not resolve referenced index register: {}",
                        unit_name, index_reg_name
                    );
                    ok = false;
                }
            }
        }

        if !data_done {
            let target = self
                .ns
                .find(parent, &data_reg_name)
                .filter(|&target| matches!(self.ns.get(target).kind(), EntityKind::FieldUnit(_)));
            match target {
                Some(target) => {
                    if let EntityKind::IndexField(data) = self.ns.get_mut(id).kind_mut() {
                        data.data_reg = Some(target);
                    }
                }
                None => {
                    let unit_name = self.ns.get(id).name().to_owned();
                    let _ = writeln!(
                        self.sink,
                        "[dataField {}] could not resolve referenced data register: {}",
                        unit_name, data_reg_name
                    );
                    ok = false;
                }
            }
        }

        ok
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sdt::Sdt;

    fn table(aml: &[u8]) -> Sdt {
        let total = HEADER_LEN + aml.len();
        let mut bytes = Vec::with_capacity(total);
        bytes.extend_from_slice(b"DSDT");
        bytes.extend_from_slice(&(total as u32).to_le_bytes());
        bytes.push(2); // revision
        bytes.push(0); // checksum, patched below
        bytes.extend_from_slice(b"OEMIDX");
        bytes.extend_from_slice(b"OEMTBLID");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(b"RUST");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_LEN);
        bytes.extend_from_slice(aml);

        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes[9] = sum.wrapping_neg();
        Sdt::new(bytes.into()).expect("test table must validate")
    }

    fn parse(aml: &[u8]) -> (Namespace, Result<(), AmlError>, String) {
        let mut ns = Namespace::new();
        let mut sink = Vec::new();
        let result = crate::parse_aml_table(&mut ns, &mut sink, &table(aml));
        (ns, result, String::from_utf8_lossy(&sink).into_owned())
    }

    fn parse_ok(aml: &[u8]) -> Namespace {
        let (ns, result, diagnostics) = parse(aml);
        assert!(result.is_ok(), "parse failed: {}", diagnostics);
        ns
    }

    fn const_int(ns: &Namespace, arg: &Arg) -> u64 {
        let id = arg.as_entity().expect("argument should be an entity");
        match ns.get(id).const_value() {
            Some(ConstValue::Int(value)) => *value,
            other => panic!("expected integer constant, got {:?}", other),
        }
    }

    // The root starts out with the five pre-defined scopes plus \_GL.
    const PREDEFINED: usize = 6;

    fn check_tree_invariant(ns: &Namespace, scope: EntityId) {
        if let Some(children) = ns.get(scope).children() {
            for &child in children {
                assert_eq!(
                    ns.get(child).parent(),
                    Some(scope),
                    "child {:?} does not point back at its scope",
                    child
                );
                check_tree_invariant(ns, child);
            }
        }
    }

    #[test]
    fn name_with_absolute_dual_path() {
        // Name(\_SB.PCI0, 0x2A)
        let ns = parse_ok(&[
            0x08, 0x5c, 0x2e, b'_', b'S', b'B', b'_', b'P', b'C', b'I', b'0', 0x0a, 0x2a,
        ]);
        let root = ns.root();

        let id = ns.last_child(root).unwrap();
        let entity = ns.get(id);
        assert_eq!(entity.opcode(), Opcode::NAME);
        assert_eq!(entity.name(), "\\_SB_.PCI0");
        assert_eq!(entity.args().len(), 1);
        assert_eq!(const_int(&ns, &entity.args()[0]), 0x2a);
        check_tree_invariant(&ns, root);
    }

    #[test]
    fn multi_segment_name_normalization() {
        // Name(\_SB.PCI0.LPCB, 1)
        let ns = parse_ok(&[
            0x08, 0x5c, 0x2f, 0x03, b'_', b'S', b'B', b'_', b'P', b'C', b'I', b'0', b'L', b'P',
            b'C', b'B', 0x01,
        ]);
        let id = ns.last_child(ns.root()).unwrap();
        assert_eq!(ns.get(id).name(), "\\_SB_.PCI0.LPCB");
    }

    #[test]
    fn scope_reentry_adds_nothing() {
        // Scope(\_SB) {}
        let ns = parse_ok(&[0x10, 0x06, 0x5c, b'_', b'S', b'B', b'_']);
        let root = ns.root();

        assert_eq!(ns.get(root).children().unwrap().len(), PREDEFINED);
        let sb = ns.find(root, "_SB_").unwrap();
        assert!(ns.get(sb).children().unwrap().is_empty());
    }

    #[test]
    fn scope_root_reentry() {
        // Scope(\) { Name(FOO_, 1) }
        let ns = parse_ok(&[0x10, 0x09, 0x5c, 0x00, 0x08, b'F', b'O', b'O', b'_', 0x01]);
        let root = ns.root();

        let foo = ns.find(root, "FOO_").expect("FOO_ should land under the root");
        assert_eq!(ns.get(foo).parent(), Some(root));
    }

    #[test]
    fn ascend_past_root_fails() {
        // Scope(^^FOO_) at the root has no parent to ascend to.
        let (_, result, diagnostics) = parse(&[0x10, 0x07, 0x5e, 0x5e, b'F', b'O', b'O', b'_']);
        assert_eq!(result, Err(AmlError::Parse));
        assert!(diagnostics.contains("undefined scope"), "{}", diagnostics);
    }

    #[test]
    fn method_with_return() {
        // Method(MAIN, 1) { Return(7) }
        let ns = parse_ok(&[
            0x14, 0x09, b'M', b'A', b'I', b'N', 0x01, 0xa4, 0x0a, 0x07,
        ]);
        let root = ns.root();

        let main = ns.find(root, "MAIN").unwrap();
        let children = match ns.get(main).kind() {
            EntityKind::Method(data) => {
                assert_eq!(data.arg_count, 1);
                assert!(!data.serialized);
                assert_eq!(data.sync_level, 0);
                data.children.clone()
            }
            other => panic!("expected a method, got {:?}", other),
        };

        assert_eq!(children.len(), 1);
        let ret = ns.get(children[0]);
        assert_eq!(ret.opcode(), Opcode::RETURN);
        assert_eq!(const_int(&ns, &ret.args()[0]), 7);
    }

    #[test]
    fn method_flags_decoding() {
        // Method(MTHD, 3, Serialized, SyncLevel 5): flags 0x5b
        let ns = parse_ok(&[0x14, 0x06, b'M', b'T', b'H', b'D', 0x5b]);
        let method = ns.find(ns.root(), "MTHD").unwrap();
        match ns.get(method).kind() {
            EntityKind::Method(data) => {
                assert_eq!(data.arg_count, 3);
                assert!(data.serialized);
                assert_eq!(data.sync_level, 5);
            }
            other => panic!("expected a method, got {:?}", other),
        }
    }

    #[test]
    fn if_else_rewiring() {
        // If(One) { Noop } Else { Noop }
        let ns = parse_ok(&[0xa0, 0x03, 0x01, 0xa3, 0xa1, 0x02, 0xa3]);
        let root = ns.root();
        let children = ns.get(root).children().unwrap();
        assert_eq!(children.len(), PREDEFINED + 1);

        // No free-standing Else survives pass 1.
        for &child in children {
            assert_ne!(ns.get(child).opcode(), Opcode::ELSE);
        }

        let if_id = ns.last_child(root).unwrap();
        let if_entity = ns.get(if_id);
        assert_eq!(if_entity.opcode(), Opcode::IF);
        assert_eq!(if_entity.args().len(), 3);

        assert_eq!(const_int(&ns, &if_entity.args()[0]), 1);

        let then_scope = if_entity.args()[1].as_entity().unwrap();
        assert_eq!(ns.get(then_scope).parent(), Some(root));
        let then_children = ns.get(then_scope).children().unwrap();
        assert_eq!(then_children.len(), 1);
        assert_eq!(ns.get(then_children[0]).opcode(), Opcode::NOOP);

        let else_id = if_entity.args()[2].as_entity().unwrap();
        let else_entity = ns.get(else_id);
        assert_eq!(else_entity.opcode(), Opcode::ELSE);
        let else_scope = else_entity.args()[0].as_entity().unwrap();
        assert_eq!(ns.get(else_scope).children().unwrap().len(), 1);
    }

    #[test]
    fn else_without_if_is_rejected() {
        let (_, result, diagnostics) = parse(&[0xa1, 0x02, 0xa3]);
        assert_eq!(result, Err(AmlError::Parse));
        assert!(
            diagnostics.contains("else block without a matching if block"),
            "{}",
            diagnostics
        );
    }

    #[test]
    fn invocation_with_known_arity() {
        // Method(MAIN, 2) {}  MAIN(5, 7)
        let ns = parse_ok(&[
            0x14, 0x06, b'M', b'A', b'I', b'N', 0x02, b'M', b'A', b'I', b'N', 0x0a, 0x05, 0x0a,
            0x07,
        ]);
        let root = ns.root();
        let main = ns.find(root, "MAIN").unwrap();

        let invocation = ns.last_child(root).unwrap();
        match ns.get(invocation).kind() {
            EntityKind::MethodInvocation(data) => assert_eq!(data.method, main),
            other => panic!("expected an invocation, got {:?}", other),
        }
        let args = ns.get(invocation).args();
        assert_eq!(args.len(), 2);
        assert_eq!(const_int(&ns, &args[0]), 5);
        assert_eq!(const_int(&ns, &args[1]), 7);
    }

    #[test]
    fn zero_arg_invocation_consumes_nothing() {
        // Method(NULL, 0) {}  NULL  Noop
        let ns = parse_ok(&[
            0x14, 0x06, b'N', b'U', b'L', b'L', 0x00, 0x4e, 0x55, 0x4c, 0x4c, 0xa3,
        ]);
        let root = ns.root();
        let children = ns.get(root).children().unwrap();
        assert_eq!(children.len(), PREDEFINED + 3);

        let noop = children[children.len() - 1];
        assert_eq!(ns.get(noop).opcode(), Opcode::NOOP);

        let invocation = children[children.len() - 2];
        match ns.get(invocation).kind() {
            EntityKind::MethodInvocation(_) => {}
            other => panic!("expected an invocation, got {:?}", other),
        }
        assert!(ns.get(invocation).args().is_empty());
    }

    #[test]
    fn invocation_argument_mismatch() {
        // Method(MAIN, 2) {}  MAIN(5) <eof>
        let (_, result, diagnostics) = parse(&[
            0x14, 0x06, b'M', b'A', b'I', b'N', 0x02, b'M', b'A', b'I', b'N', 0x0a, 0x05,
        ]);
        assert_eq!(result, Err(AmlError::Parse));
        assert!(
            diagnostics.contains("argument mismatch (exp: 2, got 1)"),
            "{}",
            diagnostics
        );
    }

    #[test]
    fn unresolved_forward_reference() {
        // A bare name that never gets defined must fail pass 2.
        let (_, result, diagnostics) = parse(&[b'M', b'A', b'I', b'N']);
        assert_eq!(result, Err(AmlError::Resolve));
        assert!(
            diagnostics.contains("could not resolve referenced symbol: MAIN"),
            "{}",
            diagnostics
        );
    }

    #[test]
    fn forward_reference_resolves() {
        // FOO_ is referenced before Name(FOO_, 1) defines it.
        let ns = parse_ok(&[b'F', b'O', b'O', b'_', 0x08, b'F', b'O', b'O', b'_', 0x01]);
        let root = ns.root();
        let target = ns.find(root, "FOO_").unwrap();

        let children = ns.get(root).children().unwrap();
        let reference = children[children.len() - 2];
        match ns.get(reference).kind() {
            EntityKind::NamedReference(data) => {
                assert_eq!(data.target_name, "FOO_");
                assert_eq!(data.target, Some(target));
            }
            other => panic!("expected a name reference, got {:?}", other),
        }
    }

    #[test]
    fn store_to_local() {
        // Store(0x2A, Local0)
        let ns = parse_ok(&[0x70, 0x0a, 0x2a, 0x60]);
        let store = ns.last_child(ns.root()).unwrap();
        let args = ns.get(store).args();
        assert_eq!(args.len(), 2);
        assert_eq!(const_int(&ns, &args[0]), 0x2a);

        let local = args[1].as_entity().unwrap();
        assert_eq!(ns.get(local).opcode(), Opcode::LOCAL0);
    }

    #[test]
    fn add_with_null_target() {
        // Add(One, 2, <null>)
        let ns = parse_ok(&[0x72, 0x01, 0x0a, 0x02, 0x00]);
        let add = ns.last_child(ns.root()).unwrap();
        let args = ns.get(add).args();
        assert_eq!(args.len(), 3);

        let target = args[2].as_entity().unwrap();
        assert_eq!(
            ns.get(target).const_value(),
            Some(&ConstValue::Str(String::new()))
        );
    }

    #[test]
    fn string_literal_argument() {
        // Name(STR0, "AB")
        let ns = parse_ok(&[0x08, b'S', b'T', b'R', b'0', 0x0d, 0x41, 0x42, 0x00]);
        let name = ns.find(ns.root(), "STR0").unwrap();
        let value = name_arg_const(&ns, name);
        assert_eq!(value, ConstValue::Str("AB".to_owned()));
    }

    fn name_arg_const(ns: &Namespace, name: EntityId) -> ConstValue {
        let arg = ns.get(name).args()[0].as_entity().unwrap();
        ns.get(arg).const_value().cloned().unwrap()
    }

    #[test]
    fn buffer_pkg_length_widths() {
        // The same Buffer(3) { 0xAA, 0xBB } encoded with 1..4 PkgLength bytes.
        let encodings: [&[u8]; 4] = [
            &[0x11, 0x05, 0x0a, 0x03, 0xaa, 0xbb],
            &[0x11, 0x46, 0x00, 0x0a, 0x03, 0xaa, 0xbb],
            &[0x11, 0x87, 0x00, 0x00, 0x0a, 0x03, 0xaa, 0xbb],
            &[0x11, 0xc8, 0x00, 0x00, 0x00, 0x0a, 0x03, 0xaa, 0xbb],
        ];

        for (index, aml) in encodings.iter().enumerate() {
            let ns = parse_ok(aml);
            let buffer = ns.last_child(ns.root()).unwrap();
            match ns.get(buffer).kind() {
                EntityKind::Buffer(data) => {
                    let size = data.size.clone().expect("buffer size should be parsed");
                    assert_eq!(const_int(&ns, &size), 3, "encoding {}", index);
                    assert_eq!(data.data, vec![0xaa, 0xbb], "encoding {}", index);
                }
                other => panic!("expected a buffer, got {:?}", other),
            }
        }
    }

    const REGN: [u8; 11] = [
        // OperationRegion(REGN, SystemMemory, 0, 0x10)
        0x5b, 0x80, b'R', b'E', b'G', b'N', 0x00, 0x0a, 0x00, 0x0a, 0x10,
    ];

    #[test]
    fn field_units_bound_to_region() {
        // Field(REGN, AnyAcc) { TEMP, 8, FAN_, 8 }
        let mut aml = REGN.to_vec();
        aml.extend_from_slice(&[
            0x5b, 0x81, 0x10, b'R', b'E', b'G', b'N', 0x00, b'T', b'E', b'M', b'P', 0x08, b'F',
            b'A', b'N', b'_', 0x08,
        ]);
        let ns = parse_ok(&aml);
        let root = ns.root();
        let region = ns.find(root, "REGN").unwrap();
        assert!(matches!(ns.get(region).kind(), EntityKind::Region));

        for (name, expected_offset) in [("TEMP", 0), ("FAN_", 8)] {
            let unit = ns.find(root, name).unwrap();
            match ns.get(unit).kind() {
                EntityKind::FieldUnit(data) => {
                    assert_eq!(data.field.bit_offset, expected_offset, "{}", name);
                    assert_eq!(data.field.bit_width, 8, "{}", name);
                    assert_eq!(data.field.access_type, FieldAccessType::Any);
                    assert_eq!(data.field.update_rule, FieldUpdateRule::Preserve);
                    assert!(!data.field.lock);
                    assert_eq!(data.region_name, "REGN");
                    assert_eq!(data.region, Some(region), "{}", name);
                }
                other => panic!("expected a field unit, got {:?}", other),
            }
        }
    }

    #[test]
    fn field_list_with_offset_and_flags() {
        // Field(REGN, ByteAcc | Lock | WriteAsOnes) { Offset(2), TEMP, 4 }
        let mut aml = REGN.to_vec();
        aml.extend_from_slice(&[
            0x5b, 0x81, 0x0d, b'R', b'E', b'G', b'N', 0x31, 0x00, 0x10, b'T', b'E', b'M', b'P',
            0x04,
        ]);
        let ns = parse_ok(&aml);

        let unit = ns.find(ns.root(), "TEMP").unwrap();
        match ns.get(unit).kind() {
            EntityKind::FieldUnit(data) => {
                assert_eq!(data.field.bit_offset, 16);
                assert_eq!(data.field.bit_width, 4);
                assert_eq!(data.field.access_type, FieldAccessType::Byte);
                assert_eq!(data.field.update_rule, FieldUpdateRule::WriteAsOnes);
                assert!(data.field.lock);
            }
            other => panic!("expected a field unit, got {:?}", other),
        }
    }

    #[test]
    fn empty_field_list() {
        let mut aml = REGN.to_vec();
        aml.extend_from_slice(&[0x5b, 0x81, 0x06, b'R', b'E', b'G', b'N', 0x00]);
        let ns = parse_ok(&aml);
        // Just the region and the field statement itself, no units.
        assert_eq!(
            ns.get(ns.root()).children().unwrap().len(),
            PREDEFINED + 2
        );
    }

    #[test]
    fn field_list_pkg_length_mismatch() {
        let mut aml = REGN.to_vec();
        aml.extend_from_slice(&[
            0x5b, 0x81, 0x0a, b'R', b'E', b'G', b'N', 0x00, b'T', b'E', b'M', b'P', 0x08,
        ]);
        let (_, result, _) = parse(&aml);
        assert_eq!(result, Err(AmlError::Parse));
    }

    #[test]
    fn index_field_resolution() {
        let mut aml = REGN.to_vec();
        // Field(REGN, AnyAcc) { IDX_, 8, DAT_, 8 }
        aml.extend_from_slice(&[
            0x5b, 0x81, 0x10, b'R', b'E', b'G', b'N', 0x00, b'I', b'D', b'X', b'_', 0x08, b'D',
            b'A', b'T', b'_', 0x08,
        ]);
        // IndexField(IDX_, DAT_, AnyAcc) { FLD0, 8 }
        aml.extend_from_slice(&[
            0x5b, 0x86, 0x0f, b'I', b'D', b'X', b'_', b'D', b'A', b'T', b'_', 0x00, b'F', b'L',
            b'D', b'0', 0x08,
        ]);
        let ns = parse_ok(&aml);
        let root = ns.root();

        let idx = ns.find(root, "IDX_").unwrap();
        let dat = ns.find(root, "DAT_").unwrap();
        let fld = ns.find(root, "FLD0").unwrap();
        match ns.get(fld).kind() {
            EntityKind::IndexField(data) => {
                assert_eq!(data.index_reg, Some(idx));
                assert_eq!(data.data_reg, Some(dat));
                assert_eq!(data.field.bit_width, 8);
            }
            other => panic!("expected an index field, got {:?}", other),
        }
    }

    #[test]
    fn field_region_must_exist() {
        let (_, result, diagnostics) = parse(&[
            0x5b, 0x81, 0x0b, b'N', b'O', b'P', b'E', 0x00, b'T', b'E', b'M', b'P', 0x08,
        ]);
        assert_eq!(result, Err(AmlError::Resolve));
        assert!(
            diagnostics.contains("[field TEMP] could not resolve referenced region: NOPE"),
            "{}",
            diagnostics
        );
    }

    #[test]
    fn device_method_map() {
        // Device(DEV0) { Method(MTH0, 0) {} Device(DEV1) { Method(MTH1, 0) {} } }
        let ns = parse_ok(&[
            0x5b, 0x82, 0x1a, b'D', b'E', b'V', b'0', 0x14, 0x06, b'M', b'T', b'H', b'0', 0x00,
            0x5b, 0x82, 0x0c, b'D', b'E', b'V', b'1', 0x14, 0x06, b'M', b'T', b'H', b'1', 0x00,
        ]);
        let root = ns.root();

        let outer = ns.find(root, "DEV0").unwrap();
        match ns.get(outer).kind() {
            EntityKind::Device(data) => {
                assert!(data.method_map.contains_key("MTH0"));
                // Methods of nested devices stay in the nested device's index.
                assert!(!data.method_map.contains_key("MTH1"));
            }
            other => panic!("expected a device, got {:?}", other),
        }

        let inner = ns.find(outer, "DEV1").unwrap();
        match ns.get(inner).kind() {
            EntityKind::Device(data) => {
                assert!(data.method_map.contains_key("MTH1"));
                assert!(!data.method_map.contains_key("MTH0"));
            }
            other => panic!("expected a device, got {:?}", other),
        }
    }

    #[test]
    fn processor_scope_reentry() {
        // Processor(CPU0, 1, 0x120, 6) {}  Scope(CPU0) { Name(FOO_, 1) }
        let ns = parse_ok(&[
            0x5b, 0x83, 0x0b, b'C', b'P', b'U', b'0', 0x01, 0x20, 0x01, 0x00, 0x00, 0x06, 0x10,
            0x0b, b'C', b'P', b'U', b'0', 0x08, b'F', b'O', b'O', b'_', 0x01,
        ]);
        let root = ns.root();

        let cpu = ns.find(root, "CPU0").unwrap();
        assert_eq!(ns.get(cpu).opcode(), Opcode::PROCESSOR);
        assert_eq!(
            ns.get(cpu).args(),
            &[Arg::Int(1), Arg::Int(0x120), Arg::Int(6)]
        );

        let foo = ns.find(cpu, "FOO_").unwrap();
        assert_eq!(ns.get(foo).parent(), Some(cpu));
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        // 0xf5 is unmapped and no valid NameString starts with it.
        let (_, result, diagnostics) = parse(&[0xf5]);
        assert_eq!(result, Err(AmlError::Parse));
        assert!(
            diagnostics.contains("error parsing AML bytecode"),
            "{}",
            diagnostics
        );
    }

    #[test]
    fn tree_invariant_after_full_parse() {
        let mut aml = REGN.to_vec();
        aml.extend_from_slice(&[
            // Device(DEV0) { Method(MTH0, 1) { Store(Arg0, Local0) } }
            0x5b, 0x82, 0x0f, b'D', b'E', b'V', b'0', 0x14, 0x09, b'M', b'T', b'H', b'0', 0x01,
            0x70, 0x68, 0x60,
        ]);
        let ns = parse_ok(&aml);
        check_tree_invariant(&ns, ns.root());
    }
}
