//! Arena-backed ACPI namespace with path-based lookup.
//!
//! The root is created up front together with the pre-defined scopes
//! (`\_GPE`, `\_PR`, `\_SB`, `\_SI`, `\_TZ`) and the global lock `\_GL`;
//! tables parsed afterwards add to or re-enter these scopes.

use crate::entity::{Arg, Entity, EntityId, EntityKind};
use crate::opcode::Opcode;

pub struct Namespace {
    entities: Vec<Entity>,
    root: EntityId,
}

impl Namespace {
    pub fn new() -> Namespace {
        let mut ns = Namespace {
            entities: Vec::new(),
            root: EntityId::new(0),
        };

        let root = ns.alloc(Entity::scope(Opcode::SCOPE, "\\"));
        ns.root = root;

        for name in ["_GPE", "_PR_", "_SB_", "_SI_", "_TZ_"] {
            let scope = ns.alloc(Entity::scope(Opcode::SCOPE, name));
            ns.append(root, scope);
        }

        let global_lock = ns.alloc(Entity::global_mutex("_GL_"));
        ns.append(root, global_lock);

        ns
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn alloc(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new(self.entities.len());
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    /// Attaches `child` to `scope`, setting the back-reference. Fails when
    /// `scope` does not own a child list.
    pub fn append(&mut self, scope: EntityId, child: EntityId) -> bool {
        if self.entities[scope.index()].children().is_none() {
            return false;
        }
        self.entities[child.index()].set_parent(Some(scope));
        if let Some(children) = self.entities[scope.index()].children_mut() {
            children.push(child);
        }
        true
    }

    /// Detaches and returns the most recently appended child. The child
    /// keeps its parent back-reference so later name lookups still start
    /// from the right scope.
    pub fn remove_last_child(&mut self, scope: EntityId) -> Option<EntityId> {
        self.entities[scope.index()].children_mut()?.pop()
    }

    pub fn last_child(&self, scope: EntityId) -> Option<EntityId> {
        self.entities[scope.index()].children()?.last().copied()
    }

    fn child_by_name(&self, scope: EntityId, name: &str) -> Option<EntityId> {
        let children = self.get(scope).children()?;
        children
            .iter()
            .copied()
            .find(|&child| self.get(child).name() == name)
    }

    /// Consumes the `\` / `^...` prefix of `path`, returning the scope the
    /// remainder is relative to. Ascending past the root fails.
    fn apply_prefix<'p>(&self, start: EntityId, path: &'p str) -> Option<(EntityId, &'p str)> {
        if let Some(rest) = path.strip_prefix('\\') {
            return Some((self.root, rest));
        }

        let mut cur = start;
        let mut rest = path;
        while let Some(stripped) = rest.strip_prefix('^') {
            cur = self.get(cur).parent()?;
            rest = stripped;
        }
        Some((cur, rest))
    }

    /// Finds the entity a name path refers to, starting at `start`.
    ///
    /// A single unprefixed segment searches the start scope and then each
    /// ancestor up to the root, as the AML name-resolution rule requires.
    /// Multi-segment paths walk direct children only.
    pub fn find(&self, start: EntityId, path: &str) -> Option<EntityId> {
        if path.is_empty() {
            return None;
        }

        let (mut cur, rest) = self.apply_prefix(start, path)?;
        if rest.is_empty() {
            return Some(cur);
        }

        if rest.contains('.') {
            for segment in rest.split('.') {
                cur = self.child_by_name(cur, segment)?;
            }
            return Some(cur);
        }

        let mut scope = Some(cur);
        while let Some(id) = scope {
            if let Some(hit) = self.child_by_name(id, rest) {
                return Some(hit);
            }
            scope = self.get(id).parent();
        }
        None
    }

    /// Resolves a path used to *define* a new name: returns the scope the
    /// new entity should be attached to and the final segment to name it.
    pub fn resolve_path(&self, start: EntityId, path: &str) -> Option<(EntityId, String)> {
        if path.is_empty() {
            return None;
        }

        let (mut cur, rest) = self.apply_prefix(start, path)?;
        if rest.is_empty() {
            return None;
        }

        let mut segments: Vec<&str> = rest.split('.').collect();
        let last = segments.pop()?;
        for segment in segments {
            cur = self.child_by_name(cur, segment)?;
        }
        if !self.get(cur).is_scope() {
            return None;
        }
        Some((cur, last.to_owned()))
    }

    /// Depth-first walk over the tree rooted at `start`: the entity itself,
    /// then its argument entities (including buffer sizes and resolved field
    /// connections), then its children. Returning false from the callback
    /// prunes the subtree.
    pub fn visit<F>(&self, start: EntityId, f: &mut F)
    where
        F: FnMut(usize, EntityId) -> bool,
    {
        self.visit_at(0, start, f);
    }

    fn visit_at<F>(&self, depth: usize, id: EntityId, f: &mut F)
    where
        F: FnMut(usize, EntityId) -> bool,
    {
        if !f(depth, id) {
            return;
        }

        let entity = self.get(id);
        for arg in entity.args() {
            if let Arg::Entity(child) = arg {
                self.visit_at(depth + 1, *child, f);
            }
        }

        match entity.kind() {
            EntityKind::Buffer(buffer) => {
                if let Some(Arg::Entity(size)) = buffer.size {
                    self.visit_at(depth + 1, size, f);
                }
            }
            EntityKind::FieldUnit(data) => {
                if let Some(connection) = data.field.resolved_connection {
                    self.visit_at(depth + 1, connection, f);
                }
            }
            EntityKind::IndexField(data) => {
                if let Some(connection) = data.field.resolved_connection {
                    self.visit_at(depth + 1, connection, f);
                }
            }
            _ => {}
        }

        if let Some(children) = entity.children() {
            for child in children {
                self.visit_at(depth + 1, *child, f);
            }
        }
    }
}

impl Default for Namespace {
    fn default() -> Namespace {
        Namespace::new()
    }
}
