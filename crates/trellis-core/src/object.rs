//! Object storage and secondary indices.
//!
//! [`ObjectRegistry`] is the arena behind a [`Runtime`](crate::Runtime): it
//! owns every live object instance together with its [`ObjectRecord`], and
//! keeps the alias, unique-name, parent/child and creator indices consistent.
//!
//! The registry never calls into objects. Operations that invoke object
//! callbacks (theme application, container hooks, teardown) live on the
//! runtime, which lends instances out of their slots while they run; see
//! [`ObjectRegistry::take_instance`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::capability::{Capabilities, Capability, Object};
use crate::error::{RegistryError, RegistryResult};
use crate::kind::ObjectKind;
use crate::uid::{Uid, UidAllocator};

/// Bookkeeping the registry holds for each live object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    id: Uid,
    kind: ObjectKind,
    alias: Option<String>,
    unique_name: Option<String>,
    parent: Option<Uid>,
    children: Vec<Uid>,
    creator: Uid,
    capabilities: Capabilities,
}

impl ObjectRecord {
    fn new(id: Uid, kind: ObjectKind, creator: Uid, capabilities: Capabilities) -> Self {
        Self {
            id,
            kind,
            alias: None,
            unique_name: None,
            parent: None,
            children: Vec::new(),
            creator,
            capabilities,
        }
    }

    /// The object's identifier.
    pub fn id(&self) -> Uid {
        self.id
    }

    /// The object's kind.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The alias used to match snapshot records, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The globally unique name, if any.
    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    /// The containing object, if any.
    pub fn parent(&self) -> Option<Uid> {
        self.parent
    }

    /// Contained objects, in insertion order.
    pub fn children(&self) -> &[Uid] {
        &self.children
    }

    /// The object that created this one, or [`Uid::INVALID`].
    pub fn creator(&self) -> Uid {
        self.creator
    }

    /// Capabilities probed at creation.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Shorthand for `capabilities().contains(capability)`.
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

struct Slot {
    record: ObjectRecord,
    /// `None` while the instance is lent out to a running callback.
    instance: Option<Box<dyn Object>>,
}

/// What [`ObjectRegistry::remove`] hands back.
pub struct Removed {
    /// The record as it was just before removal. `parent` still names the
    /// former parent; `children` lists the objects that were orphaned.
    pub record: ObjectRecord,
    /// The instance, or `None` if it is currently lent out.
    pub instance: Option<Box<dyn Object>>,
}

#[derive(Clone, Copy)]
enum NameIndex {
    Alias,
    UniqueName,
}

/// Arena of live objects keyed by [`Uid`].
///
/// Iteration order is ascending UID order, which is also creation order.
pub struct ObjectRegistry {
    allocator: UidAllocator,
    slots: BTreeMap<Uid, Slot>,
    aliases: HashMap<String, Uid>,
    unique_names: HashMap<String, Uid>,
    created_by: HashMap<Uid, BTreeSet<Uid>>,
}

impl ObjectRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            allocator: UidAllocator::new(),
            slots: BTreeMap::new(),
            aliases: HashMap::new(),
            unique_names: HashMap::new(),
            created_by: HashMap::new(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reserve the identifier for an object about to be created by `creator`.
    ///
    /// Fails with [`RegistryError::UnknownCreator`] if `creator` is neither
    /// [`Uid::INVALID`] nor live. No identifier is consumed on failure.
    pub fn reserve(&mut self, creator: Uid) -> RegistryResult<Uid> {
        if creator.is_valid() && !self.contains(creator) {
            return Err(RegistryError::UnknownCreator(creator));
        }
        Ok(self.allocator.allocate())
    }

    /// Store a freshly constructed object under an identifier obtained from
    /// [`reserve`](Self::reserve).
    pub fn insert(
        &mut self,
        id: Uid,
        creator: Uid,
        instance: Box<dyn Object>,
        capabilities: Capabilities,
    ) {
        let record = ObjectRecord::new(id, instance.kind(), creator, capabilities);
        if creator.is_valid() {
            self.created_by.entry(creator).or_default().insert(id);
        }
        self.slots.insert(
            id,
            Slot {
                record,
                instance: Some(instance),
            },
        );
    }

    /// Remove an object from every index.
    ///
    /// The object is detached from its parent and its children become roots.
    /// It is dropped from its creator's created set, and the set goes once it
    /// is empty. Live objects it created itself stay recorded under its id
    /// until they are removed or [`forget_creator`](Self::forget_creator)
    /// runs.
    pub fn remove(&mut self, id: Uid) -> Option<Removed> {
        let slot = self.slots.remove(&id)?;
        let record = &slot.record;

        if let Some(alias) = &record.alias {
            self.aliases.remove(alias);
        }
        if let Some(name) = &record.unique_name {
            self.unique_names.remove(name);
        }
        if let Some(parent) = record.parent
            && let Some(parent_slot) = self.slots.get_mut(&parent)
        {
            parent_slot.record.children.retain(|&c| c != id);
        }
        for child in &record.children {
            if let Some(child_slot) = self.slots.get_mut(child) {
                child_slot.record.parent = None;
            }
        }
        if let Some(created) = self.created_by.get_mut(&record.creator) {
            created.remove(&id);
            if created.is_empty() {
                self.created_by.remove(&record.creator);
            }
        }

        Some(Removed {
            record: slot.record,
            instance: slot.instance,
        })
    }

    /// Check if an object is live.
    pub fn contains(&self, id: Uid) -> bool {
        self.slots.contains_key(&id)
    }

    /// Get the record of a live object.
    pub fn record(&self, id: Uid) -> Option<&ObjectRecord> {
        self.slots.get(&id).map(|s| &s.record)
    }

    /// Get the number of live objects.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no object is live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of all live identifiers, ascending.
    pub fn ids(&self) -> Vec<Uid> {
        self.slots.keys().copied().collect()
    }

    /// Snapshot of the live identifiers carrying `capability`, ascending.
    pub fn ids_with(&self, capability: Capability) -> Vec<Uid> {
        self.slots
            .values()
            .filter(|s| s.record.has(capability))
            .map(|s| s.record.id)
            .collect()
    }

    /// Live objects without a parent, ascending.
    pub fn roots(&self) -> Vec<Uid> {
        self.slots
            .values()
            .filter(|s| s.record.parent.is_none())
            .map(|s| s.record.id)
            .collect()
    }

    /// The identifier the next [`reserve`](Self::reserve) will hand out.
    pub fn next_uid(&self) -> Uid {
        self.allocator.peek()
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Borrow an instance. `None` if the object is not live or is lent out.
    pub fn instance(&self, id: Uid) -> Option<&dyn Object> {
        self.slots.get(&id)?.instance.as_deref()
    }

    /// Mutably borrow an instance. `None` if the object is not live or is
    /// lent out.
    pub fn instance_mut(&mut self, id: Uid) -> Option<&mut (dyn Object + 'static)> {
        self.slots.get_mut(&id)?.instance.as_deref_mut()
    }

    /// Move an instance out of its slot so a callback can run on it while the
    /// registry stays mutable. The record stays in place.
    ///
    /// Returns `None` if the object is not live or is already lent out.
    pub fn take_instance(&mut self, id: Uid) -> Option<Box<dyn Object>> {
        self.slots.get_mut(&id)?.instance.take()
    }

    /// Put a lent instance back.
    ///
    /// If the object was removed while lent, the instance is handed back as
    /// `Err` so the caller can run its teardown.
    pub fn return_instance(
        &mut self,
        id: Uid,
        instance: Box<dyn Object>,
    ) -> Result<(), Box<dyn Object>> {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.instance = Some(instance);
                Ok(())
            }
            None => Err(instance),
        }
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Set or clear (empty string) the alias of an object.
    pub fn set_alias(&mut self, id: Uid, alias: &str) -> RegistryResult<()> {
        self.set_name(NameIndex::Alias, id, alias)
    }

    /// Set or clear (empty string) the unique name of an object.
    pub fn set_unique_name(&mut self, id: Uid, name: &str) -> RegistryResult<()> {
        self.set_name(NameIndex::UniqueName, id, name)
    }

    fn set_name(&mut self, which: NameIndex, id: Uid, name: &str) -> RegistryResult<()> {
        let (index, slot) = match which {
            NameIndex::Alias => (&mut self.aliases, self.slots.get_mut(&id)),
            NameIndex::UniqueName => (&mut self.unique_names, self.slots.get_mut(&id)),
        };
        let slot = slot.ok_or(RegistryError::InvalidId(id))?;

        if !name.is_empty()
            && let Some(&holder) = index.get(name)
            && holder != id
        {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
                holder,
            });
        }

        let field = match which {
            NameIndex::Alias => &mut slot.record.alias,
            NameIndex::UniqueName => &mut slot.record.unique_name,
        };
        if let Some(old) = field.take() {
            index.remove(&old);
        }
        if !name.is_empty() {
            index.insert(name.to_string(), id);
            *field = Some(name.to_string());
        }
        Ok(())
    }

    /// Find the live object holding `alias`.
    pub fn by_alias(&self, alias: &str) -> Option<Uid> {
        self.aliases.get(alias).copied()
    }

    /// Find the live object holding the unique name `name`.
    pub fn by_unique_name(&self, name: &str) -> Option<Uid> {
        self.unique_names.get(name).copied()
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Set the parent of an object and return the previous one.
    ///
    /// The new parent must be a live Container that is neither `id` nor one of
    /// its descendants. Passing `None` makes the object a root. Re-setting the
    /// current parent changes nothing.
    pub fn set_parent(&mut self, id: Uid, new_parent: Option<Uid>) -> RegistryResult<Option<Uid>> {
        let old_parent = self.parent(id)?;

        if let Some(parent) = new_parent {
            let parent_record = self.record(parent).ok_or(RegistryError::InvalidId(parent))?;
            if !parent_record.has(Capability::Container) {
                return Err(RegistryError::NotContainer(parent));
            }
            if self.is_ancestor_of(id, parent) {
                return Err(RegistryError::CircularParentage { child: id, parent });
            }
        }

        if old_parent == new_parent {
            return Ok(old_parent);
        }

        if let Some(old) = old_parent
            && let Some(slot) = self.slots.get_mut(&old)
        {
            slot.record.children.retain(|&c| c != id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.record.parent = new_parent;
        }
        if let Some(parent) = new_parent
            && let Some(slot) = self.slots.get_mut(&parent)
        {
            slot.record.children.push(id);
        }

        Ok(old_parent)
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    fn is_ancestor_of(&self, potential_ancestor: Uid, id: Uid) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.record(current_id).and_then(|r| r.parent);
        }
        false
    }

    /// Get the parent of an object.
    pub fn parent(&self, id: Uid) -> RegistryResult<Option<Uid>> {
        self.record(id)
            .map(|r| r.parent)
            .ok_or(RegistryError::InvalidId(id))
    }

    /// Get the children of an object.
    pub fn children(&self, id: Uid) -> RegistryResult<&[Uid]> {
        self.record(id)
            .map(|r| r.children.as_slice())
            .ok_or(RegistryError::InvalidId(id))
    }

    /// Returns true if the object has at least one live child.
    pub fn has_live_children(&self, id: Uid) -> bool {
        self.record(id)
            .is_some_and(|r| r.children.iter().any(|c| self.contains(*c)))
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Live objects created by `creator`, ascending.
    ///
    /// `creator` need not be live itself.
    pub fn created_by(&self, creator: Uid) -> Vec<Uid> {
        self.created_by
            .get(&creator)
            .map(|set| set.iter().copied().filter(|id| self.contains(*id)).collect())
            .unwrap_or_default()
    }

    /// The creator of a live object.
    pub fn creator_of(&self, id: Uid) -> RegistryResult<Uid> {
        self.record(id)
            .map(|r| r.creator)
            .ok_or(RegistryError::InvalidId(id))
    }

    /// Drop the ownership record of `creator`.
    pub fn forget_creator(&mut self, creator: Uid) {
        self.created_by.remove(&creator);
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("live", &self.slots.len())
            .field("next_uid", &self.allocator.peek())
            .field("aliases", &self.aliases.len())
            .field("unique_names", &self.unique_names.len())
            .finish()
    }
}
