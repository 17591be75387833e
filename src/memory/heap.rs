//! Heap object tracking and snapshot freezing
//!
//! This module provides:
//! - [`IdAllocator`]: sequential per-trace object ids, so two runs of the same
//!   program produce identical ids
//! - [`HeapObject`]: the immutable record of one live container in a step
//! - [`Freezer`]: converts runtime values into [`Data`] snapshots and builds
//!   the per-step heap table
//!
//! # Structural Sharing
//!
//! Every container carries a version counter bumped on mutation. The freezer
//! caches the last snapshot of each container together with that version. When
//! a container is frozen again with an unchanged version and all of its nested
//! containers also come back unchanged (same `Arc`), the cached `Arc` is
//! returned instead of a copy. A later mutation bumps the version and produces
//! a fresh snapshot, so steps already recorded never change.
//!
//! # Size Estimates
//!
//! Sizes are platform-independent estimates in bytes:
//! - `list`: 56 + 8 per item
//! - `deque`: 624 + 8 per item
//! - `dict`: 64 + 48 per entry
//! - `set`: 216 + 16 per element

use super::value::{ObjectId, Value};
use crate::snapshot::Data;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hands out container ids in creation order, starting at 1
#[derive(Debug)]
pub struct IdAllocator {
    next: Cell<ObjectId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: Cell::new(1) }
    }

    pub fn next_id(&self) -> ObjectId {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }

    /// Number of ids allocated so far
    pub fn allocated(&self) -> u64 {
        self.next.get() - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One live mutable container as seen by a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapObject {
    pub object_id: ObjectId,
    pub type_name: &'static str,
    pub value: Data,
    pub size: usize,
    /// Ids of containers directly held by this one
    pub references: Vec<ObjectId>,
}

/// Heap table of one step plus its memory estimate
#[derive(Debug, Clone, Default)]
pub struct HeapIndex {
    pub objects: BTreeMap<ObjectId, Arc<HeapObject>>,
    pub memory_usage: usize,
}

/// Estimated size in bytes of a container value
pub fn estimate_size(value: &Value) -> usize {
    match value {
        Value::List(l) if l.is_deque => 624 + 8 * l.len(),
        Value::List(l) => 56 + 8 * l.len(),
        Value::Dict(d) => 64 + 48 * d.len(),
        Value::Set(s) => 216 + 16 * s.len(),
        _ => 0,
    }
}

#[derive(Debug)]
struct CachedSnapshot {
    version: u64,
    data: Data,
    /// Whether any element may itself change without bumping `version`
    has_nested: bool,
}

/// Value → [`Data`] converter with a per-trace snapshot cache
#[derive(Debug)]
pub struct Freezer {
    sharing: bool,
    cache: FxHashMap<ObjectId, CachedSnapshot>,
    objects: FxHashMap<ObjectId, Arc<HeapObject>>,
    in_progress: Vec<ObjectId>,
}

impl Freezer {
    /// `sharing = false` rebuilds every snapshot from scratch
    pub fn new(sharing: bool) -> Self {
        Freezer {
            sharing,
            cache: FxHashMap::default(),
            objects: FxHashMap::default(),
            in_progress: Vec::new(),
        }
    }

    pub fn freeze(&mut self, value: &Value) -> Data {
        match value {
            Value::None => Data::None,
            Value::Bool(b) => Data::Bool(*b),
            Value::Int(n) => Data::Int(*n),
            Value::Float(x) => Data::Float(*x),
            Value::Str(s) => Data::Str(Arc::from(&**s)),
            Value::Tuple(items) => {
                let frozen = items.iter().map(|v| self.freeze(v)).collect();
                Data::Tuple(Arc::new(frozen))
            }
            Value::List(l) => {
                let items = l.to_vec();
                self.freeze_container(l.id, l.version(), &items, "[...]", |children| {
                    Data::List(Arc::new(children))
                })
            }
            Value::Set(s) => {
                let items = s.to_vec();
                self.freeze_container(s.id, s.version(), &items, "{...}", |children| {
                    Data::Set(Arc::new(children))
                })
            }
            Value::Dict(d) => {
                // Keys and values interleaved; re-paired by the wrapper
                let flat: Vec<Value> = d
                    .pairs()
                    .into_iter()
                    .flat_map(|(k, v)| [k, v])
                    .collect();
                self.freeze_container(d.id, d.version(), &flat, "{...}", |children| {
                    let mut pairs = Vec::with_capacity(children.len() / 2);
                    let mut iter = children.into_iter();
                    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                        pairs.push((k, v));
                    }
                    Data::Dict(Arc::new(pairs))
                })
            }
            Value::Range(_) | Value::Function(_) | Value::Builtin(_) | Value::Module(_) => {
                Data::Repr(Arc::from(value.repr()))
            }
        }
    }

    fn freeze_container(
        &mut self,
        id: ObjectId,
        version: u64,
        children: &[Value],
        cycle_marker: &str,
        wrap: impl FnOnce(Vec<Data>) -> Data,
    ) -> Data {
        if self.in_progress.contains(&id) {
            return Data::Repr(Arc::from(cycle_marker));
        }

        if self.sharing {
            if let Some(cached) = self.cache.get(&id) {
                if cached.version == version && !cached.has_nested {
                    return cached.data.clone();
                }
            }
        }

        self.in_progress.push(id);
        let frozen: Vec<Data> = children.iter().map(|v| self.freeze(v)).collect();
        self.in_progress.pop();

        let has_nested = children
            .iter()
            .any(|v| matches!(v, Value::List(_) | Value::Dict(_) | Value::Set(_) | Value::Tuple(_)));

        if self.sharing {
            if let Some(cached) = self.cache.get(&id) {
                if cached.version == version && same_children(&cached.data, &frozen) {
                    return cached.data.clone();
                }
            }
        }

        let data = wrap(frozen);
        if self.sharing {
            self.cache.insert(
                id,
                CachedSnapshot {
                    version,
                    data: data.clone(),
                    has_nested,
                },
            );
        }
        data
    }

    /// Build the heap table of every container reachable from `roots`.
    ///
    /// With `capture = false` only the memory estimate is computed.
    pub fn heap_index<'a>(
        &mut self,
        roots: impl IntoIterator<Item = &'a Value>,
        capture: bool,
    ) -> HeapIndex {
        let mut index = HeapIndex::default();
        let mut seen: FxHashSet<ObjectId> = FxHashSet::default();
        let mut pending: Vec<Value> = roots.into_iter().cloned().collect();

        while let Some(value) = pending.pop() {
            let Some(id) = value.object_id() else {
                if let Value::Tuple(items) = &value {
                    pending.extend(items.iter().cloned());
                }
                continue;
            };
            if !seen.insert(id) {
                continue;
            }

            let children: Vec<Value> = match &value {
                Value::List(l) => l.to_vec(),
                Value::Dict(d) => d.values(),
                Value::Set(s) => s.to_vec(),
                _ => Vec::new(),
            };
            let size = estimate_size(&value);
            index.memory_usage += size;

            if capture {
                let mut references = Vec::new();
                collect_references(&children, &mut references);
                let data = self.freeze(&value);
                let object = self.heap_object(id, &value, data, size, references);
                index.objects.insert(id, object);
            }

            pending.extend(children);
        }

        index
    }

    fn heap_object(
        &mut self,
        id: ObjectId,
        value: &Value,
        data: Data,
        size: usize,
        references: Vec<ObjectId>,
    ) -> Arc<HeapObject> {
        if self.sharing {
            if let Some(cached) = self.objects.get(&id) {
                if cached.value.ptr_eq(&data)
                    && cached.size == size
                    && cached.references == references
                {
                    return Arc::clone(cached);
                }
            }
        }

        let type_name = match value {
            Value::List(l) if l.is_deque => "deque",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            _ => "object",
        };
        let object = Arc::new(HeapObject {
            object_id: id,
            type_name,
            value: data,
            size,
            references,
        });
        if self.sharing {
            self.objects.insert(id, Arc::clone(&object));
        }
        object
    }
}

fn collect_references(children: &[Value], out: &mut Vec<ObjectId>) {
    for child in children {
        match child {
            Value::Tuple(items) => collect_references(items, out),
            other => {
                if let Some(id) = other.object_id() {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
    }
}

fn same_children(previous: &Data, frozen: &[Data]) -> bool {
    match previous {
        Data::List(items) | Data::Set(items) => {
            items.len() == frozen.len() && items.iter().zip(frozen).all(|(a, b)| a.ptr_eq(b))
        }
        Data::Dict(pairs) => {
            pairs.len() * 2 == frozen.len()
                && pairs
                    .iter()
                    .zip(frozen.chunks(2))
                    .all(|((k, v), chunk)| k.ptr_eq(&chunk[0]) && v.ptr_eq(&chunk[1]))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::ListObject;
    use std::rc::Rc;

    fn list(id: ObjectId, items: Vec<Value>) -> Rc<ListObject> {
        Rc::new(ListObject::new(id, items, false))
    }

    #[test]
    fn test_ids_are_sequential() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_unchanged_list_is_shared() {
        let mut freezer = Freezer::new(true);
        let l = list(1, vec![Value::Int(1), Value::Int(2)]);
        let a = freezer.freeze(&Value::List(l.clone()));
        let b = freezer.freeze(&Value::List(l.clone()));
        assert!(a.ptr_eq(&b));

        l.update(|items| items[0] = Value::Int(9));
        let c = freezer.freeze(&Value::List(l));
        assert!(!a.ptr_eq(&c));
        // The earlier snapshot is untouched
        assert_eq!(a, Data::list(vec![Data::Int(1), Data::Int(2)]));
        assert_eq!(c, Data::list(vec![Data::Int(9), Data::Int(2)]));
    }

    #[test]
    fn test_nested_mutation_refreshes_parent() {
        let mut freezer = Freezer::new(true);
        let inner = list(2, vec![Value::Int(0)]);
        let outer = list(1, vec![Value::List(inner.clone())]);
        let before = freezer.freeze(&Value::List(outer.clone()));
        inner.update(|items| items.push(Value::Int(1)));
        let after = freezer.freeze(&Value::List(outer));
        assert_eq!(before.to_string(), "[[0]]");
        assert_eq!(after.to_string(), "[[0, 1]]");
    }

    #[test]
    fn test_sharing_disabled_rebuilds() {
        let mut freezer = Freezer::new(false);
        let l = list(1, vec![Value::Int(1)]);
        let a = freezer.freeze(&Value::List(l.clone()));
        let b = freezer.freeze(&Value::List(l));
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_cycle_is_marked() {
        let mut freezer = Freezer::new(true);
        let l = list(1, Vec::new());
        l.update(|items| items.push(Value::List(l.clone())));
        let data = freezer.freeze(&Value::List(l.clone()));
        assert_eq!(data.to_string(), "[[...]]");
        l.update(|items| items.clear());
    }

    #[test]
    fn test_heap_index_references_and_size() {
        let mut freezer = Freezer::new(true);
        let inner = list(2, vec![Value::Int(0)]);
        let outer = list(1, vec![Value::List(inner), Value::Int(5)]);
        let root = Value::List(outer);
        let index = freezer.heap_index([&root], true);
        assert_eq!(index.objects.len(), 2);
        assert_eq!(index.objects[&1].references, vec![2]);
        assert_eq!(index.objects[&1].type_name, "list");
        assert_eq!(index.memory_usage, (56 + 16) + (56 + 8));

        let again = freezer.heap_index([&root], true);
        assert!(Arc::ptr_eq(&index.objects[&1], &again.objects[&1]));
    }
}
