// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Object heap for Tova values.
//!
//! A slotted arena: every heap object lives in one slot and is addressed
//! by an [`ObjRef`] handle, so handle equality is object identity. Freed
//! slots go onto a free list and are reused by later allocations.
//!
//! The heap also owns the string interner. Interning runs content lookup
//! before allocating, so each distinct string exists at most once and
//! string equality reduces to handle equality. The interner holds its
//! strings weakly: the sweep phase tombstones entries whose string died.
//!
//! Collection is mark-sweep. The caller supplies the roots (value stack,
//! frame closures, globals, open upvalues); the heap traces the object
//! graph from there and frees everything unmarked.


use crate::table::{Table, hash_str};
use crate::value::{HeapObj, ObjClosure, ObjFunction, ObjNative, ObjString, ObjUpvalue, UpvalueState};
use crate::value::{ObjRef, Value};

/// First collection threshold in (approximate) bytes.
const FIRST_GC_THRESHOLD: usize = 1024 * 1024;

/// Threshold growth factor after each collection.
const GC_GROWTH_FACTOR: usize = 2;

/// Arena of heap objects with interning and mark-sweep collection.
#[derive(Debug)]
pub struct Heap {
    /// Object slots; `None` is a freed slot awaiting reuse.
    objects: Vec<Option<HeapObj>>,
    /// Mark bits, parallel to `objects` during collection.
    marks: Vec<bool>,
    /// Freed slot indices available for reuse.
    free: Vec<u32>,
    /// String interner (a weak set; values are unused).
    strings: Table,
    /// Approximate live byte count.
    bytes_allocated: usize,
    /// Allocation level that triggers the next collection.
    next_gc: usize,
}

impl Heap {
    /// Create an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            marks: Vec::new(),
            free: Vec::new(),
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: FIRST_GC_THRESHOLD,
        }
    }

    /// Register a new object and return its handle.
    pub fn alloc(&mut self, obj: HeapObj) -> ObjRef {
        self.bytes_allocated += obj_size(&obj);
        if let Some(index) = self.free.pop() {
            self.objects[index as usize] = Some(obj);
            ObjRef::new(index)
        } else {
            self.objects.push(Some(obj));
            ObjRef::new((self.objects.len() - 1) as u32)
        }
    }

    /// Intern a string, returning the canonical handle for its content.
    pub fn intern(&mut self, s: &str) -> ObjRef {
        let hash = hash_str(s);
        let objects = &self.objects;
        let existing = self.strings.find_key(hash, |k| {
            matches!(
                objects[k.index()].as_ref(),
                Some(HeapObj::String(st)) if &*st.chars == s
            )
        });
        if let Some(found) = existing {
            return found;
        }

        let reference = self.alloc(HeapObj::String(ObjString {
            chars: s.into(),
            hash,
        }));
        self.strings.set(reference, hash, Value::Nil);
        reference
    }

    /// Read an object slot.
    #[inline]
    #[must_use]
    pub fn get(&self, r: ObjRef) -> Option<&HeapObj> {
        self.objects.get(r.index())?.as_ref()
    }

    /// Read a string object.
    #[must_use]
    pub fn string(&self, r: ObjRef) -> Option<&ObjString> {
        match self.get(r) {
            Some(HeapObj::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The cached content hash of an interned string.
    #[must_use]
    pub fn string_hash(&self, r: ObjRef) -> Option<u32> {
        self.string(r).map(|s| s.hash)
    }

    /// Read a function object.
    #[must_use]
    pub fn function(&self, r: ObjRef) -> Option<&ObjFunction> {
        match self.get(r) {
            Some(HeapObj::Function(f)) => Some(f),
            _ => None,
        }
    }

    /// Read a closure object.
    #[must_use]
    pub fn closure(&self, r: ObjRef) -> Option<&ObjClosure> {
        match self.get(r) {
            Some(HeapObj::Closure(c)) => Some(c),
            _ => None,
        }
    }

    /// Read a native function object.
    #[must_use]
    pub fn native(&self, r: ObjRef) -> Option<&ObjNative> {
        match self.get(r) {
            Some(HeapObj::Native(n)) => Some(n),
            _ => None,
        }
    }

    /// Read an upvalue object.
    #[must_use]
    pub fn upvalue(&self, r: ObjRef) -> Option<&ObjUpvalue> {
        match self.get(r) {
            Some(HeapObj::Upvalue(u)) => Some(u),
            _ => None,
        }
    }

    /// Mutate an upvalue object.
    #[must_use]
    pub fn upvalue_mut(&mut self, r: ObjRef) -> Option<&mut ObjUpvalue> {
        match self.objects.get_mut(r.index())?.as_mut() {
            Some(HeapObj::Upvalue(u)) => Some(u),
            _ => None,
        }
    }

    /// Whether the handle refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, r: ObjRef) -> bool {
        self.objects.get(r.index()).is_some_and(Option::is_some)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether enough has been allocated to warrant a collection.
    #[inline]
    #[must_use]
    pub const fn should_collect(&self) -> bool {
        self.bytes_allocated > self.next_gc
    }

    /// Mark from the given roots, trace reachable objects, sweep the
    /// rest, and raise the next collection threshold.
    pub fn collect(&mut self, roots: &[Value]) {
        tracing::debug!(
            live = self.object_count(),
            bytes = self.bytes_allocated,
            "gc start"
        );

        self.marks.clear();
        self.marks.resize(self.objects.len(), false);

        let mut gray = Vec::new();
        for &root in roots {
            self.mark_value(&mut gray, root);
        }
        while let Some(r) = gray.pop() {
            for child in self.children(r) {
                self.mark_value(&mut gray, child);
            }
        }

        self.sweep();
        self.next_gc = (self.bytes_allocated * GC_GROWTH_FACTOR).max(FIRST_GC_THRESHOLD);

        tracing::debug!(
            live = self.object_count(),
            bytes = self.bytes_allocated,
            "gc end"
        );
    }

    fn mark_value(&mut self, gray: &mut Vec<ObjRef>, value: Value) {
        if let Value::Obj(r) = value {
            self.mark_object(gray, r);
        }
    }

    fn mark_object(&mut self, gray: &mut Vec<ObjRef>, r: ObjRef) {
        if let Some(mark) = self.marks.get_mut(r.index()) {
            if !*mark {
                *mark = true;
                gray.push(r);
            }
        }
    }

    /// Values directly referenced by an object.
    fn children(&self, r: ObjRef) -> Vec<Value> {
        match self.get(r) {
            Some(HeapObj::Function(f)) => {
                let mut children = f.chunk.constants.clone();
                if let Some(name) = f.name {
                    children.push(Value::Obj(name));
                }
                children
            }
            Some(HeapObj::Closure(c)) => {
                let mut children = vec![Value::Obj(c.function)];
                children.extend(c.upvalues.iter().map(|&u| Value::Obj(u)));
                children
            }
            Some(HeapObj::Upvalue(u)) => match u.state {
                UpvalueState::Closed(v) => vec![v],
                UpvalueState::Open(_) => Vec::new(),
            },
            Some(HeapObj::String(_) | HeapObj::Native(_)) | None => Vec::new(),
        }
    }

    /// Free unmarked slots; drop interner entries for dead strings first
    /// so the weak set never holds a dangling handle.
    fn sweep(&mut self) {
        let marks = &self.marks;
        self.strings
            .retain_keys(|k| marks.get(k.index()).copied().unwrap_or(false));

        for (index, slot) in self.objects.iter_mut().enumerate() {
            if slot.is_some() && !self.marks[index] {
                if let Some(dead) = slot.take() {
                    self.bytes_allocated = self.bytes_allocated.saturating_sub(obj_size(&dead));
                }
                self.free.push(index as u32);
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Approximate retained size of an object, for collection pacing.
fn obj_size(obj: &HeapObj) -> usize {
    let payload = match obj {
        HeapObj::String(s) => s.chars.len(),
        HeapObj::Function(f) => {
            f.chunk.code.len()
                + f.chunk.lines.len() * core::mem::size_of::<u32>()
                + f.chunk.constants.len() * core::mem::size_of::<Value>()
        }
        HeapObj::Closure(c) => c.upvalues.len() * core::mem::size_of::<ObjRef>(),
        HeapObj::Upvalue(_) | HeapObj::Native(_) => 0,
    };
    core::mem::size_of::<HeapObj>() + payload
}
