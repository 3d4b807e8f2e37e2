//! Value lattices and keyed fact maps (spec §3 "Value lattice", "CPFact",
//! "SetFact<T>").

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::ir::VarId;

/// The three-point constant-propagation lattice: UNDEF ⊑ CONST(c) ⊑ NAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Undef,
    Const(i32),
    Nac,
}

impl Value {
    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn is_nac(&self) -> bool {
        matches!(self, Value::Nac)
    }

    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// `meetValue` (spec §8 "Lattice soundness").
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Undef, v) | (v, Value::Undef) => v,
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Const(a), Value::Const(b)) => {
                if a == b {
                    Value::Const(a)
                } else {
                    Value::Nac
                }
            }
        }
    }
}

/// A mapping from variable to [`Value`]; a missing key is UNDEF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CPFact {
    map: HashMap<VarId, Value>,
}

impl CPFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: VarId) -> Value {
        self.map.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Sets `var`'s value, returning whether it actually changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        let changed = self.get(var) != value;
        if value.is_undef() {
            self.map.remove(&var);
        } else {
            self.map.insert(var, value);
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, Value)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }

    /// Pointwise join of `other` into `self`; returns whether `self` changed.
    pub fn meet_into(&mut self, other: &CPFact) -> bool {
        let mut changed = false;
        for (&var, &val) in &other.map {
            let joined = self.get(var).meet(val);
            changed |= self.update(var, joined);
        }
        changed
    }

    /// Overwrites `self` with `other`'s contents; returns whether it changed.
    pub fn copy_from(&mut self, other: &CPFact) -> bool {
        if self.map == other.map {
            return false;
        }
        self.map = other.map.clone();
        true
    }
}

/// A finite set fact, used by live-variable analysis and others (spec §3
/// "SetFact<T>").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetFact<T: Eq + Hash + Clone> {
    set: HashSet<T>,
}

impl<T: Eq + Hash + Clone> SetFact<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.set.contains(item)
    }

    pub fn insert(&mut self, item: T) -> bool {
        self.set.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.set.remove(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.set.iter()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Unions `other` into `self`; returns whether `self` changed.
    pub fn union_with(&mut self, other: &SetFact<T>) -> bool {
        let before = self.set.len();
        for item in &other.set {
            self.set.insert(item.clone());
        }
        self.set.len() != before
    }

    /// Removes every element of `other` from `self`.
    pub fn difference_with(&mut self, other: &SetFact<T>) {
        for item in &other.set {
            self.set.remove(item);
        }
    }

    pub fn copy_from(&mut self, other: &SetFact<T>) -> bool {
        if self.set == other.set {
            return false;
        }
        self.set = other.set.clone();
        true
    }
}
