//! Scene: the per-process object and constraint registries.
//!
//! The [`Scene`] is owned by the simulation and passed explicitly to
//! whoever needs it. Names are unique per registry. Removing an object
//! cascades to every constraint attached to it.
//!
//! | Module | Contents |
//! |---|---|
//! | [`object`] | [`Object`], [`Constraint`] |
//! | [`properties`] | value tables per entity kind, authority routing |

pub mod object;
pub mod properties;

pub use object::{Constraint, Object};

use std::collections::BTreeMap;
use tracing::debug;

/// An object taken out of the scene, with the constraints that went with it.
#[derive(Debug)]
pub struct Removed<B, J> {
    /// The object.
    pub object: Object<B>,
    /// Constraints that referenced it.
    pub constraints: Vec<Constraint<J>>,
}

/// Object and constraint registries of one process.
#[derive(Debug)]
pub struct Scene<B, J> {
    objects: BTreeMap<String, Object<B>>,
    constraints: BTreeMap<String, Constraint<J>>,
}

impl<B, J> Default for Scene<B, J> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            constraints: BTreeMap::new(),
        }
    }
}

impl<B, J> Scene<B, J> {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object. An existing object of the same name is removed
    /// first, together with its constraints, and returned.
    pub fn insert_object(&mut self, object: Object<B>) -> Option<Removed<B, J>> {
        let displaced = self.remove_object(object.name());
        debug!(name = object.name(), kind = %object.kind(), "object registered");
        self.objects.insert(object.name().to_string(), object);
        displaced
    }

    /// Remove an object and every constraint attached to it.
    pub fn remove_object(&mut self, name: &str) -> Option<Removed<B, J>> {
        let object = self.objects.remove(name)?;
        let constraints = object
            .constraints()
            .to_vec()
            .iter()
            .filter_map(|c| self.remove_constraint(c))
            .collect();
        debug!(name, "object removed");
        Some(Removed { object, constraints })
    }

    /// Insert a constraint and link it to its endpoints. An existing
    /// constraint of the same name is removed first and returned.
    pub fn insert_constraint(&mut self, constraint: Constraint<J>) -> Option<Constraint<J>> {
        let displaced = self.remove_constraint(constraint.name());
        let name = constraint.name().to_string();
        for endpoint in [Some(constraint.object1()), constraint.object2()].into_iter().flatten() {
            if let Some(object) = self.objects.get_mut(endpoint) {
                object.link(&name);
            }
        }
        debug!(name = %name, kind = %constraint.kind(), "constraint registered");
        self.constraints.insert(name, constraint);
        displaced
    }

    /// Remove a constraint and unlink it from its endpoints.
    pub fn remove_constraint(&mut self, name: &str) -> Option<Constraint<J>> {
        let constraint = self.constraints.remove(name)?;
        for endpoint in [Some(constraint.object1()), constraint.object2()].into_iter().flatten() {
            if let Some(object) = self.objects.get_mut(endpoint) {
                object.unlink(name);
            }
        }
        debug!(name, "constraint removed");
        Some(constraint)
    }

    /// Remove every object (and thereby every constraint).
    pub fn clear(&mut self) -> Vec<Removed<B, J>> {
        let names: Vec<String> = self.objects.keys().cloned().collect();
        let removed: Vec<_> = names.iter().filter_map(|n| self.remove_object(n)).collect();
        // Constraints can only exist between live objects, but be thorough.
        let orphans: Vec<String> = self.constraints.keys().cloned().collect();
        for name in orphans {
            self.remove_constraint(&name);
        }
        removed
    }

    /// Look up an object.
    pub fn object(&self, name: &str) -> Option<&Object<B>> {
        self.objects.get(name)
    }

    /// Look up an object, mutably.
    pub fn object_mut(&mut self, name: &str) -> Option<&mut Object<B>> {
        self.objects.get_mut(name)
    }

    /// Look up a constraint.
    pub fn constraint(&self, name: &str) -> Option<&Constraint<J>> {
        self.constraints.get(name)
    }

    /// Look up a constraint, mutably.
    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut Constraint<J>> {
        self.constraints.get_mut(name)
    }

    /// Whether an object with this name exists.
    #[inline]
    pub fn contains_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Whether any entity, object or constraint, has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.constraints.contains_key(name)
    }

    /// Objects in name order.
    pub fn objects(&self) -> impl Iterator<Item = &Object<B>> {
        self.objects.values()
    }

    /// Objects in name order, mutably.
    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut Object<B>> {
        self.objects.values_mut()
    }

    /// Constraints in name order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint<J>> {
        self.constraints.values()
    }

    /// Constraints in name order, mutably.
    pub fn constraints_mut(&mut self) -> impl Iterator<Item = &mut Constraint<J>> {
        self.constraints.values_mut()
    }

    /// Number of objects.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of constraints.
    #[inline]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the scene has no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.constraints.is_empty()
    }
}
