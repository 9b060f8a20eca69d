//! # Dependency Resolution
//!
//! Turns a set of descriptors into a load order with Kahn's algorithm.
//!
//! 1. A unit's in-degree is the number of its dependencies that are *registered*.
//!    Unregistered dependencies are reported and dropped; they never block a unit.
//! 2. Units with in-degree 0 are ready. The ready set is kept sorted by
//!    `(priority, id)`, lowest first.
//! 3. The smallest ready unit is appended to the order; every unit depending on it
//!    loses one in-degree and becomes ready at zero.
//! 4. Whatever never becomes ready sits on (or behind) a cycle and is excluded.
//!
//! The same descriptor set always yields the same order.

use crate::framework::UnitDescriptor;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Dependency-valid order, dependencies first.
    pub order: Vec<String>,
    /// `(unit, dependency)` pairs whose dependency is not registered.
    pub missing: Vec<(String, String)>,
    /// Units that could not be ordered, sorted by id.
    pub unresolved: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Computes the load order of `descriptors`.
///
/// Ids are expected to be unique; the registry guarantees it.
pub fn resolve<'a, I>(descriptors: I) -> Resolution
where
    I: IntoIterator<Item = &'a UnitDescriptor>,
{
    let units: BTreeMap<&str, &UnitDescriptor> =
        descriptors.into_iter().map(|d| (d.id(), d)).collect();

    let mut in_degree: BTreeMap<&str, usize> = units.keys().map(|id| (*id, 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut missing = Vec::new();

    for (id, descriptor) in &units {
        for dependency in descriptor.dependencies() {
            if let Some((dep_id, _)) = units.get_key_value(dependency.as_str()) {
                *in_degree.entry(*id).or_default() += 1;
                dependents.entry(*dep_id).or_default().push(*id);
            } else {
                missing.push((id.to_string(), dependency.clone()));
            }
        }
    }

    let mut ready: BTreeSet<(i32, &str)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| (units[id].load_priority(), *id))
        .collect();

    let mut order = Vec::with_capacity(units.len());
    while let Some((_, current)) = ready.pop_first() {
        order.push(current.to_string());
        for dependent in dependents.get(current).into_iter().flatten() {
            let degree = in_degree.entry(*dependent).or_default();
            *degree -= 1;
            if *degree == 0 {
                ready.insert((units[dependent].load_priority(), *dependent));
            }
        }
    }

    let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    let unresolved = units
        .keys()
        .filter(|id| !placed.contains(*id))
        .map(|id| id.to_string())
        .collect();

    Resolution {
        order,
        missing,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, priority: i32, deps: &[&str]) -> UnitDescriptor {
        UnitDescriptor::new(id)
            .priority(priority)
            .depends_on(deps.iter().copied())
    }

    fn order_of(units: &[UnitDescriptor]) -> Vec<String> {
        resolve(units).order
    }

    fn index(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    #[test]
    fn dependency_loads_first() {
        let units = [unit("b", 100, &["a"]), unit("a", 100, &[])];
        assert_eq!(order_of(&units), vec!["a", "b"]);
    }

    #[test]
    fn missing_dependency_is_dropped() {
        let res = resolve(&[unit("c", 100, &["d"])]);
        assert_eq!(res.order, vec!["c"]);
        assert_eq!(res.missing, vec![("c".to_string(), "d".to_string())]);
        assert!(res.is_complete());
    }

    #[test]
    fn two_cycle_is_excluded() {
        let res = resolve(&[unit("x", 100, &["y"]), unit("y", 100, &["x"])]);
        assert!(res.order.is_empty());
        assert_eq!(res.unresolved, vec!["x", "y"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let res = resolve(&[unit("loop", 100, &["loop"]), unit("ok", 100, &[])]);
        assert_eq!(res.order, vec!["ok"]);
        assert_eq!(res.unresolved, vec!["loop"]);
    }

    #[test]
    fn priority_then_id_breaks_ties() {
        let units = [unit("r", 100, &[]), unit("q", 100, &[]), unit("p", 50, &[])];
        assert_eq!(order_of(&units), vec!["p", "q", "r"]);
    }

    #[test]
    fn newly_ready_units_are_inserted_in_order() {
        // "early" becomes ready after "base" and must jump ahead of "late"
        let units = [
            unit("base", 10, &[]),
            unit("late", 200, &[]),
            unit("early", 20, &["base"]),
            unit("alpha", 200, &["base"]),
        ];
        assert_eq!(order_of(&units), vec!["base", "early", "alpha", "late"]);
    }

    #[test]
    fn cycle_excludes_members_and_their_dependents_only() {
        let units = [
            unit("a", 100, &[]),
            unit("x", 100, &["y", "a"]),
            unit("y", 100, &["z"]),
            unit("z", 100, &["x"]),
            unit("downstream", 100, &["z"]),
            unit("mixed", 100, &["a", "downstream"]),
            unit("b", 100, &["a"]),
        ];
        let res = resolve(&units);
        assert_eq!(res.order, vec!["a", "b"]);
        assert_eq!(res.unresolved, vec!["downstream", "mixed", "x", "y", "z"]);
    }

    #[test]
    fn order_respects_every_edge() {
        let units = [
            unit("app", 300, &["net", "store", "log"]),
            unit("net", 100, &["log", "config"]),
            unit("store", 50, &["config"]),
            unit("log", 200, &[]),
            unit("config", 250, &[]),
            unit("metrics", 0, &["log"]),
            unit("solo", 1, &[]),
        ];
        let order = order_of(&units);
        assert_eq!(order.len(), units.len());
        for u in &units {
            for dep in u.dependencies() {
                assert!(index(&order, dep) < index(&order, u.id()), "{dep} before {}", u.id());
            }
        }
        assert_eq!(order[0], "solo");
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut units = vec![
            unit("m", 100, &["k"]),
            unit("k", 100, &[]),
            unit("j", 100, &[]),
            unit("z", 5, &["j"]),
            unit("h", 100, &["missing"]),
        ];
        let first = resolve(&units);
        units.reverse();
        for _ in 0..10 {
            assert_eq!(resolve(&units), first);
        }
        assert_eq!(first.order, vec!["h", "j", "z", "k", "m"]);
    }
}
