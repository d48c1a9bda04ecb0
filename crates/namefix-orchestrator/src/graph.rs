//! Dependency graph algorithms
//!
//! Graphs are given as adjacency maps from a node to the nodes it depends
//! on. Nodes that appear only as dependencies (never registered) are
//! allowed; they have no outgoing edges.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Adjacency map: node -> nodes it depends on
pub type DependencyMap<K> = BTreeMap<K, Vec<K>>;

/// Finds a dependency path from `from` to `to`
///
/// Returns the nodes along the path, both ends included, or `None` when
/// `to` is not reachable. Breadth-first, so the path is a shortest one.
pub fn find_path<K>(graph: &DependencyMap<K>, from: &K, to: &K) -> Option<Vec<K>>
where
    K: Ord + Clone,
{
    if from == to {
        return Some(vec![from.clone()]);
    }

    let mut parent: BTreeMap<K, K> = BTreeMap::new();
    let mut seen: BTreeSet<K> = BTreeSet::from([from.clone()]);
    let mut queue: VecDeque<K> = VecDeque::from([from.clone()]);

    while let Some(node) = queue.pop_front() {
        let Some(deps) = graph.get(&node) else {
            continue;
        };
        for dep in deps {
            if !seen.insert(dep.clone()) {
                continue;
            }
            parent.insert(dep.clone(), node.clone());
            if dep == to {
                let mut path = vec![dep.clone()];
                let mut cursor = dep;
                while let Some(prev) = parent.get(cursor) {
                    path.push(prev.clone());
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(dep.clone());
        }
    }

    None
}

/// Returns the cycle that adding `dependent -> dependency` would close
///
/// The cycle is reported starting and ending at `dependent`.
pub fn cycle_with_edge<K>(graph: &DependencyMap<K>, dependent: &K, dependency: &K) -> Option<Vec<K>>
where
    K: Ord + Clone,
{
    let mut back = find_path(graph, dependency, dependent)?;
    back.insert(0, dependent.clone());
    Some(back)
}

/// Orders nodes into waves that can run one after another
///
/// Every node in a wave depends only on nodes of earlier waves. `done`
/// nodes count as already satisfied and are left out of the waves.
/// Returns `Err` with the nodes that can never be scheduled (they sit on a
/// cycle, depend on an unknown node, or depend on such a node).
pub fn waves<K>(graph: &DependencyMap<K>, done: &BTreeSet<K>) -> Result<Vec<Vec<K>>, Vec<K>>
where
    K: Ord + Clone,
{
    let mut remaining: BTreeSet<K> = graph
        .keys()
        .filter(|k| !done.contains(*k))
        .cloned()
        .collect();
    let mut satisfied: BTreeSet<K> = done.clone();
    let mut result = Vec::new();

    while !remaining.is_empty() {
        let wave: Vec<K> = remaining
            .iter()
            .filter(|node| {
                graph
                    .get(*node)
                    .map_or(true, |deps| deps.iter().all(|d| satisfied.contains(d)))
            })
            .cloned()
            .collect();

        if wave.is_empty() {
            return Err(remaining.into_iter().collect());
        }

        for node in &wave {
            remaining.remove(node);
            satisfied.insert(node.clone());
        }
        result.push(wave);
    }

    Ok(result)
}

/// Every node that transitively depends on one of `roots`
///
/// The roots themselves are not included.
pub fn dependents_of<K>(graph: &DependencyMap<K>, roots: &BTreeSet<K>) -> BTreeSet<K>
where
    K: Ord + Clone,
{
    let mut reverse: BTreeMap<&K, Vec<&K>> = BTreeMap::new();
    for (node, deps) in graph {
        for dep in deps {
            reverse.entry(dep).or_default().push(node);
        }
    }

    let mut found = BTreeSet::new();
    let mut queue: VecDeque<&K> = roots.iter().collect();
    while let Some(node) = queue.pop_front() {
        for dependent in reverse.get(node).into_iter().flatten() {
            if !roots.contains(*dependent) && found.insert((*dependent).clone()) {
                queue.push_back(*dependent);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &[&'static str])]) -> DependencyMap<&'static str> {
        edges
            .iter()
            .map(|(node, deps)| (*node, deps.to_vec()))
            .collect()
    }

    #[test]
    fn test_find_path_direct_and_transitive() {
        let g = graph(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(find_path(&g, &"c", &"a"), Some(vec!["c", "b", "a"]));
        assert_eq!(find_path(&g, &"a", &"c"), None);
        assert_eq!(find_path(&g, &"b", &"b"), Some(vec!["b"]));
    }

    #[test]
    fn test_cycle_with_edge() {
        let g = graph(&[("b", &["a"]), ("c", &["b"]), ("a", &[])]);
        // a -> c would close a -> c -> b -> a
        assert_eq!(
            cycle_with_edge(&g, &"a", &"c"),
            Some(vec!["a", "c", "b", "a"])
        );
        assert_eq!(cycle_with_edge(&g, &"c", &"a"), None);
    }

    #[test]
    fn test_waves_orders_by_dependency() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"]), ("d", &["b", "c"])]);
        let w = waves(&g, &BTreeSet::new()).unwrap();
        assert_eq!(w, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_waves_skips_done_nodes() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        let w = waves(&g, &BTreeSet::from(["a"])).unwrap();
        assert_eq!(w, vec![vec!["b"]]);
    }

    #[test]
    fn test_waves_reports_stuck_nodes() {
        let g = graph(&[
            ("a", &[]),
            ("b", &["ghost"]),
            ("c", &["d"]),
            ("d", &["c"]),
            ("e", &["b"]),
        ]);
        let stuck = waves(&g, &BTreeSet::new()).unwrap_err();
        assert_eq!(stuck, vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn test_dependents_of_is_transitive() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("x", &[])]);
        let found = dependents_of(&g, &BTreeSet::from(["a"]));
        assert_eq!(found, BTreeSet::from(["b", "c"]));
    }
}
