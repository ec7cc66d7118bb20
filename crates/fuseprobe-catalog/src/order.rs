//! Prerequisite ordering.
//!
//! Kahn's algorithm over the "rule requires rule" graph. Ready rules are
//! taken lowest declaration index first, so the order is stable for a given
//! input. Prerequisites naming rules outside the node set are ignored here;
//! callers decide whether that is an error.

use std::collections::{BTreeSet, HashMap};

use fuseprobe_common::CatalogError;

/// Order `nodes` so that every rule comes after its prerequisites.
///
/// `nodes` is `(name, prerequisites)` in declaration order. Fails with
/// [`CatalogError::CyclicRule`] naming one cycle when no order exists.
pub fn prerequisite_order<'a, P>(nodes: &'a [(&'a str, P)]) -> Result<Vec<&'a str>, CatalogError>
where
    P: AsRef<[String]>,
{
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, (n, _))| (*n, i)).collect();

    // edges[i] = declaration indices of the prerequisites of node i
    let edges: Vec<BTreeSet<usize>> = nodes
        .iter()
        .map(|(_, prereqs)| {
            prereqs.as_ref().iter().filter_map(|p| index.get(p.as_str()).copied()).collect()
        })
        .collect();

    let mut in_degree: Vec<usize> = edges.iter().map(BTreeSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, prereqs) in edges.iter().enumerate() {
        for &p in prereqs {
            dependents[p].push(i);
        }
    }

    let mut ready: BTreeSet<usize> =
        in_degree.iter().enumerate().filter(|&(_, &d)| d == 0).map(|(i, _)| i).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(i) = ready.pop_first() {
        order.push(nodes[i].0);
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                ready.insert(dep);
            }
        }
    }

    if order.len() != nodes.len() {
        let cycle = find_cycle(&edges, &in_degree).into_iter().map(|i| nodes[i].0.to_string());
        return Err(CatalogError::CyclicRule { cycle: cycle.collect() });
    }
    Ok(order)
}

/// Walk prerequisite edges among the unprocessed nodes until one repeats.
///
/// Every unprocessed node still has an unprocessed prerequisite, so the
/// walk always closes a cycle. The first node is repeated at the end.
fn find_cycle(edges: &[BTreeSet<usize>], in_degree: &[usize]) -> Vec<usize> {
    let stuck = |i: usize| in_degree[i] > 0;
    let Some(start) = (0..edges.len()).find(|&i| stuck(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut seen_at: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;
    while let Some(next) = edges[current].iter().copied().find(|&p| stuck(p)) {
        if let Some(&pos) = seen_at.get(&next) {
            let mut cycle = path.split_off(pos);
            cycle.push(next);
            return cycle;
        }
        seen_at.insert(next, path.len());
        path.push(next);
        current = next;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &'static str, prereqs: &[&str]) -> (&'static str, Vec<String>) {
        (name, prereqs.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_prerequisites_come_first() {
        let nodes = vec![node("c", &["b"]), node("b", &["a"]), node("a", &[])];
        assert_eq!(prerequisite_order(&nodes).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let nodes = vec![node("x", &[]), node("y", &["z"]), node("z", &[]), node("w", &[])];
        assert_eq!(prerequisite_order(&nodes).unwrap(), vec!["x", "z", "y", "w"]);
    }

    #[test]
    fn test_unknown_prerequisites_are_ignored() {
        let nodes = vec![node("a", &["missing"])];
        assert_eq!(prerequisite_order(&nodes).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let nodes = vec![node("X", &["Y"]), node("Y", &["X"])];
        assert_eq!(
            prerequisite_order(&nodes),
            Err(CatalogError::CyclicRule {
                cycle: vec!["X".to_string(), "Y".to_string(), "X".to_string()]
            })
        );
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let nodes =
            vec![node("a", &[]), node("b", &["a", "d"]), node("c", &["b"]), node("d", &["c"])];
        let Err(CatalogError::CyclicRule { cycle }) = prerequisite_order(&nodes) else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle, vec!["b", "d", "c", "b"]);
    }

    #[test]
    fn test_self_loop() {
        let nodes = vec![node("a", &["a"])];
        let Err(CatalogError::CyclicRule { cycle }) = prerequisite_order(&nodes) else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle, vec!["a", "a"]);
    }
}
