use std::collections::{HashMap, HashSet};

use dp_common::{log_warn, meta::table::Table};

/// Sort tables into a dependency-safe insertion order.
///
/// Tables whose dependencies are all placed are appended greedily. When a
/// full pass places nothing, the schema contains a cycle and one table is
/// force-advanced by score: -100 per unplaced dependency, +500 when one of
/// its unplaced dependencies depends back on it (directly or transitively).
/// Ties go to the lexicographically greater name so the order is stable
/// across runs.
pub fn sort_tables(tables: Vec<Table>) -> Vec<Table> {
    let total = tables.len();
    let dep_map: HashMap<String, Vec<String>> = tables
        .iter()
        .map(|table| (table.name.clone(), table.dependencies.clone()))
        .collect();

    let mut slots: Vec<Option<Table>> = tables.into_iter().map(Some).collect();
    let mut sorted: Vec<Table> = Vec::with_capacity(total);
    let mut processed: HashSet<String> = HashSet::new();

    while sorted.len() < total {
        let mut added = false;

        for slot in slots.iter_mut() {
            let satisfied = match slot {
                Some(table) => table
                    .dependencies
                    .iter()
                    .all(|dep| processed.contains(dep)),
                None => continue,
            };
            if satisfied {
                let table = slot.take().unwrap();
                processed.insert(table.name.clone());
                sorted.push(table);
                added = true;
            }
        }

        if added {
            continue;
        }

        // cycle: pick the best candidate to force-advance
        let mut best_index: Option<usize> = None;
        let mut best_score = i64::MIN;
        for (i, slot) in slots.iter().enumerate() {
            let Some(table) = slot else { continue };
            let score = cycle_score(table, &dep_map, &processed);

            let wins = match best_index {
                None => true,
                Some(current) => {
                    score > best_score
                        || (score == best_score
                            && table.name > slots[current].as_ref().unwrap().name)
                }
            };
            if wins {
                best_index = Some(i);
                best_score = score;
            }
        }

        match best_index {
            Some(i) => {
                let table = slots[i].take().unwrap();
                log_warn!(
                    "breaking circular dependency: {} (score: {})",
                    table.name,
                    best_score
                );
                processed.insert(table.name.clone());
                sorted.push(table);
            }
            None => {
                // unreachable while sorted.len() < total, guard anyway
                log_warn!("table sort made no progress, emitting remaining tables as-is");
                for slot in slots.iter_mut() {
                    if let Some(table) = slot.take() {
                        sorted.push(table);
                    }
                }
            }
        }
    }

    sorted
}

fn cycle_score(
    table: &Table,
    dep_map: &HashMap<String, Vec<String>>,
    processed: &HashSet<String>,
) -> i64 {
    let unprocessed_deps = table
        .dependencies
        .iter()
        .filter(|dep| !processed.contains(*dep))
        .count() as i64;
    let mut score = -100 * unprocessed_deps;

    // some unplaced dependency reaches back to this table
    let is_circular = table
        .dependencies
        .iter()
        .filter(|dep| !processed.contains(*dep))
        .any(|dep| depends_on(dep, &table.name, dep_map));
    if is_circular {
        score += 500;
    }

    score
}

/// Whether `from` depends on `target`, following dependency edges.
fn depends_on(from: &str, target: &str, dep_map: &HashMap<String, Vec<String>>) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![from];
    while let Some(name) = stack.pop() {
        if !visited.insert(name) {
            continue;
        }
        if let Some(deps) = dep_map.get(name) {
            for dep in deps {
                if dep == target {
                    return true;
                }
                stack.push(dep);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {

    use super::*;

    fn table(name: &str, deps: &[&str]) -> Table {
        let mut table = Table::new(name);
        for dep in deps {
            table.add_dependency(dep);
        }
        table
    }

    fn names(tables: &[Table]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    fn index_of(tables: &[Table], name: &str) -> usize {
        tables.iter().position(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_linear_chain() {
        let tables = vec![
            table("OrderItems", &["Orders"]),
            table("Orders", &["Users"]),
            table("Users", &[]),
        ];
        let sorted = sort_tables(tables);
        assert_eq!(names(&sorted), vec!["Users", "Orders", "OrderItems"]);
    }

    #[test]
    fn test_five_cycle_with_tail() {
        // A -> B -> C -> D -> E -> A, plus F -> E and independent G
        let tables = vec![
            table("A", &["B"]),
            table("B", &["C"]),
            table("C", &["D"]),
            table("D", &["E"]),
            table("E", &["A"]),
            table("F", &["E"]),
            table("G", &[]),
        ];
        let sorted = sort_tables(tables);
        assert_eq!(sorted.len(), 7);

        // the cycle is broken at its lexicographically greatest member
        assert_eq!(sorted[1].name, "E");

        // the independent table leads, the tail follows its parent
        let cycle_start = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|name| index_of(&sorted, name))
            .min()
            .unwrap();
        assert!(index_of(&sorted, "G") < cycle_start);
        assert!(index_of(&sorted, "F") > index_of(&sorted, "E"));
    }

    #[test]
    fn test_every_edge_satisfied_or_cyclic() {
        let tables = vec![
            table("payment", &["customer", "staff"]),
            table("customer", &["store"]),
            table("staff", &["store"]),
            table("store", &["staff"]),
        ];
        let sorted = sort_tables(tables);
        assert_eq!(sorted.len(), 4);
        // payment is outside the store<->staff cycle, both parents precede it
        assert!(index_of(&sorted, "customer") < index_of(&sorted, "payment"));
        assert!(index_of(&sorted, "staff") < index_of(&sorted, "payment"));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let build = || {
            vec![
                table("A", &["B"]),
                table("B", &["C"]),
                table("C", &["A"]),
                table("Z", &[]),
                table("M", &["A", "Z"]),
            ]
        };
        let first = sort_tables(build());
        let second = sort_tables(build());
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_tie_breaks_to_greater_name() {
        // two independent 2-cycles with equal scores, the greater name
        // is force-advanced first
        let tables = vec![
            table("alpha", &["beta"]),
            table("beta", &["alpha"]),
            table("gamma", &["delta"]),
            table("delta", &["gamma"]),
        ];
        let sorted = sort_tables(tables);
        assert_eq!(sorted[0].name, "gamma");
    }
}
