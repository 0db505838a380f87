//! Cycle detection over the backlog dependency graph.
//!
//! Each task carries at most one `depends_on` parent, so the graph is a
//! functional graph; cycles still happen (a chain closing on itself) and
//! stall the pipeline. DFS with a recursion stack finds them and feeds
//! the deadlock diagnosis.

use std::collections::{HashMap, HashSet};

use crate::domain::models::{Task, TaskStatus};
use crate::domain::DomainError;

fn detect_cycle_util(
    node: u64,
    graph: &HashMap<u64, Vec<u64>>,
    visited: &mut HashSet<u64>,
    rec_stack: &mut HashSet<u64>,
    path: &mut Vec<u64>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(&node) {
        for &neighbor in neighbors {
            if !visited.contains(&neighbor) {
                if detect_cycle_util(neighbor, graph, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(&neighbor) {
                if let Some(cycle_start) = path.iter().position(|&id| id == neighbor) {
                    path.drain(0..cycle_start);
                    return true;
                }
            }
        }
    }

    rec_stack.remove(&node);
    path.pop();
    false
}

/// Detect a circular dependency among tasks. Returns the cycle path.
pub fn detect_cycle(tasks: &[Task]) -> Option<Vec<u64>> {
    let mut graph: HashMap<u64, Vec<u64>> = HashMap::new();
    for task in tasks {
        let entry = graph.entry(task.id).or_default();
        if let Some(dep) = task.depends_on {
            entry.push(dep);
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    let mut ids: Vec<u64> = graph.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        if !visited.contains(&id)
            && detect_cycle_util(id, &graph, &mut visited, &mut rec_stack, &mut path)
        {
            return Some(path);
        }
    }
    None
}

/// Diagnose why no task is runnable despite open work remaining.
///
/// A cycle among open tasks is an error; otherwise every open task is
/// waiting on an incomplete parent and the blockers are returned so the
/// escalation step can pick one.
pub fn diagnose_stall(tasks: &[Task]) -> Result<Vec<u64>, DomainError> {
    let open: Vec<Task> = tasks.iter().filter(|t| t.is_open()).cloned().collect();
    if let Some(cycle) = detect_cycle(&open) {
        return Err(DomainError::DependencyCycle(cycle));
    }

    let by_id: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut blockers: Vec<u64> = open
        .iter()
        .filter_map(|t| t.depends_on)
        .filter(|dep| {
            by_id
                .get(dep)
                .is_some_and(|parent| parent.status != TaskStatus::Done)
        })
        .collect();
    blockers.sort_unstable();
    blockers.dedup();
    Ok(blockers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: u64, depends_on: Option<u64>, status: TaskStatus) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: String::new(),
            assigned_to: "engineer".into(),
            status,
            priority: "medium".into(),
            depends_on,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let tasks = vec![
            task(1, None, TaskStatus::Todo),
            task(2, Some(1), TaskStatus::Todo),
            task(3, Some(2), TaskStatus::Todo),
        ];
        assert_eq!(detect_cycle(&tasks), None);
    }

    #[test]
    fn test_two_task_cycle() {
        let tasks = vec![
            task(1, Some(2), TaskStatus::Todo),
            task(2, Some(1), TaskStatus::Todo),
        ];
        let cycle = detect_cycle(&tasks).expect("cycle");
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&1) && cycle.contains(&2));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![task(7, Some(7), TaskStatus::Todo)];
        assert_eq!(detect_cycle(&tasks), Some(vec![7]));
    }

    #[test]
    fn test_diagnose_stall_reports_blockers() {
        let tasks = vec![
            task(1, None, TaskStatus::Blocked),
            task(2, Some(1), TaskStatus::Todo),
            task(3, Some(1), TaskStatus::Todo),
        ];
        assert_eq!(diagnose_stall(&tasks).unwrap(), vec![1]);
    }

    #[test]
    fn test_diagnose_stall_errors_on_cycle() {
        let tasks = vec![
            task(1, Some(2), TaskStatus::Todo),
            task(2, Some(1), TaskStatus::Todo),
        ];
        assert!(matches!(
            diagnose_stall(&tasks),
            Err(DomainError::DependencyCycle(_))
        ));
    }
}
