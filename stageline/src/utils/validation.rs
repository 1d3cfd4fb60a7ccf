//! Validation utilities for pipeline declarations.
//!
//! Names end up inside storage keys (`stage/slot`), so they may not
//! contain the separator.

use crate::errors::{ContractErrorInfo, PipelineValidationError, CODE_INVALID_NAME};
use indexmap::IndexMap;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::fmt;
use std::sync::OnceLock;

/// What kind of thing a validated name identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// A pipeline name.
    Pipeline,
    /// A stage name.
    Stage,
    /// An output slot name.
    Slot,
    /// An image repository name.
    Repository,
    /// A secondary source identifier.
    SourceIdentifier,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pipeline => "pipeline",
            Self::Stage => "stage",
            Self::Slot => "slot",
            Self::Repository => "image repository",
            Self::SourceIdentifier => "source identifier",
        };
        f.write_str(label)
    }
}

#[allow(clippy::expect_used)]
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^/\s]+$").expect("name pattern is valid"))
}

/// Validates a name used in artifact addressing.
///
/// Any non-empty name is accepted as long as it contains neither `/` nor
/// whitespace, which keeps `stage/slot` keys unambiguous.
///
/// # Errors
///
/// Returns an error if the name is empty or contains `/` or whitespace.
pub fn validate_name(kind: NameKind, name: &str) -> Result<(), PipelineValidationError> {
    if name_pattern().is_match(name) {
        return Ok(());
    }

    let reason = if name.trim().is_empty() {
        format!("{kind} name cannot be empty or whitespace-only")
    } else {
        format!("{kind} name '{name}' may not contain '/' or whitespace")
    };

    Err(PipelineValidationError::new(reason.clone())
        .with_stages(if kind == NameKind::Stage { vec![name.to_string()] } else { Vec::new() })
        .with_error_info(
            ContractErrorInfo::new(CODE_INVALID_NAME, reason)
                .with_context_entry("kind", kind.to_string())
                .with_context_entry("name", name),
        ))
}

fn node_name(edges: &IndexMap<String, Vec<String>>, index: usize) -> String {
    edges.get_index(index).map(|(name, _)| name.clone()).unwrap_or_default()
}

/// Finds a cycle in an ordering graph.
///
/// `edges` maps each node to the nodes it must run after, and is walked in
/// insertion order so the reported path is stable. Edges to nodes absent
/// from `edges` are ignored. Returns the cycle as a path that starts and
/// ends with the same node.
///
/// The walk keeps its own stack, so chain length is not bounded by the
/// thread stack.
#[must_use]
pub fn find_cycle(edges: &IndexMap<String, Vec<String>>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];

    for root in 0..edges.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // (node, index of the next dependency to visit)
        let mut path: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::OnPath;

        while let Some(frame) = path.last_mut() {
            let node = frame.0;
            let next = frame.1;
            let deps = edges.get_index(node).map_or(&[][..], |(_, deps)| deps.as_slice());

            if next >= deps.len() {
                marks[node] = Mark::Done;
                path.pop();
                continue;
            }
            frame.1 += 1;

            let Some(dep) = edges.get_index_of(&deps[next]) else {
                continue;
            };
            match marks[dep] {
                Mark::OnPath => {
                    let start = path.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&(n, _)| node_name(edges, n)).collect();
                    cycle.push(node_name(edges, dep));
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    marks[dep] = Mark::OnPath;
                    path.push((dep, 0));
                }
                Mark::Done => {}
            }
        }
    }

    None
}

/// Orders nodes so every node comes after the nodes it depends on.
///
/// Kahn's algorithm over in-degrees; among ready nodes the earliest
/// declared runs first, so independent nodes keep their declaration order.
/// Nodes left on a cycle are appended in declaration order (see
/// [`find_cycle`]).
#[must_use]
pub fn topological_order(edges: &IndexMap<String, Vec<String>>) -> Vec<String> {
    let mut in_degree = vec![0_usize; edges.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];

    for (index, deps) in edges.values().enumerate() {
        let distinct: BTreeSet<usize> = deps.iter().filter_map(|dep| edges.get_index_of(dep)).collect();
        in_degree[index] = distinct.len();
        for dep in distinct {
            dependents[dep].push(index);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut placed = vec![false; edges.len()];
    let mut result = Vec::with_capacity(edges.len());

    while let Some(Reverse(index)) = ready.pop() {
        placed[index] = true;
        result.push(node_name(edges, index));
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    result.extend(
        placed
            .iter()
            .enumerate()
            .filter(|(_, placed)| !**placed)
            .map(|(index, _)| node_name(edges, index)),
    );
    result
}
