//! Entity dependency graph
//!
//! Built once when the catalog is assembled. Construction fails on unknown
//! dependencies, layer-order violations and cycles, so every catalog that
//! exists can be evaluated in a single topological pass.

use super::definition::EntityDefinition;
use crate::domain::{EntityName, Result, SemanticError};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph with an edge from each dependency to its dependent
#[derive(Debug, Clone)]
pub struct EntityGraph {
    graph: DiGraph<EntityName, ()>,
    nodes: BTreeMap<EntityName, NodeIndex>,
    /// Topological levels; level 0 has no dependencies
    levels: Vec<Vec<EntityName>>,
}

impl EntityGraph {
    pub fn build(definitions: &[EntityDefinition]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut nodes = BTreeMap::new();

        for def in definitions {
            if def.name.is_cache_alias() || def.name.layer().is_none() {
                return Err(SemanticError::Catalog(format!(
                    "{} cannot be defined: entities live in the staging, business, metrics or alerts namespace",
                    def.name
                )));
            }
            if nodes.contains_key(&def.name) {
                return Err(SemanticError::Catalog(format!(
                    "{} is defined more than once",
                    def.name
                )));
            }
            nodes.insert(def.name.clone(), graph.add_node(def.name.clone()));
        }

        for def in definitions {
            let to = nodes[&def.name];
            for dep in &def.dependencies {
                let from = *nodes.get(dep).ok_or_else(|| {
                    SemanticError::Catalog(format!("{} depends on unknown entity {}", def.name, dep))
                })?;
                check_layer(&def.name, dep)?;
                graph.add_edge(from, to, ());
            }
        }

        let cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || scc.iter().any(|&n| graph.contains_edge(n, n)))
            .map(|scc| {
                let mut members: Vec<String> = scc.iter().map(|&n| graph[n].to_string()).collect();
                members.sort();
                members
            })
            .collect();
        if !cycles.is_empty() {
            let rendered: Vec<String> = cycles.iter().map(|c| c.join(" <-> ")).collect();
            return Err(SemanticError::Catalog(format!(
                "dependency cycle: {}",
                rendered.join("; ")
            )));
        }

        let levels = compute_levels(&graph, &nodes);
        Ok(Self {
            graph,
            nodes,
            levels,
        })
    }

    pub fn levels(&self) -> &[Vec<EntityName>] {
        &self.levels
    }

    /// Every entity in dependency order (level by level, by name within a level)
    pub fn topological_order(&self) -> Vec<EntityName> {
        self.levels.iter().flatten().cloned().collect()
    }

    pub fn contains(&self, entity: &EntityName) -> bool {
        self.nodes.contains_key(entity)
    }

    /// Direct upstream entities
    pub fn dependencies(&self, entity: &EntityName) -> Vec<EntityName> {
        self.neighbors(entity, Direction::Incoming)
    }

    /// Direct downstream entities
    pub fn dependents(&self, entity: &EntityName) -> Vec<EntityName> {
        self.neighbors(entity, Direction::Outgoing)
    }

    /// All transitive upstream entities, excluding `entity` itself
    pub fn upstream_closure(&self, entity: &EntityName) -> BTreeSet<EntityName> {
        let Some(&start) = self.nodes.get(entity) else {
            return BTreeSet::new();
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut out = BTreeSet::new();
        while let Some(node) = dfs.next(reversed) {
            if node != start {
                out.insert(self.graph[node].clone());
            }
        }
        out
    }

    /// All transitive downstream entities, excluding `entity` itself
    pub fn downstream_closure(&self, entity: &EntityName) -> BTreeSet<EntityName> {
        let Some(&start) = self.nodes.get(entity) else {
            return BTreeSet::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut out = BTreeSet::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                out.insert(self.graph[node].clone());
            }
        }
        out
    }

    fn neighbors(&self, entity: &EntityName, direction: Direction) -> Vec<EntityName> {
        let Some(&idx) = self.nodes.get(entity) else {
            return Vec::new();
        };
        let mut out: Vec<EntityName> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

fn check_layer(entity: &EntityName, dependency: &EntityName) -> Result<()> {
    match (entity.layer(), dependency.layer()) {
        (Some(layer), Some(upstream)) if layer.may_depend_on(upstream) => Ok(()),
        _ => Err(SemanticError::Catalog(format!(
            "{} may not depend on {}: data flows upward only (staging -> business -> metrics -> alerts)",
            entity, dependency
        ))),
    }
}

/// Longest-path levelling of an acyclic graph
fn compute_levels(
    graph: &DiGraph<EntityName, ()>,
    nodes: &BTreeMap<EntityName, NodeIndex>,
) -> Vec<Vec<EntityName>> {
    let mut level_of: BTreeMap<NodeIndex, usize> = BTreeMap::new();
    let mut remaining: Vec<NodeIndex> = nodes.values().copied().collect();

    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|&n| {
            let mut level = 0;
            for dep in graph.neighbors_directed(n, Direction::Incoming) {
                match level_of.get(&dep) {
                    Some(&l) => level = level.max(l + 1),
                    None => return true,
                }
            }
            level_of.insert(n, level);
            false
        });
        if remaining.len() == before {
            // unreachable for an acyclic graph
            break;
        }
    }

    let depth = level_of.values().copied().max().map_or(0, |m| m + 1);
    let mut levels = vec![Vec::new(); depth];
    for (name, idx) in nodes {
        if let Some(&l) = level_of.get(idx) {
            levels[l].push(name.clone());
        }
    }
    levels
}
