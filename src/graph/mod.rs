//! Entity graph construction, layout and ranking
//!
//! Entities are keyed by name. Relationships reference entities by name and
//! create missing endpoints on the fly, so the two kinds of input may arrive
//! in any order.

pub mod centrality;
pub mod layout;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::error::ResearchError;
use crate::models::{
    CentralEntity, DEFAULT_IMPORTANCE, EntityInput, RelationshipInput, UNKNOWN_ENTITY_TYPE,
    VisualEdge, VisualNode, Visualization, VisualizationMetadata,
};

pub use centrality::eigenvector_centrality;
pub use layout::{LayoutParams, compute_layout};

/// Graph node payload
#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    pub name: String,
    pub entity_type: String,
    pub importance: f32,
}

/// Graph edge payload
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEdge {
    pub relationship_type: String,
    pub weight: f32,
}

/// Outcome of adding a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Added,
    Updated,
    /// Weight below the configured minimum
    Filtered,
}

/// Undirected entity graph with a name index
pub struct ResearchGraph {
    graph: UnGraph<EntityNode, RelationEdge>,
    name_to_node: HashMap<String, NodeIndex>,
    config: GraphConfig,
}

impl ResearchGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            name_to_node: HashMap::new(),
            config,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Looks up an entity by name
    pub fn entity(&self, name: &str) -> Option<&EntityNode> {
        self.name_to_node
            .get(name.trim())
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Edge between two entities, in either direction
    pub fn relationship(&self, a: &str, b: &str) -> Option<&RelationEdge> {
        let a = *self.name_to_node.get(a.trim())?;
        let b = *self.name_to_node.get(b.trim())?;
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Inserts an entity or overwrites the type and importance of an existing one
    pub fn upsert_entity(&mut self, entity: &EntityInput) -> Result<(), ResearchError> {
        let name = checked_name(&entity.name)?;
        let importance = checked_unit(entity.importance, "importance")?;
        let entity_type = if entity.entity_type.trim().is_empty() {
            UNKNOWN_ENTITY_TYPE.to_string()
        } else {
            entity.entity_type.trim().to_string()
        };

        match self.name_to_node.get(name) {
            Some(idx) => {
                if let Some(node) = self.graph.node_weight_mut(*idx) {
                    node.entity_type = entity_type;
                    node.importance = importance;
                }
            }
            None => {
                self.ensure_capacity(1)?;
                self.insert_node(EntityNode {
                    name: name.to_string(),
                    entity_type,
                    importance,
                });
            }
        }
        Ok(())
    }

    /// Adds a relationship if its weight meets the configured minimum.
    ///
    /// Missing endpoints are created with type `unknown` and default
    /// importance. A repeated pair overwrites the existing edge.
    pub fn add_relationship(
        &mut self,
        relationship: &RelationshipInput,
    ) -> Result<EdgeOutcome, ResearchError> {
        let source = checked_name(&relationship.source)?;
        let target = checked_name(&relationship.target)?;
        if source == target {
            return Err(ResearchError::GraphConstruction(format!(
                "self-relationship on {source:?}"
            )));
        }
        let weight = checked_unit(relationship.weight, "weight")?;

        if weight < self.config.min_edge_weight {
            debug!(
                "Filtered relationship {} -> {} (weight {} < {})",
                source, target, weight, self.config.min_edge_weight
            );
            return Ok(EdgeOutcome::Filtered);
        }

        let missing = [source, target]
            .iter()
            .filter(|name| !self.name_to_node.contains_key(**name))
            .count();
        self.ensure_capacity(missing)?;

        let a = self.node_or_placeholder(source);
        let b = self.node_or_placeholder(target);
        let existed = self.graph.find_edge(a, b).is_some();
        let relationship_type = if relationship.relationship_type.trim().is_empty() {
            crate::models::DEFAULT_RELATIONSHIP_TYPE.to_string()
        } else {
            relationship.relationship_type.trim().to_string()
        };
        self.graph.update_edge(
            a,
            b,
            RelationEdge {
                relationship_type,
                weight,
            },
        );

        Ok(if existed {
            EdgeOutcome::Updated
        } else {
            EdgeOutcome::Added
        })
    }

    fn ensure_capacity(&self, additional: usize) -> Result<(), ResearchError> {
        if self.graph.node_count() + additional > self.config.max_nodes {
            return Err(ResearchError::GraphConstruction(format!(
                "node limit of {} reached",
                self.config.max_nodes
            )));
        }
        Ok(())
    }

    fn insert_node(&mut self, node: EntityNode) -> NodeIndex {
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.name_to_node.insert(name, idx);
        idx
    }

    fn node_or_placeholder(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.name_to_node.get(name) {
            return *idx;
        }
        self.insert_node(EntityNode {
            name: name.to_string(),
            entity_type: UNKNOWN_ENTITY_TYPE.to_string(),
            importance: DEFAULT_IMPORTANCE,
        })
    }

    fn positions(&self) -> Vec<(f64, f64)> {
        let edges: Vec<(usize, usize, f64)> = self
            .graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().weight as f64))
            .collect();
        compute_layout(
            self.graph.node_count(),
            &edges,
            LayoutParams {
                algorithm: self.config.layout_algorithm,
                seed: self.config.layout_seed,
                iterations: self.config.layout_iterations,
            },
        )
    }

    /// Renders nodes with layout coordinates and scaled sizes.
    ///
    /// An empty graph renders as `{"nodes": [], "edges": []}`.
    pub fn render(&self) -> Visualization {
        if self.is_empty() {
            return Visualization::empty();
        }

        let positions = self.positions();
        let nodes = self
            .graph
            .node_indices()
            .zip(positions)
            .map(|(idx, (x, y))| {
                let node = &self.graph[idx];
                VisualNode {
                    id: node.name.clone(),
                    label: node.name.clone(),
                    node_type: node.entity_type.clone(),
                    size: node.importance * self.config.node_size_scale,
                    importance: node.importance,
                    x,
                    y,
                }
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|e| VisualEdge {
                source: self.graph[e.source()].name.clone(),
                target: self.graph[e.target()].name.clone(),
                edge_type: e.weight().relationship_type.clone(),
                weight: e.weight().weight,
                width: e.weight().weight * self.config.edge_width_scale,
            })
            .collect();

        Visualization {
            nodes,
            edges,
            metadata: Some(VisualizationMetadata {
                node_count: self.graph.node_count(),
                edge_count: self.graph.edge_count(),
                layout_algorithm: self.config.layout_algorithm,
            }),
        }
    }

    /// Top `k` entities by eigenvector centrality, highest first.
    ///
    /// Ties keep insertion order.
    pub fn central_entities(&self, k: usize) -> Vec<CentralEntity> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let edges: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect();
        let scores = eigenvector_centrality(self.graph.node_count(), &edges);

        let mut ranked: Vec<(NodeIndex, f64)> = self.graph.node_indices().zip(scores).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(idx, centrality)| {
                let node = &self.graph[idx];
                CentralEntity {
                    entity: node.name.clone(),
                    entity_type: node.entity_type.clone(),
                    importance: node.importance,
                    centrality,
                }
            })
            .collect()
    }
}

fn checked_name(name: &str) -> Result<&str, ResearchError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ResearchError::GraphConstruction("blank entity name".into()));
    }
    Ok(trimmed)
}

fn checked_unit(value: f32, field: &str) -> Result<f32, ResearchError> {
    if !value.is_finite() {
        return Err(ResearchError::GraphConstruction(format!(
            "non-finite {field}: {value}"
        )));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Builds graphs from extracted entities and relationships
#[derive(Debug, Clone)]
pub struct EntityGraphBuilder {
    config: GraphConfig,
}

impl EntityGraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Builds a graph, skipping items that cannot be inserted
    pub fn build(
        &self,
        entities: &[EntityInput],
        relationships: &[RelationshipInput],
    ) -> ResearchGraph {
        let mut graph = ResearchGraph::new(self.config.clone());

        for entity in entities {
            if let Err(e) = graph.upsert_entity(entity) {
                warn!("Skipping entity {:?}: {}", entity.name, e);
            }
        }

        let mut filtered = 0;
        for relationship in relationships {
            match graph.add_relationship(relationship) {
                Ok(EdgeOutcome::Filtered) => filtered += 1,
                Ok(_) => {}
                Err(e) => warn!(
                    "Skipping relationship {:?} -> {:?}: {}",
                    relationship.source, relationship.target, e
                ),
            }
        }

        debug!(
            "Built entity graph: {} nodes, {} edges, {} relationships below weight threshold",
            graph.node_count(),
            graph.edge_count(),
            filtered
        );
        graph
    }
}
