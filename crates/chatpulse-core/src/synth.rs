//! Activity graph synthesis.
//!
//! Synthesis is two-phase: [`DomainStats`] is computed once over the whole
//! batch, then every room is appended to the graph using those read-only
//! statistics. Node sizes are therefore relative to the current sampling
//! population.

use tracing::debug;

use crate::{
    ActivityBatch, ActivityGraph, ChannelActivity, ColorTable, DomainStats, GraphLink, GraphNode,
    MetricKey, Result, ScaleConfig,
};

pub fn metric_node_id(room_id: &str, metric: MetricKey) -> String {
    format!("{}-{}", room_id, metric)
}

pub fn metric_link_id(room_id: &str, metric: MetricKey) -> String {
    format!("{}-link-{}", room_id, metric)
}

pub struct GraphSynthesizer<'a> {
    stats: &'a DomainStats,
    colors: &'a ColorTable,
}

impl<'a> GraphSynthesizer<'a> {
    pub fn new(stats: &'a DomainStats, colors: &'a ColorTable) -> Self {
        Self { stats, colors }
    }

    /// Appends one entity node, four metric nodes and four entity->metric links.
    pub fn append_room(&self, graph: &mut ActivityGraph, activity: &ChannelActivity) {
        graph.nodes.push(GraphNode {
            id: activity.id.clone(),
            name: activity.name.clone(),
            node_type: activity.room_type.to_string(),
            color: self.colors.entity_color(activity).hex().to_string(),
            size: None,
            attributes: Vec::new(),
        });

        for metric in MetricKey::ALL {
            let value = activity.value(metric);
            let node_id = metric_node_id(&activity.id, metric);
            graph.nodes.push(GraphNode {
                id: node_id.clone(),
                name: format!("{}: {} - {}", activity.name, metric, value),
                node_type: metric.to_string(),
                color: self.colors.classify(activity, metric).hex().to_string(),
                size: Some(self.stats.size(metric, value)),
                attributes: Vec::new(),
            });
            graph.links.push(GraphLink {
                id: metric_link_id(&activity.id, metric),
                source_node_id: activity.id.clone(),
                target_node_id: node_id,
            });
        }
    }

    /// Builds the full graph, visiting rooms in name order.
    pub fn synthesize(&self, commit_message: &str, batch: &ActivityBatch) -> ActivityGraph {
        let mut graph = ActivityGraph::new(commit_message);
        for activity in batch.iter() {
            self.append_room(&mut graph, activity);
        }
        debug!(
            "Synthesized {} nodes and {} links for {} rooms",
            graph.nodes.len(),
            graph.links.len(),
            batch.len()
        );
        graph
    }
}

/// Computes the batch's domain statistics and synthesizes its graph.
///
/// Returns `EmptyBatch` when there is nothing to draw.
pub fn synthesize_graph(
    batch: &ActivityBatch,
    colors: &ColorTable,
    scale: ScaleConfig,
    commit_message: &str,
) -> Result<ActivityGraph> {
    let stats = DomainStats::compute(batch, scale)?;
    Ok(GraphSynthesizer::new(&stats, colors).synthesize(commit_message, batch))
}
