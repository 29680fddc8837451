//! Participant and room descriptors from timetable markup.

use super::dom::Fragment;
use super::models::Entity;

/// One [`Entity`] per node, in document order.
///
/// The name is the node's text and the link is the `href` of its first
/// anchor. Links are passed through as written.
pub fn extract_entities<F: Fragment>(nodes: &[F]) -> Vec<Entity> {
    nodes.iter().map(extract_entity).collect()
}

/// Entity described by a single node. A node without text yields an empty name.
pub fn extract_entity<F: Fragment>(node: &F) -> Entity {
    Entity {
        name: node.text().unwrap_or_default(),
        link: node.select_first("a").and_then(|a| a.attr("href")),
    }
}
