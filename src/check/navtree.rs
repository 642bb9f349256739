//! Navigation tree lookups

use crate::session::protocol::NavigationTree;

/// Find the most deeply nested node with a span covering `line` (1-based)
///
/// When several nodes at the same depth cover the line, the first one in
/// document order wins.
pub fn find_node_at(tree: &NavigationTree, line: u32) -> Option<&NavigationTree> {
    find_deepest(tree, line, 0).map(|(node, _)| node)
}

fn find_deepest(node: &NavigationTree, line: u32, depth: usize) -> Option<(&NavigationTree, usize)> {
    let mut best = covers(node, line).then_some((node, depth));

    for child in &node.child_items {
        if let Some((found, found_depth)) = find_deepest(child, line, depth + 1)
            && best.is_none_or(|(_, best_depth)| found_depth > best_depth)
        {
            best = Some((found, found_depth));
        }
    }

    best
}

fn covers(node: &NavigationTree, line: u32) -> bool {
    node.spans.iter().any(|span| span.contains_line(line))
}
