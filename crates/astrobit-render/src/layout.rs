//! Slot assignment: leaves take consecutive columns, splits centre over their children.

use astrobit_forest::{DecisionTree, NodeIndex};

use crate::RenderError;

/// One box to draw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placed {
    pub node: NodeIndex,
    pub depth: usize,
    /// Horizontal position in slot units.
    pub slot: f64,
    /// Position in the placement list of the parent box.
    pub parent: Option<usize>,
    /// Drawn as a `(...)` marker instead of a full box.
    pub collapsed: bool,
}

/// Placed boxes in preorder plus the layout extent.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub boxes: Vec<Placed>,
    pub n_slots: usize,
    pub max_depth: usize,
}

/// Lay out `tree`, collapsing every node deeper than `max_depth`.
pub(crate) fn layout(tree: &DecisionTree, max_depth: Option<usize>) -> Result<Layout, RenderError> {
    let mut state = Layout {
        boxes: Vec::with_capacity(tree.n_nodes()),
        n_slots: 0,
        max_depth: 0,
    };
    place(tree, NodeIndex::ROOT, 0, None, max_depth, &mut state)?;
    Ok(state)
}

fn place(
    tree: &DecisionTree,
    id: NodeIndex,
    depth: usize,
    parent: Option<usize>,
    max_depth: Option<usize>,
    state: &mut Layout,
) -> Result<f64, RenderError> {
    let node = tree
        .node(id)
        .ok_or(RenderError::MissingNode { node: id.index() })?;
    let collapsed = max_depth.is_some_and(|max| depth > max);
    let position = state.boxes.len();
    state.boxes.push(Placed {
        node: id,
        depth,
        slot: 0.0,
        parent,
        collapsed,
    });
    state.max_depth = state.max_depth.max(depth);

    let slot = match node.children() {
        Some((left, right)) if !collapsed => {
            let l = place(tree, left, depth + 1, Some(position), max_depth, state)?;
            let r = place(tree, right, depth + 1, Some(position), max_depth, state)?;
            (l + r) / 2.0
        }
        _ => {
            let s = state.n_slots as f64;
            state.n_slots += 1;
            s
        }
    };
    state.boxes[position].slot = slot;
    Ok(slot)
}
