use tally_core::Operator;

use crate::tree::{Branch, NodePath, OperationNode};

/// A node that qualified during a pass, with its operands copied out.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyOp {
    pub path: NodePath,
    pub operator: Operator,
    pub left: f64,
    pub right: f64,
}

/// Post-order walk that returns every ready node and sets its
/// `task_emitted` marker. Already-emitted nodes are skipped, so a second
/// call over the same tree returns nothing.
pub fn collect_ready(root: &mut OperationNode) -> Vec<ReadyOp> {
    let mut ready = Vec::new();
    visit(root, NodePath::root(), &mut ready);
    ready
}

fn visit(node: &mut OperationNode, path: NodePath, ready: &mut Vec<ReadyOp>) {
    let OperationNode::Internal { operator, left, right, task_emitted } = node else {
        return;
    };

    visit(left, path.child(Branch::Left), ready);
    visit(right, path.child(Branch::Right), ready);

    if *task_emitted {
        return;
    }
    if let (Some(l), Some(r)) = (left.value(), right.value()) {
        *task_emitted = true;
        ready.push(ReadyOp { path, operator: *operator, left: l, right: r });
    }
}

/// The ready set without marking anything.
pub fn ready_paths(root: &OperationNode) -> Vec<NodePath> {
    fn walk(node: &OperationNode, path: NodePath, out: &mut Vec<NodePath>) {
        if let OperationNode::Internal { left, right, .. } = node {
            walk(left, path.child(Branch::Left), out);
            walk(right, path.child(Branch::Right), out);
            if node.is_ready() {
                out.push(path);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, NodePath::root(), &mut out);
    out
}
