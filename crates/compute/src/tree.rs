//! Binary operation tree produced by the parser and consumed by the scheduler.
//!
//! A node is either a resolved [`OperationNode::Leaf`] or an
//! [`OperationNode::Internal`] operator that exclusively owns its two
//! children. The only way an internal node changes variant is
//! [`OperationNode::collapse`], which turns it into a leaf once the result of
//! its task arrives.

use std::fmt;

use tally_core::Operator;

#[derive(Debug, Clone, PartialEq)]
pub enum OperationNode {
    Leaf(f64),
    Internal {
        operator: Operator,
        left: Box<OperationNode>,
        right: Box<OperationNode>,
        /// Set once, when a task is created for this node.
        task_emitted: bool,
    },
}

/// Which child to descend into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Left,
    Right,
}

/// Route from the root to a node. Stable for as long as the addressed node
/// is internal: ancestors cannot collapse before their descendants do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<Branch>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, branch: Branch) -> Self {
        let mut steps = self.0.clone();
        steps.push(branch);
        Self(steps)
    }

    pub fn steps(&self) -> &[Branch] {
        &self.0
    }
}

/// Why a collapse was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CollapseError {
    #[error("node is already a leaf")]
    AlreadyLeaf,
    #[error("no task was emitted for this node")]
    NotEmitted,
    #[error("node still has unresolved children")]
    ChildrenUnresolved,
}

impl OperationNode {
    pub fn leaf(value: f64) -> Self {
        OperationNode::Leaf(value)
    }

    pub fn internal(operator: Operator, left: OperationNode, right: OperationNode) -> Self {
        OperationNode::Internal {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            task_emitted: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, OperationNode::Leaf(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            OperationNode::Leaf(v) => Some(*v),
            OperationNode::Internal { .. } => None,
        }
    }

    /// An internal node whose children are both leaves and has no task yet.
    pub fn is_ready(&self) -> bool {
        match self {
            OperationNode::Internal { left, right, task_emitted, .. } => {
                !task_emitted && left.is_leaf() && right.is_leaf()
            }
            OperationNode::Leaf(_) => false,
        }
    }

    /// Number of internal nodes in the subtree.
    pub fn internal_count(&self) -> usize {
        match self {
            OperationNode::Leaf(_) => 0,
            OperationNode::Internal { left, right, .. } => {
                1 + left.internal_count() + right.internal_count()
            }
        }
    }

    pub fn at_path(&self, path: &NodePath) -> Option<&OperationNode> {
        let mut node = self;
        for step in path.steps() {
            node = match (node, step) {
                (OperationNode::Internal { left, .. }, Branch::Left) => &**left,
                (OperationNode::Internal { right, .. }, Branch::Right) => &**right,
                (OperationNode::Leaf(_), _) => return None,
            };
        }
        Some(node)
    }

    pub fn at_path_mut(&mut self, path: &NodePath) -> Option<&mut OperationNode> {
        let mut node = self;
        for step in path.steps() {
            node = match (node, step) {
                (OperationNode::Internal { left, .. }, Branch::Left) => &mut **left,
                (OperationNode::Internal { right, .. }, Branch::Right) => &mut **right,
                (OperationNode::Leaf(_), _) => return None,
            };
        }
        Some(node)
    }

    /// Replace an emitted internal node with the leaf `value`. The children
    /// are dropped.
    pub fn collapse(&mut self, value: f64) -> Result<(), CollapseError> {
        match self {
            OperationNode::Leaf(_) => Err(CollapseError::AlreadyLeaf),
            OperationNode::Internal { task_emitted: false, .. } => Err(CollapseError::NotEmitted),
            OperationNode::Internal { left, right, .. } if !(left.is_leaf() && right.is_leaf()) => {
                Err(CollapseError::ChildrenUnresolved)
            }
            OperationNode::Internal { .. } => {
                *self = OperationNode::Leaf(value);
                Ok(())
            }
        }
    }

    /// Evaluate locally. Used to cross-check distributed results in tests and
    /// never by the scheduler itself.
    pub fn evaluate(&self) -> f64 {
        match self {
            OperationNode::Leaf(v) => *v,
            OperationNode::Internal { operator, left, right, .. } => {
                apply(*operator, left.evaluate(), right.evaluate())
            }
        }
    }
}

/// Apply a binary operator with IEEE semantics.
pub fn apply(operator: Operator, lhs: f64, rhs: f64) -> f64 {
    match operator {
        Operator::Add => lhs + rhs,
        Operator::Sub => lhs - rhs,
        Operator::Mul => lhs * rhs,
        Operator::Div => lhs / rhs,
    }
}

/// Prefix notation: `+(2, *(3, 4))`.
impl fmt::Display for OperationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationNode::Leaf(v) => write!(f, "{}", v),
            OperationNode::Internal { operator, left, right, .. } => {
                write!(f, "{}({}, {})", operator, left, right)
            }
        }
    }
}
