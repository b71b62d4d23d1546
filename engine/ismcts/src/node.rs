//! Search tree node representation.
//!
//! Each node represents a decision point reached by playing an action from
//! its parent. Nodes carry the visit and availability statistics the bandit
//! policies select on, plus policy-specific side state.

use ndarray::{Array1, Array2, Axis};

use game_core::Score;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// Ridge-regression side state for the contextual bandit.
///
/// Per decision node the contextual policy keeps a selection distribution
/// `p` over its arms and an online ridge-regression model: the accumulator
/// `b`, the inverse design matrix `a_inv` (identity prior) and the current
/// coefficient estimate `mu_hat`. All vectors are sized to the number of
/// legal actions when the node was created.
#[derive(Debug, Clone)]
pub struct ContextualArms {
    /// Selection distribution over arms, indexed by child insertion order.
    pub p: Array1<f64>,
    /// Reward-weighted choice accumulator.
    pub b: Array1<f64>,
    /// Inverse of the regularized design matrix.
    pub a_inv: Array2<f64>,
    /// Current ridge-regression coefficient estimate, `b . a_inv`.
    pub mu_hat: Array1<f64>,
}

impl ContextualArms {
    /// Fresh regression state for a node with `arms` legal actions:
    /// uniform `p` and `mu_hat`, zero `b`, identity `a_inv`.
    pub fn new(arms: usize) -> Self {
        let uniform = if arms == 0 { 0.0 } else { 1.0 / arms as f64 };
        Self {
            p: Array1::from_elem(arms, uniform),
            b: Array1::zeros(arms),
            a_inv: Array2::eye(arms),
            mu_hat: Array1::from_elem(arms, uniform),
        }
    }

    /// Number of arms this state was sized for.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.p.len()
    }

    /// Predicted value of this node, `dot(p, mu_hat)`.
    #[inline]
    pub fn prediction(&self) -> f64 {
        self.p.dot(&self.mu_hat)
    }

    /// Fold one observed outcome into the regression model.
    ///
    /// Accumulates `b += score * p` and applies the Sherman-Morrison
    /// rank-one update of the design-matrix inverse: with `x = a_inv . p`,
    /// `a_inv -= (x x^T) / (1 + p^T x)`. Recomputing `mu_hat = b . a_inv`
    /// afterwards keeps the coefficient estimate current in O(k^2) per
    /// observation instead of re-solving the ridge system.
    pub fn observe(&mut self, score: f64) {
        if self.capacity() == 0 {
            return;
        }
        self.b.scaled_add(score, &self.p);

        let x = self.a_inv.dot(&self.p);
        let denom = 1.0 + self.p.dot(&x);
        let outer = x
            .view()
            .insert_axis(Axis(1))
            .dot(&x.view().insert_axis(Axis(0)));
        self.a_inv -= &(outer / denom);

        self.mu_hat = self.b.dot(&self.a_inv);
    }
}

/// Which bandit policy owns a node's side state.
///
/// Exactly one policy initializes a node and owns its statistics for the
/// node's entire lifetime; the enum keeps the contextual payload undefined
/// for confidence-bound nodes instead of leaving stale fields around.
#[derive(Debug, Clone)]
pub enum ArmState {
    /// Confidence-bound policies need nothing beyond the shared counters.
    Plain,
    /// Contextual policy regression state.
    Contextual(Box<ContextualArms>),
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct SearchNode<A, O> {
    /// Parent node index (NONE for the root).
    pub parent: NodeId,

    /// Action that led to this node from the parent; `None` at the root.
    pub prev_move: Option<A>,

    /// Distance from the root.
    pub depth: u32,

    /// Visit count: times this node terminated a selection path.
    pub n: u32,

    /// Availability count: times this node was a selectable sibling of the
    /// child actually taken at its parent's decision point.
    pub n_accent: u32,

    /// Accumulated reward, or the exact outcome once `leaf` is set.
    pub r: O,

    /// True once this node's position is terminal. A leaf's reward is the
    /// exact game outcome and is never averaged; leaves are never expanded.
    pub leaf: bool,

    /// Children as (action, node) pairs in insertion order.
    pub children: Vec<(A, NodeId)>,

    /// Policy side state, owned by the policy that initialized the node.
    pub arms: ArmState,
}

impl<A: Copy + Eq, O: Score> SearchNode<A, O> {
    /// Create the root node.
    pub fn new_root() -> Self {
        Self {
            parent: NodeId::NONE,
            prev_move: None,
            depth: 0,
            n: 0,
            n_accent: 0,
            r: O::default(),
            leaf: false,
            children: Vec::new(),
            arms: ArmState::Plain,
        }
    }

    /// Create a child of `parent` reached by `action`.
    pub fn new_child(parent: NodeId, depth: u32, action: A) -> Self {
        Self {
            parent,
            prev_move: Some(action),
            depth,
            n: 0,
            n_accent: 0,
            r: O::default(),
            leaf: false,
            children: Vec::new(),
            arms: ArmState::Plain,
        }
    }

    /// The contextual side state, if this node is owned by the contextual
    /// policy.
    #[inline]
    pub fn contextual(&self) -> Option<&ContextualArms> {
        match &self.arms {
            ArmState::Contextual(c) => Some(c),
            ArmState::Plain => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::ScalarScore;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node: SearchNode<u8, ScalarScore> = SearchNode::new_root();
        assert!(node.parent.is_none());
        assert_eq!(node.depth, 0);
        assert_eq!(node.n, 0);
        assert!(!node.leaf);
        assert!(node.children.is_empty());
        assert!(node.contextual().is_none());
    }

    #[test]
    fn test_contextual_arms_init() {
        let arms = ContextualArms::new(4);
        assert_eq!(arms.capacity(), 4);
        assert!((arms.p.sum() - 1.0).abs() < 1e-12);
        assert!((arms.mu_hat.sum() - 1.0).abs() < 1e-12);
        assert!(arms.b.iter().all(|&v| v == 0.0));
        // Identity prior on the inverse design matrix.
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((arms.a_inv[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_observe_accumulates_b() {
        let mut arms = ContextualArms::new(2);
        arms.observe(4.0);
        // b = 4 * p = [2, 2]
        assert!((arms.b[0] - 2.0).abs() < 1e-9);
        assert!((arms.b[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_score_keeps_mu_hat_at_zero() {
        // With b = 0 the coefficient estimate is exactly zero no matter how
        // the design-matrix inverse moves.
        let mut arms = ContextualArms::new(3);
        arms.observe(0.0);
        let after_first = arms.mu_hat.clone();
        arms.observe(0.0);
        assert_eq!(arms.mu_hat, after_first);
        assert!(arms.mu_hat.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_score_near_converged_model() {
        // Once the design matrix has absorbed many observations of the same
        // choice vector, a zero-outcome update perturbs mu_hat only through
        // the (tiny) rank-one change of a_inv.
        let mut arms = ContextualArms::new(3);
        for _ in 0..100 {
            arms.observe(1.0);
        }
        let before = arms.mu_hat.clone();
        arms.observe(0.0);
        for (a, b) in arms.mu_hat.iter().zip(before.iter()) {
            assert!((a - b).abs() < 1e-2, "mu_hat drifted: {a} vs {b}");
        }
    }

    #[test]
    fn test_sherman_morrison_matches_direct_inverse() {
        // After one update, a_inv must equal (I + p p^T)^-1, which
        // Sherman-Morrison gives in closed form.
        let mut arms = ContextualArms::new(2);
        let p = arms.p.clone();
        arms.observe(1.0);

        let ppt = p
            .view()
            .insert_axis(Axis(1))
            .dot(&p.view().insert_axis(Axis(0)));
        let expected: Array2<f64> = Array2::eye(2) - &(ppt.clone() / (1.0 + p.dot(&p)));
        for i in 0..2 {
            for j in 0..2 {
                assert!((arms.a_inv[[i, j]] - expected[[i, j]]).abs() < 1e-12);
            }
        }
    }
}
