//! Bandit policies for node selection.
//!
//! A policy owns three capabilities: initializing side state on a freshly
//! created node, choosing one arm among the children available at a
//! decision point, and folding a simulated outcome back into a node's
//! statistics. Two concrete policies are provided:
//!
//! - [`Ucb1`]: the UCB1/LCB1 confidence bound of Cowling et al. (2012),
//!   `reward/n + k * sqrt(ln(n') / n)`, maximized from the perspective of
//!   the seat that acts.
//! - [`ContextualBandit`]: an online ridge-regression bandit that predicts
//!   each arm's value from the node's choice distribution and converts the
//!   predictions into a categorical sampling distribution.

use std::fmt;

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use game_core::{Score, Seat};

use crate::config::{ConfigError, SearchConfig};
use crate::node::{ArmState, ContextualArms, NodeId};
use crate::tree::SearchTree;

/// Errors raised during arm selection or statistics updates.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("no arms available for selection")]
    NoArmsAvailable,

    #[error("selection distribution produced a negative probability {value} for arm {arm}")]
    NegativeProbability { arm: usize, value: f64 },

    #[error("selection distribution has zero total mass")]
    ZeroMass,

    #[error("node has {children} children but regression state holds {capacity} arms")]
    ArmCapacityExceeded { children: usize, capacity: usize },

    #[error("node statistics are not owned by this policy")]
    ForeignNode,
}

/// Which direction a decision point optimizes in. Seats on team 0 maximize
/// the team-0-relative outcome, seats on team 1 minimize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Max,
    Min,
}

impl Side {
    fn of(seat: Seat) -> Self {
        if seat.team() == 0 {
            Side::Max
        } else {
            Side::Min
        }
    }
}

/// A strategy for selecting among and scoring the arms of a decision node.
///
/// Exactly one policy owns a node's statistics for the node's lifetime.
/// `seat` is always the seat that acts at the node in question.
pub trait BanditPolicy<A: Copy + Eq + fmt::Debug, O: Score> {
    /// Set up side state for a freshly created node with `arms` legal
    /// actions at its position.
    fn init_node(&self, tree: &mut SearchTree<A, O>, id: NodeId, arms: usize);

    /// Pick one child among those currently available.
    fn choose_arm(
        &self,
        tree: &SearchTree<A, O>,
        id: NodeId,
        available: &[(A, NodeId)],
        seat: Seat,
        rng: &mut ChaCha20Rng,
    ) -> Result<(A, NodeId), PolicyError>;

    /// Fold a simulated outcome into the node's statistics. `terminal` is
    /// true when the node's own position ended the game, which freezes the
    /// node as a leaf carrying the exact outcome.
    fn update(
        &self,
        tree: &mut SearchTree<A, O>,
        id: NodeId,
        seat: Seat,
        outcome: &O,
        terminal: bool,
    ) -> Result<(), PolicyError>;
}

/// A confidence-bound score. Arms that were never visited, or never yet
/// available at their decision point, sort above every bounded score so
/// that selection is forced to explore them first; this is the defined
/// sentinel for statistics that would otherwise divide by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ArmScore {
    Unexplored,
    Bounded(f64),
}

impl ArmScore {
    /// Whether `self` strictly beats `other` for selection.
    fn beats(self, other: ArmScore) -> bool {
        match (self, other) {
            (ArmScore::Unexplored, ArmScore::Unexplored) => false,
            (ArmScore::Unexplored, ArmScore::Bounded(_)) => true,
            (ArmScore::Bounded(_), ArmScore::Unexplored) => false,
            (ArmScore::Bounded(a), ArmScore::Bounded(b)) => a > b,
        }
    }
}

/// UCB1/LCB1 confidence bound selection.
///
/// Every decision point maximizes the acting seat's view of the reward, so
/// the minimizing LCB1 direction for the opposing side falls out of the
/// sign flip in [`Score::signed_for`] rather than a separate formula.
#[derive(Debug, Clone)]
pub struct Ucb1 {
    /// Exploration constant `k`; 0.75 per Cowling et al. (2012).
    pub exploration: f64,
}

impl Ucb1 {
    pub fn new(exploration: f64) -> Self {
        Self { exploration }
    }

    /// Build from a validated configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.exploration))
    }

    fn score<A: Copy + Eq, O: Score>(&self, node: &crate::node::SearchNode<A, O>, seat: Seat) -> ArmScore {
        if node.leaf {
            // Terminal arms carry their exact outcome; no exploration bonus.
            return ArmScore::Bounded(node.r.signed_for(seat));
        }
        if node.n == 0 || node.n_accent == 0 {
            return ArmScore::Unexplored;
        }
        let n = node.n as f64;
        let exploit = node.r.signed_for(seat) / n;
        let explore = self.exploration * ((node.n_accent as f64).ln() / n).sqrt();
        ArmScore::Bounded(exploit + explore)
    }
}

impl<A: Copy + Eq + fmt::Debug, O: Score> BanditPolicy<A, O> for Ucb1 {
    fn init_node(&self, _tree: &mut SearchTree<A, O>, _id: NodeId, _arms: usize) {
        // Shared counters are all this policy needs.
    }

    fn choose_arm(
        &self,
        tree: &SearchTree<A, O>,
        _id: NodeId,
        available: &[(A, NodeId)],
        seat: Seat,
        _rng: &mut ChaCha20Rng,
    ) -> Result<(A, NodeId), PolicyError> {
        let mut best: Option<((A, NodeId), ArmScore)> = None;
        for &(action, child_id) in available {
            let score = self.score(tree.get(child_id), seat);
            match &best {
                Some((_, current)) if !score.beats(*current) => {}
                _ => best = Some(((action, child_id), score)),
            }
        }
        best.map(|(arm, _)| arm).ok_or(PolicyError::NoArmsAvailable)
    }

    fn update(
        &self,
        tree: &mut SearchTree<A, O>,
        id: NodeId,
        _seat: Seat,
        outcome: &O,
        terminal: bool,
    ) -> Result<(), PolicyError> {
        let node = tree.get_mut(id);
        node.n += 1;
        if terminal {
            // Exact outcome, never averaged.
            node.leaf = true;
            node.r = outcome.clone();
        } else if !node.leaf {
            // A leaf visited mid-game by another determinization keeps its
            // exact reward; only the visit is counted.
            node.r.accumulate(outcome);
        }
        Ok(())
    }
}

/// Contextual bandit with online ridge regression (CBandit).
///
/// Per node it maintains a selection distribution `p` over arms and a
/// ridge-regression model predicting the node's value from `p`. Updates
/// rebuild `p` from each arm's predicted value (exact reward for leaf
/// arms), then fold the observed outcome into the regression with a
/// Sherman-Morrison rank-one update. Selection samples from `p`.
#[derive(Debug, Clone)]
pub struct ContextualBandit {
    /// Ridge regularization scale; the larger, the flatter `p` stays.
    pub nu: f64,
    /// Softmax sharpness; the larger, the greedier `p` becomes.
    pub gamma: f64,
}

impl ContextualBandit {
    /// Create a policy, rejecting tunables that could ever produce a
    /// negative arm probability for a decision point with up to
    /// `max_arms` arms.
    pub fn new(nu: f64, gamma: f64, max_arms: usize) -> Result<Self, ConfigError> {
        if !nu.is_finite() || nu <= 0.0 {
            return Err(ConfigError::BadNu(nu));
        }
        if !gamma.is_finite() || gamma < 0.0 {
            return Err(ConfigError::BadGamma(gamma));
        }
        // Each non-best arm gets at most 1/nu mass, so nu below K-1
        // lets the best arm's complement probability go negative.
        if max_arms > 1 && nu < (max_arms - 1) as f64 {
            return Err(ConfigError::NuTooSmall { nu, arms: max_arms });
        }
        Ok(Self { nu, gamma })
    }

    /// Build from a configuration, filling unset tunables with the
    /// schedule of the reference algorithm: `nu = K` and
    /// `gamma = sqrt(2 K iter / sqrt(iter))` for root branching factor `K`.
    pub fn from_config(config: &SearchConfig, root_arms: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let k = root_arms as f64;
        let iter = config.iterations as f64;
        let nu = config.nu.unwrap_or(k);
        let gamma = config
            .gamma
            .unwrap_or_else(|| (2.0 * k * iter / iter.sqrt()).sqrt());
        Self::new(nu, gamma, root_arms)
    }

    /// Rebuild the node's selection distribution from its arms' predicted
    /// values: with `j` the best arm for the acting side, every other arm
    /// `i` gets `1 / (nu + gamma * gap_i)` where `gap_i >= 0` is its
    /// distance to the best prediction, and `j` absorbs the remainder so
    /// the distribution sums to one.
    fn rebuild_distribution<A: Copy + Eq, O: Score>(
        &self,
        tree: &mut SearchTree<A, O>,
        id: NodeId,
        side: Side,
    ) -> Result<(), PolicyError> {
        let node = tree.get(id);
        let children: Vec<NodeId> = node.children.iter().map(|(_, c)| *c).collect();
        let capacity = match node.contextual() {
            Some(arms) => arms.capacity(),
            None => return Err(PolicyError::ForeignNode),
        };
        if children.len() > capacity {
            return Err(PolicyError::ArmCapacityExceeded {
                children: children.len(),
                capacity,
            });
        }

        // Predicted value per existing arm; exact outcome for leaf arms.
        let pi: Vec<f64> = children
            .iter()
            .map(|&c| {
                let child = tree.get(c);
                if child.leaf {
                    child.r.value()
                } else {
                    child
                        .contextual()
                        .map(ContextualArms::prediction)
                        .unwrap_or(0.0)
                }
            })
            .collect();

        let j = match side {
            Side::Max => argmax(&pi),
            Side::Min => argmin(&pi),
        };

        let mut p = vec![0.0; capacity];
        let mut mass = 0.0;
        for (idx, &pi_i) in pi.iter().enumerate() {
            if idx == j {
                continue;
            }
            let gap = match side {
                Side::Max => pi[j] - pi_i,
                Side::Min => pi_i - pi[j],
            };
            let w = 1.0 / (self.nu + self.gamma * gap);
            p[idx] = w;
            mass += w;
        }
        let best = 1.0 - mass;
        if best < -1e-9 {
            return Err(PolicyError::NegativeProbability { arm: j, value: best });
        }
        p[j] = best.max(0.0);

        if let ArmState::Contextual(arms) = &mut tree.get_mut(id).arms {
            for (idx, w) in p.into_iter().enumerate() {
                arms.p[idx] = w;
            }
        }
        Ok(())
    }
}

impl<A: Copy + Eq + fmt::Debug, O: Score> BanditPolicy<A, O> for ContextualBandit {
    fn init_node(&self, tree: &mut SearchTree<A, O>, id: NodeId, arms: usize) {
        tree.get_mut(id).arms = ArmState::Contextual(Box::new(ContextualArms::new(arms)));
    }

    fn choose_arm(
        &self,
        tree: &SearchTree<A, O>,
        id: NodeId,
        available: &[(A, NodeId)],
        _seat: Seat,
        rng: &mut ChaCha20Rng,
    ) -> Result<(A, NodeId), PolicyError> {
        if available.is_empty() {
            return Err(PolicyError::NoArmsAvailable);
        }
        let node = tree.get(id);
        let arms = node.contextual().ok_or(PolicyError::ForeignNode)?;

        // Weight of each available arm under the node's distribution,
        // keyed by the arm's insertion ordinal.
        let mut weighted: Vec<((A, NodeId), f64)> = Vec::with_capacity(available.len());
        let mut total = 0.0;
        for (ordinal, entry) in node.children.iter().enumerate() {
            if !available.contains(entry) {
                continue;
            }
            let w = if ordinal < arms.capacity() {
                arms.p[ordinal]
            } else {
                0.0
            };
            weighted.push((*entry, w));
            total += w;
        }
        if total <= 0.0 {
            return Err(PolicyError::ZeroMass);
        }

        let mut t: f64 = rng.gen::<f64>() * total;
        for &(arm, w) in &weighted {
            t -= w;
            if t <= 0.0 {
                return Ok(arm);
            }
        }
        // Floating-point slack: fall back to the last positive-weight arm.
        weighted
            .into_iter()
            .rev()
            .find(|&(_, w)| w > 0.0)
            .map(|(arm, _)| arm)
            .ok_or(PolicyError::ZeroMass)
    }

    fn update(
        &self,
        tree: &mut SearchTree<A, O>,
        id: NodeId,
        seat: Seat,
        outcome: &O,
        terminal: bool,
    ) -> Result<(), PolicyError> {
        {
            let node = tree.get_mut(id);
            if node.contextual().is_none() {
                return Err(PolicyError::ForeignNode);
            }
            node.n += 1;
            if terminal {
                node.leaf = true;
                node.r = outcome.clone();
                return Ok(());
            }
            if node.leaf {
                // Exact reward stands even when a sample passes through
                // this node mid-game.
                return Ok(());
            }
            node.r.accumulate(outcome);
        }

        if tree.get(id).children.is_empty() {
            return Ok(());
        }

        self.rebuild_distribution(tree, id, Side::of(seat))?;

        let score = outcome.value();
        if let ArmState::Contextual(arms) = &mut tree.get_mut(id).arms {
            arms.observe(score);
        }
        Ok(())
    }
}

/// Index of the first maximal element.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = idx;
        }
    }
    best
}

/// Index of the first minimal element.
fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::ScalarScore;
    use rand::SeedableRng;

    type Tree = SearchTree<u8, ScalarScore>;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn test_ucb_forced_exploration() {
        // Two children with n = {1, 0}: the unvisited arm must always win.
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), 0);
        let b = tree.add_child(tree.root(), 1);
        tree.get_mut(a).n = 1;
        tree.get_mut(a).n_accent = 1;
        tree.get_mut(a).r = ScalarScore(1.0);

        let policy = Ucb1::new(0.75);
        let available = tree.available_children(tree.root(), &[0, 1]);
        for _ in 0..10 {
            let (action, id) = policy
                .choose_arm(&tree, tree.root(), &available, Seat(0), &mut rng())
                .unwrap();
            assert_eq!((action, id), (1, b));
        }
    }

    #[test]
    fn test_ucb_prefers_higher_reward() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), 0);
        let b = tree.add_child(tree.root(), 1);
        for (id, reward) in [(a, 9.0), (b, 1.0)] {
            let node = tree.get_mut(id);
            node.n = 10;
            node.n_accent = 10;
            node.r = ScalarScore(reward);
        }
        let policy = Ucb1::new(0.75);
        let available = tree.available_children(tree.root(), &[0, 1]);
        let (action, _) = policy
            .choose_arm(&tree, tree.root(), &available, Seat(0), &mut rng())
            .unwrap();
        assert_eq!(action, 0);
        // The minimizing seat flips the preference.
        let (action, _) = policy
            .choose_arm(&tree, tree.root(), &available, Seat(1), &mut rng())
            .unwrap();
        assert_eq!(action, 1);
    }

    #[test]
    fn test_ucb_leaf_score_is_exact() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), 0);
        let b = tree.add_child(tree.root(), 1);
        // Leaf with a certain win beats a well-visited mediocre arm.
        let leaf = tree.get_mut(a);
        leaf.leaf = true;
        leaf.n = 1;
        leaf.r = ScalarScore(1.0);
        let other = tree.get_mut(b);
        other.n = 100;
        other.n_accent = 100;
        other.r = ScalarScore(20.0);

        let policy = Ucb1::new(0.75);
        let available = tree.available_children(tree.root(), &[0, 1]);
        let (action, _) = policy
            .choose_arm(&tree, tree.root(), &available, Seat(0), &mut rng())
            .unwrap();
        assert_eq!(action, 0);
    }

    #[test]
    fn test_ucb_update_accumulates() {
        let mut tree = Tree::new();
        let policy = Ucb1::new(0.75);
        let root = tree.root();
        policy
            .update(&mut tree, root, Seat(0), &ScalarScore(1.0), false)
            .unwrap();
        policy
            .update(&mut tree, root, Seat(0), &ScalarScore(0.5), false)
            .unwrap();
        assert_eq!(tree.get(root).n, 2);
        assert!((tree.get(root).r.0 - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_contextual_rejects_bad_tunables() {
        assert!(matches!(
            ContextualBandit::new(-1.0, 1.0, 4),
            Err(ConfigError::BadNu(_))
        ));
        assert!(matches!(
            ContextualBandit::new(4.0, f64::NAN, 4),
            Err(ConfigError::BadGamma(_))
        ));
        // nu below K-1 admits negative probabilities: rejected up front.
        assert!(matches!(
            ContextualBandit::new(1.5, 1.0, 4),
            Err(ConfigError::NuTooSmall { .. })
        ));
        assert!(ContextualBandit::new(3.0, 1.0, 4).is_ok());
    }

    #[test]
    fn test_contextual_defaults_from_config() {
        let config = SearchConfig::default().with_policy(crate::config::PolicyKind::Contextual);
        let policy = ContextualBandit::from_config(&config, 9).unwrap();
        assert!((policy.nu - 9.0).abs() < 1e-9);
        // gamma = sqrt(2 * 9 * 1000 / sqrt(1000))
        let expected = (2.0 * 9.0 * 1000.0 / 1000.0_f64.sqrt()).sqrt();
        assert!((policy.gamma - expected).abs() < 1e-9);
    }

    #[test]
    fn test_contextual_distribution_sums_to_one() {
        let mut tree = Tree::new();
        let policy = ContextualBandit::new(4.0, 2.0, 4).unwrap();
        let root = tree.root();
        policy.init_node(&mut tree, root, 3);
        for action in 0..3 {
            let child = tree.add_child(root, action);
            policy.init_node(&mut tree, child, 2);
            policy
                .update(&mut tree, child, Seat(1), &ScalarScore(action as f64), false)
                .unwrap();
        }
        policy
            .update(&mut tree, root, Seat(0), &ScalarScore(1.0), false)
            .unwrap();

        let arms = tree.get(root).contextual().unwrap();
        assert!((arms.p.sum() - 1.0).abs() < 1e-9);
        assert!(arms.p.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_contextual_samples_only_available_arms() {
        let mut tree = Tree::new();
        let policy = ContextualBandit::new(4.0, 2.0, 4).unwrap();
        let root = tree.root();
        policy.init_node(&mut tree, root, 3);
        let a = tree.add_child(root, 0);
        let b = tree.add_child(root, 1);
        tree.add_child(root, 2);
        for id in [a, b] {
            policy.init_node(&mut tree, id, 1);
        }

        // Only actions 0 and 1 are legal under this determinization.
        let available = tree.available_children(root, &[0, 1]);
        let mut r = rng();
        for _ in 0..50 {
            let (action, _) = policy
                .choose_arm(&tree, root, &available, Seat(0), &mut r)
                .unwrap();
            assert!(action < 2);
        }
    }

    #[test]
    fn test_contextual_update_rejects_foreign_node() {
        // A node initialized by the confidence-bound policy must never be
        // adopted by the contextual one.
        let mut tree = Tree::new();
        let root = tree.root();
        let ucb = Ucb1::new(0.75);
        <Ucb1 as BanditPolicy<u8, ScalarScore>>::init_node(&ucb, &mut tree, root, 2);

        let policy = ContextualBandit::new(4.0, 2.0, 4).unwrap();
        let err = policy
            .update(&mut tree, root, Seat(0), &ScalarScore(1.0), false)
            .unwrap_err();
        assert!(matches!(err, PolicyError::ForeignNode));
    }
}
