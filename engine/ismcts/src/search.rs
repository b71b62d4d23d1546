//! The search loop: select, expand, simulate, backpropagate.
//!
//! One live position is mutated in place along the selection path, extended
//! during expansion, and then unwound move by move during backpropagation,
//! so each iteration ends with the position exactly as it started. Rollouts
//! run on an independent copy and leave the live position alone.
//!
//! [`Mcts`] runs every iteration against the same position; [`Ismcts`]
//! samples a fresh determinization per iteration and filters each node's
//! children down to the actions that determinization allows.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use game_core::{GameError, GameState, Score};

use crate::config::{ConfigError, PolicyKind, SearchConfig};
use crate::determinize::DeterminizeError;
use crate::policy::{BanditPolicy, ContextualBandit, PolicyError, Ucb1};
use crate::tree::{SearchTree, TreeStats};

/// Errors that can occur during a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("game error: {0}")]
    Game(#[from] GameError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("determinization error: {0}")]
    Determinize(#[from] DeterminizeError),

    #[error("no legal actions at a non-terminal position")]
    NoLegalActions,
}

/// What a finished search recommends.
#[derive(Debug, Clone)]
pub struct SearchResult<A> {
    /// Most-visited root action.
    pub action: A,

    /// Visit count of that action's child.
    pub visits: u32,

    /// Iterations actually performed (root visit count).
    pub iterations: u32,

    /// Mean outcome observed at the root, in team-0-relative terms.
    pub value: f64,

    /// Shape of the tree the search built.
    pub tree: TreeStats,
}

/// An information set: everything the searching seat knows about the real
/// position. Implementations sample concrete positions consistent with
/// that knowledge.
pub trait InfoState {
    type Game: GameState;

    /// Sample one position this information set admits. The sample starts
    /// at the decision point the search is answering.
    fn determinize(
        &self,
        rng: &mut ChaCha20Rng,
    ) -> Result<Self::Game, DeterminizeError>;

    /// Root actions that are selectable under *every* determinization,
    /// such as a contract or trump declaration. `None` means the root is
    /// an ordinary decision point filtered by each sample's legal actions.
    fn root_choices(&self) -> Option<Vec<<Self::Game as GameState>::Action>> {
        None
    }
}

/// Monte Carlo tree search over a single known position.
pub struct Mcts<G: GameState, P: BanditPolicy<G::Action, G::Score>> {
    tree: SearchTree<G::Action, G::Score>,
    policy: P,
    config: SearchConfig,
    root_ready: bool,
}

impl<G: GameState, P: BanditPolicy<G::Action, G::Score>> Mcts<G, P> {
    /// Create a search with a validated configuration.
    pub fn new(policy: P, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tree: SearchTree::new(),
            policy,
            config,
            root_ready: false,
        })
    }

    /// Run the configured number of iterations against `game` and return
    /// the most-visited root action. The position is unchanged on success;
    /// on error it may be left mid-line and should be discarded.
    pub fn run(
        &mut self,
        game: &mut G,
        rng: &mut ChaCha20Rng,
    ) -> Result<SearchResult<G::Action>, SearchError> {
        self.prepare_root(game.legal_actions().len());
        for _ in 0..self.config.iterations {
            self.iteration(game, None, rng)?;
        }
        self.finish()
    }

    /// The search tree, for inspection.
    pub fn tree(&self) -> &SearchTree<G::Action, G::Score> {
        &self.tree
    }

    fn prepare_root(&mut self, arms: usize) {
        if !self.root_ready {
            let root = self.tree.root();
            self.policy.init_node(&mut self.tree, root, arms);
            self.root_ready = true;
        }
    }

    fn finish(&self) -> Result<SearchResult<G::Action>, SearchError> {
        let (action, visits) = self.tree.best_action().ok_or(SearchError::NoLegalActions)?;
        let root = self.tree.get(self.tree.root());
        let value = if root.n == 0 {
            0.0
        } else {
            root.r.value() / f64::from(root.n)
        };
        let stats = self.tree.stats();
        debug!(
            iterations = root.n,
            nodes = stats.total_nodes,
            max_depth = stats.max_depth,
            value,
            "search finished"
        );
        Ok(SearchResult {
            action,
            visits,
            iterations: root.n,
            value,
            tree: stats,
        })
    }

    /// One full iteration against the given position. `root_choices`
    /// overrides legality filtering at the root only.
    fn iteration(
        &mut self,
        game: &mut G,
        root_choices: Option<&[G::Action]>,
        rng: &mut ChaCha20Rng,
    ) -> Result<(), SearchError> {
        let root = self.tree.root();
        let mut v = root;

        // Selection: descend while the node is fully expanded for this
        // position, stopping at terminal positions or the depth cap.
        loop {
            if game.is_terminal() {
                break;
            }
            // A node with an exact terminal reward stays a frontier: another
            // determinization may reach it mid-game, but it is never expanded.
            if self.tree.get(v).leaf {
                break;
            }
            if let Some(cap) = self.config.max_select_depth {
                if self.tree.get(v).depth >= cap {
                    break;
                }
            }
            let legal = game.legal_actions();
            if legal.is_empty() {
                return Err(SearchError::NoLegalActions);
            }
            let choices: &[G::Action] = if v == root {
                root_choices.unwrap_or(&legal)
            } else {
                &legal
            };
            if !self.tree.missing_actions(v, choices).is_empty() {
                break;
            }
            let available = self.tree.available_children(v, choices);
            let seat = game.current_seat();
            let (action, child) = self.policy.choose_arm(&self.tree, v, &available, seat, rng)?;
            game.apply(action)?;
            v = child;
        }

        // Expansion: add one untried child, chosen uniformly. Leaf nodes
        // are never expanded, whatever the current sample says.
        if !game.is_terminal()
            && !self.tree.get(v).leaf
            && self
                .config
                .max_select_depth
                .map_or(true, |cap| self.tree.get(v).depth < cap)
        {
            let legal = game.legal_actions();
            let choices: &[G::Action] = if v == root {
                root_choices.unwrap_or(&legal)
            } else {
                &legal
            };
            let missing = self.tree.missing_actions(v, choices);
            if !missing.is_empty() {
                let action = missing[rng.gen_range(0..missing.len())];
                game.apply(action)?;
                let arms = if game.is_terminal() {
                    0
                } else {
                    game.legal_actions().len()
                };
                let child = self.tree.add_child(v, action);
                self.policy.init_node(&mut self.tree, child, arms);
                v = child;
            }
        }

        let outcome = rollout(game, rng)?;

        // Backpropagation: update bottom-up, undoing one move per edge so
        // availability is recorded against each parent's own legal actions
        // and the position ends where it started.
        let mut node = v;
        let mut terminal = game.is_terminal();
        loop {
            let seat = game.current_seat();
            self.policy
                .update(&mut self.tree, node, seat, &outcome, terminal)?;
            terminal = false;
            match self.tree.parent(node) {
                Some(parent) => {
                    game.undo()?;
                    let legal = game.legal_actions();
                    let choices: &[G::Action] = if parent == root {
                        root_choices.unwrap_or(&legal)
                    } else {
                        &legal
                    };
                    self.tree.record_availability(parent, node, choices);
                    node = parent;
                }
                None => break,
            }
        }

        trace!(
            leaf = v.0,
            depth = self.tree.get(v).depth,
            nodes = self.tree.len(),
            "iteration complete"
        );
        Ok(())
    }
}

/// Information-set MCTS: one tree, a fresh determinization per iteration.
pub struct Ismcts<I: InfoState, P: BanditPolicy<<I::Game as GameState>::Action, <I::Game as GameState>::Score>> {
    inner: Mcts<I::Game, P>,
}

impl<I, P> Ismcts<I, P>
where
    I: InfoState,
    P: BanditPolicy<<I::Game as GameState>::Action, <I::Game as GameState>::Score>,
{
    pub fn new(policy: P, config: SearchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mcts::new(policy, config)?,
        })
    }

    /// Run the configured number of iterations, each against its own
    /// sample from `info`.
    pub fn run(
        &mut self,
        info: &I,
        rng: &mut ChaCha20Rng,
    ) -> Result<SearchResult<<I::Game as GameState>::Action>, SearchError> {
        let root_choices = info.root_choices();
        if !self.inner.root_ready {
            let arms = match &root_choices {
                Some(choices) => choices.len(),
                None => info.determinize(rng)?.legal_actions().len(),
            };
            self.inner.prepare_root(arms);
        }
        for _ in 0..self.inner.config.iterations {
            let mut game = info.determinize(rng)?;
            self.inner.iteration(&mut game, root_choices.as_deref(), rng)?;
        }
        self.inner.finish()
    }

    pub fn tree(&self) -> &SearchTree<<I::Game as GameState>::Action, <I::Game as GameState>::Score> {
        self.inner.tree()
    }
}

/// Play an independent copy of the position out uniformly at random and
/// return the terminal outcome. The live position is untouched.
fn rollout<G: GameState>(game: &G, rng: &mut ChaCha20Rng) -> Result<G::Score, SearchError> {
    let mut sim = game.clone();
    while !sim.is_terminal() {
        let legal = sim.legal_actions();
        if legal.is_empty() {
            return Err(SearchError::NoLegalActions);
        }
        sim.apply(legal[rng.gen_range(0..legal.len())])?;
    }
    Ok(sim.outcome()?)
}

/// Search a known position with the policy named in `config` and return
/// the recommended action.
pub fn choose_action<G: GameState>(
    game: &mut G,
    config: &SearchConfig,
    rng: &mut ChaCha20Rng,
) -> Result<G::Action, SearchError> {
    match config.policy {
        PolicyKind::ConfidenceBound => {
            let policy = Ucb1::from_config(config)?;
            Ok(Mcts::new(policy, config.clone())?.run(game, rng)?.action)
        }
        PolicyKind::Contextual => {
            let arms = game.legal_actions().len();
            let policy = ContextualBandit::from_config(config, arms)?;
            Ok(Mcts::new(policy, config.clone())?.run(game, rng)?.action)
        }
    }
}

/// Search an information set with the policy named in `config` and return
/// the recommended action.
pub fn choose_action_ismcts<I: InfoState>(
    info: &I,
    config: &SearchConfig,
    rng: &mut ChaCha20Rng,
) -> Result<<I::Game as GameState>::Action, SearchError> {
    match config.policy {
        PolicyKind::ConfidenceBound => {
            let policy = Ucb1::from_config(config)?;
            Ok(Ismcts::new(policy, config.clone())?.run(info, rng)?.action)
        }
        PolicyKind::Contextual => {
            let arms = match info.root_choices() {
                Some(choices) => choices.len(),
                None => info.determinize(rng)?.legal_actions().len(),
            };
            let policy = ContextualBandit::from_config(config, arms)?;
            let mut search = Ismcts::new(policy, config.clone())?;
            // Size the root from the same sample the policy was validated
            // against, so capacity and max_arms cannot disagree.
            search.inner.prepare_root(arms);
            Ok(search.run(info, rng)?.action)
        }
    }
}
