//! Information Set Monte Carlo Tree Search with pluggable bandit policies.
//!
//! The engine searches by mutating one live position in place: selection
//! and expansion apply moves, backpropagation undoes them, and every
//! iteration returns the position to its starting point. Hidden
//! information is handled by sampling a fresh determinization per
//! iteration and filtering the shared tree down to the actions that
//! sample allows.
//!
//! # Example
//!
//! ```rust,ignore
//! use ismcts::{choose_action, SearchConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut game = my_game::Position::new();
//! let config = SearchConfig::default().with_iterations(5_000);
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let action = choose_action(&mut game, &config, &mut rng)?;
//! ```

pub mod config;
pub mod determinize;
pub mod node;
pub mod policy;
pub mod search;
pub mod tree;

pub use config::{ConfigError, PolicyKind, SearchConfig};
pub use determinize::{deal, remaining_quotas, DeterminizeError, SeatConstraint};
pub use node::{ArmState, ContextualArms, NodeId, SearchNode};
pub use policy::{BanditPolicy, ContextualBandit, PolicyError, Ucb1};
pub use search::{
    choose_action, choose_action_ismcts, InfoState, Ismcts, Mcts, SearchError, SearchResult,
};
pub use tree::{SearchTree, TreeStats};
