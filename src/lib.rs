pub mod board;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod game;
pub mod generators;
pub mod geometry;
pub mod pgn;
pub mod position;

pub use board::Board;
pub use cache::{CacheManifest, TensorCache, TensorSet};
pub use config::DatasetConfig;
pub use dataset::{best_move_kinds, ActionLabels, Dataset, GeneratorKind};
pub use encoding::{
    combined_action_index, decode_action_index, dense_state, encode_state, featurize,
    state_planes, CompactEmpty, CompactState, EncodedState, StateMode,
};
pub use error::{DatasetError, Result};
pub use game::{GameRecord, MalformedGame, Outcome};
pub use generators::{
    discounted_reward, load_test_suite, RandomBlackStates, RandomWhiteStates, StateActionBatch,
    StateActionBatches, TestSuite, Transition, Transitions,
};
pub use pgn::GameReader;
pub use position::Position;
