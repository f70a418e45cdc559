pub mod action;
pub mod influence;
pub mod state;

pub use action::{
    action_one_hot, combined_action_index, decode_action_index, moved_piece_one_hot, piece_one_hot,
    square_pair_index, DecodedAction, NUM_COMBINED_ACTIONS,
};
pub use influence::{featurize, influence_maps, Role, NUM_FEATURIZED_CHANNELS};
pub use state::{
    compact_state, dense_state, encode_state, state_planes, CompactEmpty, CompactState,
    EncodedState, StateMode, NUM_STATE_CHANNELS,
};
