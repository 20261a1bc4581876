mod sequencer;
mod state;

pub use sequencer::Sequencer;
pub use state::SequencerState;
