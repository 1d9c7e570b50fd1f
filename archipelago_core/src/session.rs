//! The observation/action exchange with whatever runs the game.

use crate::{Action, EngineError, agent::Agent, world::Observation};

/// One side of the per-turn exchange: observations in, actions out.
pub trait Transport {
    /// Waits for the next observation.
    /// Returns [`EngineError::ObservationStreamClosed`] once the game is over.
    fn receive(&mut self) -> Result<Observation, EngineError>;

    fn send(&mut self, action: Action) -> Result<(), EngineError>;
}

/// Plays until the transport closes, one action per observation.
///
/// A closed stream is the normal end of a game and yields the number of
/// turns played. Any other error stops the session and is returned.
pub fn run_session<A, T>(agent: &mut A, transport: &mut T) -> Result<u64, EngineError>
where
    A: Agent + ?Sized,
    T: Transport + ?Sized,
{
    let mut turns = 0;
    loop {
        let observation = match transport.receive() {
            Ok(observation) => observation,
            Err(EngineError::ObservationStreamClosed) => {
                tracing::info!(turns, "observation stream closed");
                return Ok(turns);
            }
            Err(error) => return Err(error),
        };
        let action = agent.act(&observation)?;
        transport.send(action)?;
        turns += 1;
    }
}
