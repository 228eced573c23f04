//! Drives proposals across every supported chain family.
//!
//! [`Chains`] holds the adapters of each configured chain. [`Signable`]
//! collects and checks signatures, [`Executable`] sets roots and executes
//! operations, and [`TimelockExecutable`] executes scheduled timelock batches.

mod adapters;
mod executable;
pub mod settings;
mod signable;
pub mod telemetry;
mod timelock_executable;

#[cfg(test)]
mod mock;

pub use adapters::{ChainAdapters, Chains};
pub use executable::Executable;
pub use settings::{ChainSettings, Settings};
pub use signable::Signable;
pub use timelock_executable::TimelockExecutable;
