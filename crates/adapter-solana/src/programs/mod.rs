//! Instruction builders for the programs the adapters drive.
//!
//! Each builder is bound to one program instance and the account that pays
//! for and authorizes its instructions.

pub mod mcm;
pub mod timelock;

pub use mcm::McmProgram;
pub use timelock::TimelockProgram;
