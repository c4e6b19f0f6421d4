pub mod registry;
pub mod role;

pub use registry::{AgentCandidate, AgentPermit, AgentRegistry};
pub use role::{AgentRole, AgentRoleKind};
