// Docker orchestration: container lifecycle, networks, log streaming, cancellation.

mod container;
mod engine;
mod network;
mod run;
mod types;

pub use container::Container;
pub use engine::{Docker, ensure_available};
pub use network::Network;
pub use types::{
    CancelToken, ContainerSpec, ContainerState, ExecOutput, FileMount, HealthState,
    NetworkAttachment,
};
