//! Ports: what the bridge needs from the outside world.

pub mod outbound;

pub use outbound::{
    ArtifactRepository, InMemoryArtifacts, MockTargetChain, MockUpstream, TargetChainClient,
    UpstreamForwarder,
};
