// ABOUTME: Sampling daemon: one retrieve-synthesize-submit cycle per interval
// ABOUTME: Talks to the chat platform and graph store only through the core collaborator traits

pub mod daemon;

pub use daemon::*;
