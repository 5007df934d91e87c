// Trading decision types
pub mod decision;

// Domain-specific error types
pub mod errors;

// Price history and indicator state
pub mod market;

// Port interfaces
pub mod ports;

// Crowd and news sentiment
pub mod sentiment;
