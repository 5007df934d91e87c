// Per-symbol orchestration and parallel batches
pub mod engine;

// Async input collection from the ports
pub mod evaluation_service;

// Technical indicators
pub mod indicators;

// Stop/target levels and position sizing
pub mod risk_management;

// Text scoring and decay aggregation
pub mod sentiment;

// Evidence fusion into a classification
pub mod signal_fusion;
