pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod leaderboard;
pub mod pagination;
pub mod reconciliation;
pub mod regions;
pub mod router;
pub mod storage;
pub mod telemetry;
pub mod verification;
