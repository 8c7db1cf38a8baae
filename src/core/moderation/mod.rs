// Core moderation module - the automated moderation pipeline.
//
// Leaf to root: rule registry, flood detector, classifier, policy gate,
// sanction engine, service.

pub mod classifier;
pub mod flood_detector;
pub mod moderation_models;
pub mod moderation_ports;
pub mod moderation_service;
pub mod policy_gate;
pub mod rule_registry;
pub mod sanction_engine;

pub use flood_detector::{spawn_sweeper, SpamWindows, SPAM_SWEEP_INTERVAL};
pub use moderation_models::*;
pub use moderation_ports::*;
pub use moderation_service::ModerationService;
pub use rule_registry::GlobalBadWordList;
