pub mod audience;
pub mod capability;
pub mod error;
pub mod faults;
pub mod key_material;
pub mod pass;
pub mod priority;
pub mod reconciler;
pub mod rules;
pub mod service;
pub mod synthesizer;
