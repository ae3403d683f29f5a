//! Petrification lifecycle: turns live actors into bound placeholder things and back,
//! surviving placeholders being moved, packed, destroyed or reloaded from a save.

pub mod appearance;
pub mod config;
mod controller;
mod error;
mod events;
mod factory;
mod gate;
mod orphan;
mod registry;
mod resolver;
mod session;

pub use appearance::{AppearanceSynthesizer, DefaultAppearance, MetadataAppearanceStore};
pub use config::{ConfigError, PetrifyConfig};
pub use controller::{LifecycleController, SkipReason, TransitionOutcome, TransitionReport};
pub use error::{AppearanceError, FactoryError, PetrifyError};
pub use events::{ConditionEvent, ConditionEventQueue};
pub use factory::PlaceholderFactory;
pub use gate::{RenderSuppressionGate, RescueAlertGate};
pub use orphan::{OrphanLedger, OrphanReason, OrphanRecord};
pub use registry::TransformationRegistry;
pub use resolver::{placeholder_subject, AssociationResolver, ResolvedContainer, ResolverStats};
pub use session::{LifecycleState, PetrifySession};
