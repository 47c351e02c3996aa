//! Domain layer - pure business models
//!
//! Architecture: Domain-Driven Design - field violations and reports as rich models
//! - No infrastructure dependencies
//! - Shared by the constraint engine, the batch validator and the report formatters

pub mod violations;
