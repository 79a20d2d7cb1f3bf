// Adapters layer: concrete sources and destinations behind the domain ports,
// each constructed through a factory keyed by a configured type string.

pub mod destination;
pub mod source;

pub use destination::DestinationFactory;
pub use source::SourceFactory;
