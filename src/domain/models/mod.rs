/// Persistent entity types: deliveries, riders, vehicles, wallets.
pub mod types;

/// Wire payloads: bus messages, match records, duplex events.
pub mod events;
