/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - persistence  (entity store traits + error type)      |
/// |   - memory       (in-memory store implementations)       |
/// |   - bus          (RabbitMQ-backed event publishers)      |
/// +----------------------------------------------------------+

/// Entity-scoped persistence traits consumed by the dispatch core.
pub mod persistence;

/// In-memory persistence, for tests and single-process demos.
pub mod memory;

/// RabbitMQ-backed implementations of the publisher seams.
pub mod bus;
