/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - connections  (live duplex connection registry)       |
/// |   - match_cache  (short-TTL pending-match store)         |
/// |   - discovery    (geospatial rider discovery)            |
/// |   - dispatch     (request broadcast and assignment)      |
/// |   - relay        (driver-response relay to customers)    |
/// |   - lifecycle    (start/end transitions and settlement)  |
/// +----------------------------------------------------------+

pub mod connections;
pub mod discovery;
pub mod dispatch;
pub mod lifecycle;
pub mod match_cache;
pub mod relay;
