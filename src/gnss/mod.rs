
/// Static satellite descriptors and the shared busy flags
pub mod satellite;

/// Spreading code generators for GPS C/A, QZSS and Galileo E1B
pub mod codes;

/// Frequency-domain acquisition: code table, sample capture and Doppler-swept correlation
pub mod acquisition;

/// Interface to the tracking channels that take over an acquired signal
pub mod channel;

/// The long-running search task and its suspend/resume control
pub mod search;
