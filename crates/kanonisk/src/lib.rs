#![forbid(unsafe_code)]

pub use kanonisk_c14n as c14n;
pub use kanonisk_core as core;
pub use kanonisk_xml as xml;
