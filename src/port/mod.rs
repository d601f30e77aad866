//! Port traits: the seams between the core and the outside world.

pub mod outbound;
