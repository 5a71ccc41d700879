pub mod access;
pub mod broadcast;
pub mod messages;
pub mod ordering;
pub mod presence;
pub mod rooms;
pub mod stats;
