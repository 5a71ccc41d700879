pub mod handshake;
pub mod jwt;
