//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http client error: {0}")]
    Client(String),

    #[error("device link closed")]
    LinkClosed,

    #[error("delivery refused by device")]
    DeliveryRefused,
}
