//! HTTP surface of the training job kernel.

pub mod server;
