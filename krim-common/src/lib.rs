#![no_std]

mod event;
mod routes;

pub use event::*;
pub use routes::*;
