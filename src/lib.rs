//! Slide engine for a rotating photo carousel.
//!
//! Raw photo descriptors are normalized and filtered into an immutable
//! [`SlideSequence`](builder::SlideSequence); a
//! [`SlideController`](controller::SlideController) and a
//! [`GestureInterpreter`](gesture::GestureInterpreter) decide which slide is
//! current, and [`render::project`] turns that into a [`render::Frame`].

pub mod builder;
pub mod carousel;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod gesture;
pub mod logging;
pub mod photo;
pub mod render;
pub mod sources;
pub mod tasks {
    pub mod loader;
    pub mod runtime;
}

pub use error::Error;
