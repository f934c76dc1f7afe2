//! Rusted Stack: the simulation core of a block-stacking arcade game.
//!
//! Layers slide over the tower; a drop cuts the moving layer down to its
//! overlap with the one below and the remainder falls away as a physics body.
//! Rendering, audio and input mapping live outside this crate and talk to
//! [`game::GameSession`] through `on_frame`, `trigger` and `restart`.

pub mod engine;
pub mod game;
pub mod util;
