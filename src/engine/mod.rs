// Engine modules: fixed-step loop and physics

pub mod game_loop;
pub mod physics;
