pub mod clock;
pub mod constants;
pub mod detection;
pub mod enemy;
pub mod events;
pub mod game_loop;
pub mod input_buffer;
pub mod obstacles;
pub mod player;
pub mod pool;
pub mod presentation;
pub mod spatial;
pub mod systems;
