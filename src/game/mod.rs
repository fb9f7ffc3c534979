pub mod board;
pub mod collision;
pub mod constants;
pub mod room;
pub mod round;
pub mod snake;
pub mod spawner;
pub mod types;
